//! Subresource Integrity strings
//!
//! Tarballs are pinned by an integrity string such as `sha512-<base64>`.
//! The same format is used for every file recorded in a package files index,
//! where the hex form of the digest doubles as the content address.

use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::error::IntegrityError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Algorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl Algorithm {
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha384 => "sha384",
            Algorithm::Sha512 => "sha512",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "sha256" => Some(Algorithm::Sha256),
            "sha384" => Some(Algorithm::Sha384),
            "sha512" => Some(Algorithm::Sha512),
            _ => None,
        }
    }

    /// Length in bytes of a digest produced by this algorithm.
    pub fn digest_len(self) -> usize {
        match self {
            Algorithm::Sha256 => 32,
            Algorithm::Sha384 => 48,
            Algorithm::Sha512 => 64,
        }
    }

    pub fn digest(self, bytes: &[u8]) -> Vec<u8> {
        match self {
            Algorithm::Sha256 => Sha256::digest(bytes).to_vec(),
            Algorithm::Sha384 => Sha384::digest(bytes).to_vec(),
            Algorithm::Sha512 => Sha512::digest(bytes).to_vec(),
        }
    }
}

/// A single-hash integrity value.
///
/// When parsing a multi-hash string, the strongest supported algorithm wins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Integrity {
    algorithm: Algorithm,
    digest: Vec<u8>,
}

impl Integrity {
    /// Hash `bytes` with SHA-512, the algorithm used for everything the store writes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::with_algorithm(Algorithm::Sha512, bytes)
    }

    pub fn with_algorithm(algorithm: Algorithm, bytes: &[u8]) -> Self {
        Self {
            algorithm,
            digest: algorithm.digest(bytes),
        }
    }

    pub fn parse(value: &str) -> Result<Self, IntegrityError> {
        let mut best: Option<Integrity> = None;
        let mut saw_entry = false;

        for entry in value.split_whitespace() {
            saw_entry = true;
            let Some((name, rest)) = entry.split_once('-') else {
                return Err(IntegrityError::Invalid(value.to_string()));
            };
            // Options such as `?foo` trail the digest and carry no meaning here
            let encoded = rest.split('?').next().unwrap_or_default();
            let Some(algorithm) = Algorithm::from_name(name) else {
                continue;
            };
            let digest = STANDARD
                .decode(encoded)
                .map_err(|_| IntegrityError::Invalid(value.to_string()))?;
            if digest.len() != algorithm.digest_len() {
                return Err(IntegrityError::Invalid(value.to_string()));
            }
            if best.as_ref().is_none_or(|b| algorithm > b.algorithm) {
                best = Some(Integrity { algorithm, digest });
            }
        }

        match best {
            Some(integrity) => Ok(integrity),
            None if saw_entry => Err(IntegrityError::UnsupportedAlgorithm(value.to_string())),
            None => Err(IntegrityError::Invalid(value.to_string())),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    pub fn hex_digest(&self) -> String {
        hex::encode(&self.digest)
    }

    /// True when `bytes` hash to this value under the same algorithm.
    pub fn check(&self, bytes: &[u8]) -> bool {
        self.algorithm.digest(bytes) == self.digest
    }
}

impl fmt::Display for Integrity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.algorithm.name(), STANDARD.encode(&self.digest))
    }
}

impl FromStr for Integrity {
    type Err = IntegrityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Integrity::parse(s)
    }
}

impl TryFrom<String> for Integrity {
    type Error = IntegrityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Integrity::parse(&value)
    }
}

impl From<Integrity> for String {
    fn from(value: Integrity) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_uses_sha512() {
        let integrity = Integrity::from_bytes(b"hello");
        assert_eq!(integrity.algorithm(), Algorithm::Sha512);
        assert!(integrity.to_string().starts_with("sha512-"));
        assert_eq!(integrity.hex_digest().len(), 128);
    }

    #[test]
    fn test_parse_display_is_stable() {
        let integrity = Integrity::from_bytes(b"some tarball");
        let parsed = Integrity::parse(&integrity.to_string()).unwrap();
        assert_eq!(parsed, integrity);
    }

    #[test]
    fn test_check_detects_modified_content() {
        let integrity = Integrity::from_bytes(b"original");
        assert!(integrity.check(b"original"));
        assert!(!integrity.check(b"original!"));
    }

    #[test]
    fn test_parse_prefers_strongest_algorithm() {
        let weak = Integrity::with_algorithm(Algorithm::Sha256, b"x");
        let strong = Integrity::from_bytes(b"x");
        let parsed = Integrity::parse(&format!("{weak} {strong}")).unwrap();
        assert_eq!(parsed.algorithm(), Algorithm::Sha512);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            Integrity::parse("not-an-integrity!!"),
            Err(IntegrityError::UnsupportedAlgorithm(_))
        ));
        assert!(matches!(
            Integrity::parse("sha512-%%%"),
            Err(IntegrityError::Invalid(_))
        ));
        assert!(matches!(Integrity::parse(""), Err(IntegrityError::Invalid(_))));
    }

    #[test]
    fn test_parse_rejects_truncated_digests() {
        assert!(matches!(Integrity::parse("sha512-"), Err(IntegrityError::Invalid(_))));

        let full = Integrity::from_bytes(b"x");
        let short = STANDARD.encode(&full.digest()[..32]);
        assert!(Integrity::parse(&format!("sha512-{short}")).is_err());
        assert!(Integrity::parse(&format!("sha256-{short}")).is_ok());
    }

    #[test]
    fn test_digest_len_matches_hash_output() {
        for algorithm in [Algorithm::Sha256, Algorithm::Sha384, Algorithm::Sha512] {
            assert_eq!(algorithm.digest(b"x").len(), algorithm.digest_len());
        }
    }

    #[test]
    fn test_serde_as_string() {
        let integrity = Integrity::from_bytes(b"json");
        let json = serde_json::to_string(&integrity).unwrap();
        assert_eq!(json, format!("\"{integrity}\""));
        let back: Integrity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, integrity);
    }
}

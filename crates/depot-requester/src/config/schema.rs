//! Configuration schema for the package requester

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::paths::get_default_store_dir;

/// Shortest id encoding that still fits the 27-character hash suffix
const MIN_MAX_LENGTH: usize = 28;

/// Requester settings stored in `config.toml`
///
/// All fields use #[serde(default)] so partial configs are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RequesterConfig {
    /// Store location; defaults to the platform data directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<PathBuf>,

    /// Maximum number of concurrent resolver and fetcher calls
    pub network_concurrency: usize,

    /// Re-hash stored files that changed since they were last checked
    pub verify_store_integrity: bool,

    /// Maximum length of the encoded package id used for index file names
    pub virtual_store_dir_max_length: usize,

    /// Install packages even when their platform does not match
    pub force: bool,
}

impl Default for RequesterConfig {
    fn default() -> Self {
        Self {
            store_dir: None,
            network_concurrency: 16,
            verify_store_integrity: true,
            virtual_store_dir_max_length: 120,
            force: false,
        }
    }
}

impl RequesterConfig {
    /// Validate the configuration for common errors
    ///
    /// Returns Ok(()) if valid, or Err with a list of error messages
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.network_concurrency == 0 {
            errors.push("network-concurrency must be at least 1".to_string());
        }

        if self.virtual_store_dir_max_length < MIN_MAX_LENGTH {
            errors.push(format!(
                "virtual-store-dir-max-length must be at least {}, got {}",
                MIN_MAX_LENGTH, self.virtual_store_dir_max_length
            ));
        }

        if let Some(store_dir) = &self.store_dir {
            if store_dir.as_os_str().is_empty() {
                errors.push("store-dir cannot be empty".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// The configured store directory, or the platform default
    pub fn store_dir(&self) -> Result<PathBuf> {
        match &self.store_dir {
            Some(dir) => Ok(dir.clone()),
            None => get_default_store_dir(),
        }
    }
}

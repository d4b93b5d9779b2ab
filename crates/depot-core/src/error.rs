use thiserror::Error;

use crate::traits::FetcherKind;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("Invalid integrity string: {0}")]
    Invalid(String),

    #[error("Unsupported integrity algorithm in \"{0}\"")]
    UnsupportedAlgorithm(String),
}

impl IntegrityError {
    pub fn code(&self) -> &'static str {
        match self {
            IntegrityError::Invalid(_) => "INVALID_INTEGRITY",
            IntegrityError::UnsupportedAlgorithm(_) => "UNSUPPORTED_INTEGRITY_ALGORITHM",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetcherError {
    #[error("Fetching for dependency type \"{0}\" is not supported")]
    Unsupported(FetcherKind),
}

impl FetcherError {
    pub fn code(&self) -> &'static str {
        match self {
            FetcherError::Unsupported(_) => "FETCHER_NOT_FOUND",
        }
    }
}

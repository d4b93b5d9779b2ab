use std::io;
use std::path::PathBuf;

use depot_core::Integrity;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CafsError {
    #[error("Failed to {action} {}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Integrity check failed for {}: expected {expected}, got {actual}", .path.display())]
    IntegrityMismatch {
        path: PathBuf,
        expected: Integrity,
        actual: Integrity,
    },

    #[error("Failed to read package archive")]
    Archive(#[source] io::Error),

    #[error("Invalid package.json in package content")]
    InvalidManifest(#[source] serde_json::Error),

    #[error("Failed to serialize files index {}", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CafsError {
    pub fn code(&self) -> &'static str {
        match self {
            CafsError::Io { .. } => "CAFS_IO",
            CafsError::IntegrityMismatch { .. } => "EINTEGRITY",
            CafsError::Archive(_) => "BAD_TARBALL",
            CafsError::InvalidManifest(_) => "BAD_PACKAGE_JSON",
            CafsError::Serialize { .. } => "CAFS_SERIALIZE",
        }
    }
}

/// Build a closure mapping an `io::Error` to `CafsError::Io` for `path`
pub(crate) fn io_error(
    action: &'static str,
    path: impl Into<PathBuf>,
) -> impl FnOnce(io::Error) -> CafsError {
    let path = path.into();
    move |source| CafsError::Io {
        action,
        path,
        source,
    }
}

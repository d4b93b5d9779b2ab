use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use depot_cafs::CafsError;
use depot_core::{FetcherError, Integrity, PkgResolutionId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Failed to resolve {dependency}: {source}")]
    Resolution {
        dependency: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to fetch {id}: {source}")]
    Fetch {
        id: PkgResolutionId,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Fetcher(#[from] FetcherError),

    #[error("Got unexpected checksum for {id}. Wanted \"{expected}\". Got \"{actual}\".")]
    TarballIntegrity {
        id: PkgResolutionId,
        expected: Integrity,
        actual: Integrity,
    },

    #[error(
        "Package name mismatch found while reading {resolution} from the store. Expected package: {expected}. Actual package in the store: {actual}."
    )]
    UnexpectedPackageContent {
        resolution: String,
        expected: String,
        actual: String,
    },

    #[error("Couldn't read package.json of local dependency {dependency}")]
    LocalManifestMissing { dependency: String },

    #[error(transparent)]
    Store(#[from] CafsError),

    #[error("Failed to write {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Store worker failed")]
    Worker(#[from] tokio::task::JoinError),

    #[error("Network request queue was closed")]
    QueueClosed,

    /// A failure shared by every waiter of the same fetch
    #[error(transparent)]
    Shared(#[from] Arc<RequestError>),
}

impl RequestError {
    pub fn code(&self) -> &'static str {
        match self {
            RequestError::Resolution { .. } => "RESOLUTION_FAILURE",
            RequestError::Fetch { .. } => "FETCH_FAILURE",
            RequestError::Fetcher(e) => e.code(),
            RequestError::TarballIntegrity { .. } => "TARBALL_INTEGRITY",
            RequestError::UnexpectedPackageContent { .. } => "UNEXPECTED_PKG_CONTENT_IN_STORE",
            RequestError::LocalManifestMissing { .. } => "LOCAL_PACKAGE_JSON_MISSING",
            RequestError::Store(e) => e.code(),
            RequestError::Io { .. } => "STORE_IO",
            RequestError::Worker(_) => "STORE_WORKER",
            RequestError::QueueClosed => "QUEUE_CLOSED",
            RequestError::Shared(e) => e.code(),
        }
    }

    /// Whether asking again may succeed. Fetch failures are never cached.
    pub fn is_retryable(&self) -> bool {
        match self {
            RequestError::Fetch { .. }
            | RequestError::TarballIntegrity { .. }
            | RequestError::Store(_)
            | RequestError::Io { .. }
            | RequestError::Worker(_) => true,
            RequestError::Shared(e) => e.is_retryable(),
            _ => false,
        }
    }
}

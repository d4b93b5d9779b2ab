use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::FetcherError;
use crate::resolution::{PkgResolutionId, Resolution};

/// Raw package content as produced by a fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawContent {
    /// A tar archive, optionally gzip-compressed
    Tarball(Vec<u8>),
    /// A directory whose files make up the package
    Directory(PathBuf),
}

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub lockfile_dir: PathBuf,
    pub files_index_file: PathBuf,
    pub pkg_name: Option<String>,
    pub pkg_version: Option<String>,
}

/// Downloads or reads the content behind a resolution
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        id: &PkgResolutionId,
        resolution: &Resolution,
        opts: &FetchOptions,
    ) -> anyhow::Result<RawContent>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetcherKind {
    RemoteTarball,
    LocalTarball,
    GitHostedTarball,
    Git,
    Directory,
}

impl From<&Resolution> for FetcherKind {
    fn from(resolution: &Resolution) -> Self {
        match resolution {
            Resolution::Tarball { tarball, .. } if tarball.starts_with("file:") => {
                FetcherKind::LocalTarball
            }
            Resolution::Tarball { tarball, .. } if tarball.starts_with("https://codeload.") => {
                FetcherKind::GitHostedTarball
            }
            Resolution::Tarball { .. } => FetcherKind::RemoteTarball,
            Resolution::Directory { .. } => FetcherKind::Directory,
            Resolution::Git { .. } => FetcherKind::Git,
        }
    }
}

impl fmt::Display for FetcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FetcherKind::RemoteTarball => "remote-tarball",
            FetcherKind::LocalTarball => "local-tarball",
            FetcherKind::GitHostedTarball => "git-hosted-tarball",
            FetcherKind::Git => "git",
            FetcherKind::Directory => "directory",
        };
        f.write_str(name)
    }
}

/// Fetchers keyed by the kind of resolution they handle
#[derive(Clone, Default)]
pub struct Fetchers {
    by_kind: HashMap<FetcherKind, Arc<dyn Fetcher>>,
}

impl Fetchers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: FetcherKind, fetcher: Arc<dyn Fetcher>) -> Self {
        self.insert(kind, fetcher);
        self
    }

    pub fn insert(&mut self, kind: FetcherKind, fetcher: Arc<dyn Fetcher>) {
        self.by_kind.insert(kind, fetcher);
    }

    pub fn pick(&self, resolution: &Resolution) -> Result<Arc<dyn Fetcher>, FetcherError> {
        let kind = FetcherKind::from(resolution);
        self.by_kind
            .get(&kind)
            .cloned()
            .ok_or(FetcherError::Unsupported(kind))
    }
}

impl fmt::Debug for Fetchers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.by_kind.keys()).finish()
    }
}

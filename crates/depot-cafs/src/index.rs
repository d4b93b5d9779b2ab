use std::collections::BTreeMap;
use std::fmt;

use depot_core::{BundledManifest, Integrity};
use serde::{Deserialize, Serialize};

/// Relative path inside a package → stored file
pub type FilesMap = BTreeMap<String, PackageFileInfo>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageFileInfo {
    pub integrity: Integrity,
    pub mode: u32,
    pub size: u64,
    /// Milliseconds since the epoch when the content was last verified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<i64>,
}

impl PackageFileInfo {
    pub fn is_executable(&self) -> bool {
        self.mode & 0o111 != 0
    }
}

/// Where the files of a fetch result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolvedFrom {
    /// Already present and verified in the store
    Store,
    /// Downloaded by a fetcher
    Remote,
    /// Read from a local directory
    LocalDir,
}

impl fmt::Display for ResolvedFrom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResolvedFrom::Store => "store",
            ResolvedFrom::Remote => "remote",
            ResolvedFrom::LocalDir => "local-dir",
        })
    }
}

/// The per-package record persisted under `index/`.
///
/// `manifest` is only present when the full manifest was captured. Indexes
/// written without it still carry the package name and version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageFilesIndex {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<BundledManifest>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_from: Option<ResolvedFrom>,

    pub files: FilesMap,
}

impl PackageFilesIndex {
    pub fn has_full_manifest(&self) -> bool {
        self.manifest.is_some()
    }
}

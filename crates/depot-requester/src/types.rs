use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use depot_cafs::ResolvedFrom;
use depot_core::traits::PreferredVersions;
use depot_core::{
    BundledManifest, CurrentPkg, PackageManifest, PkgResolutionId, Resolution, ResolvedVia,
};
use futures_util::future::{BoxFuture, Shared};
use tracing::debug;

use crate::error::RequestError;

/// Name and version the caller believes a package has
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpectedPkg {
    pub name: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RequestPackageOptions {
    pub lockfile_dir: PathBuf,
    pub project_dir: PathBuf,
    pub preferred_versions: PreferredVersions,
    /// Package recorded by a previous install
    pub current_pkg: Option<CurrentPkg>,
    pub expected_pkg: Option<ExpectedPkg>,
    /// Resolve again even when `current_pkg` is known
    pub update: bool,
    /// Resolve only; never produce a `fetching` continuation
    pub skip_fetch: bool,
    pub download_priority: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackageResponseBody {
    pub id: PkgResolutionId,
    pub resolution: Resolution,
    pub resolved_via: Option<ResolvedVia>,
    pub manifest: Option<PackageManifest>,
    pub latest: Option<String>,
    /// Linked from a local directory rather than copied into the store
    pub is_local: bool,
    pub is_installable: bool,
    /// The resolution differs from `current_pkg`, or there was none
    pub updated: bool,
    pub normalized_bare_specifier: Option<String>,
    pub alias: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PackageResponse {
    pub body: PackageResponseBody,
    pub files_index_file: Option<PathBuf>,
    pub fetching: Option<Fetching>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkgToFetch {
    pub id: PkgResolutionId,
    pub resolution: Resolution,
    /// Expected name, checked against the stored package
    pub name: Option<String>,
    /// Expected version, checked against the stored package
    pub version: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FetchPackageToStoreOptions {
    pub pkg: PkgToFetch,
    pub lockfile_dir: PathBuf,
    /// Skip the store and fetch again
    pub force: bool,
    /// Include the package's manifest in the result
    pub fetch_raw_manifest: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedFiles {
    /// Relative path → content object in the store
    pub files_index: BTreeMap<String, PathBuf>,
    pub resolved_from: ResolvedFrom,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub files: FetchedFiles,
    pub bundled_manifest: Option<BundledManifest>,
}

pub(crate) type FetchOutcome = Result<FetchResult, Arc<RequestError>>;
pub(crate) type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;

#[derive(Debug)]
pub struct FetchResponse {
    pub files_index_file: PathBuf,
    pub fetching: Fetching,
}

/// A fetch into the store, started on first use and shared by every
/// requester of the same package.
///
/// `get` may be called any number of times; the work runs once.
#[derive(Clone)]
pub struct Fetching {
    shared: SharedFetch,
    wants_manifest: bool,
}

impl Fetching {
    pub(crate) fn new(shared: SharedFetch, wants_manifest: bool) -> Self {
        Self {
            shared,
            wants_manifest,
        }
    }

    pub async fn get(&self) -> Result<FetchResult, Arc<RequestError>> {
        let mut result = self.shared.clone().await?;
        // Joined a fetch started without the manifest; read it from the store
        if self.wants_manifest && result.bundled_manifest.is_none() {
            if let Some(path) = result.files.files_index.get("package.json") {
                let bytes = tokio::fs::read(path).await.map_err(|source| {
                    Arc::new(RequestError::Io {
                        path: path.clone(),
                        source,
                    })
                })?;
                match BundledManifest::from_json_slice(&bytes) {
                    Ok(manifest) => result.bundled_manifest = Some(manifest),
                    Err(e) => debug!(
                        path = %path.display(),
                        error = %e,
                        "Unreadable package.json in store"
                    ),
                }
            }
        }
        Ok(result)
    }
}

impl fmt::Debug for Fetching {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetching")
            .field("wants_manifest", &self.wants_manifest)
            .finish_non_exhaustive()
    }
}

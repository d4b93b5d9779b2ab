use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use depot_cafs::{AddFilesResult, Cafs, PackageFilesIndex, ResolvedFrom};
use depot_core::{
    CurrentPkg, FetchOptions, Fetchers, Integrity, PackageManifest, PkgResolutionId, RawContent,
    ResolveOptions, ResolveResult, Resolution, ResolvedVia, Resolver, WantedDependency,
    equal_or_semver_equal,
};
use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::config::RequesterConfig;
use crate::error::RequestError;
use crate::installable::{self, Platform};
use crate::local_tarball;
use crate::single_flight;
use crate::types::{
    ExpectedPkg, FetchPackageToStoreOptions, FetchResponse, FetchResult, FetchedFiles, Fetching,
    PackageResponse, PackageResponseBody, PkgToFetch, RequestPackageOptions,
};

struct Context {
    resolver: Arc<dyn Resolver>,
    fetchers: Fetchers,
    cafs: Cafs,
    network: Semaphore,
    platform: Platform,
    config: RequesterConfig,
}

/// Resolves packages and fetches them into a shared store.
///
/// Requesters are cheap to clone. Fetches are deduplicated per store
/// location across every requester in the process.
#[derive(Clone)]
pub struct PackageRequester {
    ctx: Arc<Context>,
}

impl PackageRequester {
    pub fn new(
        resolver: Arc<dyn Resolver>,
        fetchers: Fetchers,
        cafs: Cafs,
        config: RequesterConfig,
    ) -> Self {
        let permits = config.network_concurrency.max(1);
        Self {
            ctx: Arc::new(Context {
                resolver,
                fetchers,
                cafs,
                network: Semaphore::new(permits),
                platform: Platform::current(),
                config,
            }),
        }
    }

    /// Validate `config` and open the store it points to.
    pub fn open(
        resolver: Arc<dyn Resolver>,
        fetchers: Fetchers,
        config: RequesterConfig,
    ) -> anyhow::Result<Self> {
        if let Err(errors) = config.validate() {
            anyhow::bail!("Invalid requester config:\n  {}", errors.join("\n  "));
        }
        let store_dir = config.store_dir()?;
        let cafs = Cafs::open(&store_dir)
            .with_context(|| format!("Failed to open store at {}", store_dir.display()))?;
        Ok(Self::new(resolver, fetchers, cafs, config))
    }

    pub fn cafs(&self) -> &Cafs {
        &self.ctx.cafs
    }

    /// Resolve a wanted dependency and, unless told otherwise, start fetching it.
    #[instrument(skip(self, options), fields(dependency = %wanted))]
    pub async fn request_package(
        &self,
        wanted: &WantedDependency,
        options: RequestPackageOptions,
    ) -> Result<PackageResponse, RequestError> {
        let current = options.current_pkg.clone();
        let skip_resolution = current.is_some() && !options.update;
        // Without a fetch the manifest can only come from the resolver, and
        // local packages may have changed on disk since they were recorded
        let must_resolve = !skip_resolution
            || options.skip_fetch
            || wanted.optional
            || current.as_ref().is_some_and(|c| c.id.is_local());

        let resolved = match current {
            Some(current) if !must_resolve => Resolved::reused(current),
            current => {
                let result = self.resolve(wanted, &options).await?;
                Resolved::fresh(result, current.as_ref())
            }
        };

        if matches!(resolved.resolution, Resolution::Directory { .. }) && !resolved.id.is_local() {
            let Some(manifest) = resolved.manifest.clone() else {
                return Err(RequestError::LocalManifestMissing {
                    dependency: wanted.to_string(),
                });
            };
            return Ok(PackageResponse {
                body: resolved.body(Some(manifest), true, true),
                files_index_file: None,
                fetching: None,
            });
        }

        if let Some(manifest) = &resolved.manifest {
            let installable = self.is_installable(&resolved.id, manifest, wanted.optional);
            if options.skip_fetch || !installable {
                return Ok(PackageResponse {
                    body: resolved.body(Some(manifest.clone()), false, installable),
                    files_index_file: None,
                    fetching: None,
                });
            }
        }

        let expected = expected_identity(&resolved, options.expected_pkg.as_ref());
        let fetch = self.fetch_package_to_store(FetchPackageToStoreOptions {
            pkg: PkgToFetch {
                id: resolved.id.clone(),
                resolution: resolved.resolution.clone(),
                name: expected.name,
                version: expected.version,
            },
            lockfile_dir: options.lockfile_dir.clone(),
            force: resolved.force_fetch,
            fetch_raw_manifest: true,
        });

        let (manifest, is_installable) = match resolved.manifest.clone() {
            Some(manifest) => (Some(manifest), true),
            None => {
                let fetched = fetch.fetching.get().await?;
                match fetched.bundled_manifest {
                    Some(bundled) => {
                        let manifest = PackageManifest::from(bundled);
                        let installable =
                            self.is_installable(&resolved.id, &manifest, wanted.optional);
                        (Some(manifest), installable)
                    }
                    None => {
                        info!(
                            package = %resolved.id,
                            "Package has no package.json, it will not be installed"
                        );
                        (None, false)
                    }
                }
            }
        };

        let fetching = (is_installable && !options.skip_fetch).then_some(fetch.fetching);
        Ok(PackageResponse {
            body: resolved.body(manifest, false, is_installable),
            files_index_file: Some(fetch.files_index_file),
            fetching,
        })
    }

    /// Make a package's files available in the store.
    ///
    /// The returned `fetching` is shared with every concurrent request for
    /// the same store location in this process.
    pub fn fetch_package_to_store(&self, opts: FetchPackageToStoreOptions) -> FetchResponse {
        let files_index_file = self
            .ctx
            .cafs
            .index_path(&opts.pkg.id, self.ctx.config.virtual_store_dir_max_length);
        let wants_manifest = opts.fetch_raw_manifest;

        let shared = single_flight::join_or_start(&files_index_file, opts.force, || {
            let ctx = Arc::clone(&self.ctx);
            let files_index_file = files_index_file.clone();
            async move {
                fetch_to_store(&ctx, &opts, &files_index_file)
                    .await
                    .map_err(Arc::new)
            }
            .boxed()
        });

        FetchResponse {
            files_index_file,
            fetching: Fetching::new(shared, wants_manifest),
        }
    }

    async fn resolve(
        &self,
        wanted: &WantedDependency,
        options: &RequestPackageOptions,
    ) -> Result<ResolveResult, RequestError> {
        let _permit = self
            .ctx
            .network
            .acquire()
            .await
            .map_err(|_| RequestError::QueueClosed)?;

        let resolve_opts = ResolveOptions {
            lockfile_dir: options.lockfile_dir.clone(),
            project_dir: options.project_dir.clone(),
            preferred_versions: options.preferred_versions.clone(),
            current_pkg: options.current_pkg.clone(),
            update: options.update,
            download_priority: options.download_priority,
        };
        self.ctx
            .resolver
            .resolve(wanted, &resolve_opts)
            .await
            .map_err(|source| RequestError::Resolution {
                dependency: wanted.to_string(),
                source,
            })
    }

    fn is_installable(
        &self,
        id: &PkgResolutionId,
        manifest: &PackageManifest,
        optional: bool,
    ) -> bool {
        self.ctx.config.force
            || installable::is_installable(id, manifest, optional, &self.ctx.platform)
    }
}

/// What the resolution step settled on
struct Resolved {
    id: PkgResolutionId,
    resolution: Resolution,
    resolved_via: Option<ResolvedVia>,
    manifest: Option<PackageManifest>,
    latest: Option<String>,
    normalized_bare_specifier: Option<String>,
    alias: Option<String>,
    updated: bool,
    force_fetch: bool,
}

impl Resolved {
    fn reused(current: CurrentPkg) -> Self {
        Self {
            id: current.id,
            resolution: current.resolution,
            resolved_via: None,
            manifest: None,
            latest: None,
            normalized_bare_specifier: None,
            alias: None,
            updated: false,
            force_fetch: false,
        }
    }

    fn fresh(result: ResolveResult, current: Option<&CurrentPkg>) -> Self {
        // A local tarball whose integrity moved must be unpacked again
        let force_fetch = current.is_some_and(|c| {
            c.id.is_local() && c.resolution.integrity() != result.resolution.integrity()
        });
        // Local directories are read again on every request, so their
        // content may have changed even when the id did not
        let rereads_directory =
            result.id.is_local() && matches!(result.resolution, Resolution::Directory { .. });
        let updated =
            current.is_none_or(|c| c.id != result.id) || force_fetch || rereads_directory;
        Self {
            id: result.id,
            resolution: result.resolution,
            resolved_via: Some(result.resolved_via),
            manifest: result.manifest,
            latest: result.latest,
            normalized_bare_specifier: result.normalized_bare_specifier,
            alias: result.alias,
            updated,
            force_fetch,
        }
    }

    fn body(
        &self,
        manifest: Option<PackageManifest>,
        is_local: bool,
        is_installable: bool,
    ) -> PackageResponseBody {
        PackageResponseBody {
            id: self.id.clone(),
            resolution: self.resolution.clone(),
            resolved_via: self.resolved_via,
            manifest,
            latest: self.latest.clone(),
            is_local,
            is_installable,
            updated: self.updated,
            normalized_bare_specifier: self.normalized_bare_specifier.clone(),
            alias: self.alias.clone(),
        }
    }
}

/// Name and version the stored package must have.
///
/// A caller's expectation only holds for the version it recorded; once the
/// resolution changed, the freshly resolved version is expected instead.
fn expected_identity(resolved: &Resolved, expected: Option<&ExpectedPkg>) -> ExpectedPkg {
    let from_manifest = ExpectedPkg {
        name: resolved
            .manifest
            .as_ref()
            .and_then(|m| non_empty(&m.name))
            .map(str::to_string),
        version: resolved
            .manifest
            .as_ref()
            .and_then(|m| non_empty(&m.version))
            .map(str::to_string),
    };
    match expected {
        Some(expected) if expected.name.is_some() => {
            if resolved.updated {
                ExpectedPkg {
                    name: expected.name.clone(),
                    version: from_manifest.version,
                }
            } else {
                expected.clone()
            }
        }
        _ => from_manifest,
    }
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

fn check_identity(
    pkg: &PkgToFetch,
    found_name: Option<&str>,
    found_version: Option<&str>,
) -> Result<(), RequestError> {
    let name_differs = match (found_name, pkg.name.as_deref()) {
        (Some(found), Some(expected)) => found.to_lowercase() != expected.to_lowercase(),
        _ => false,
    };
    let version_differs = match (found_version, pkg.version.as_deref()) {
        (Some(found), Some(expected)) => !equal_or_semver_equal(found, expected),
        _ => false,
    };
    if !name_differs && !version_differs {
        return Ok(());
    }

    Err(RequestError::UnexpectedPackageContent {
        resolution: pkg.resolution.to_string(),
        expected: format!(
            "{}@{}",
            pkg.name.as_deref().unwrap_or_default(),
            pkg.version.as_deref().unwrap_or_default()
        ),
        actual: format!(
            "{}@{}",
            found_name.unwrap_or_default(),
            found_version.unwrap_or_default()
        ),
    })
}

#[instrument(skip_all, fields(package = %opts.pkg.id))]
async fn fetch_to_store(
    ctx: &Context,
    opts: &FetchPackageToStoreOptions,
    files_index_file: &Path,
) -> Result<FetchResult, RequestError> {
    let pkg = &opts.pkg;
    let is_local_dir = matches!(pkg.resolution, Resolution::Directory { .. });
    let is_local_tarball = pkg.id.is_local() && !is_local_dir;
    let record_dir = ctx
        .cafs
        .local_record_dir(&pkg.id, ctx.config.virtual_store_dir_max_length);

    let may_reuse = !opts.force
        && !is_local_dir
        && (!is_local_tarball
            || local_tarball::is_up_to_date(&pkg.resolution, &record_dir, &opts.lockfile_dir)
                .await);

    if may_reuse {
        let stored = read_index(ctx, files_index_file).await.unwrap_or_else(|e| {
            debug!(error = %e, "Files index is unreadable");
            None
        });
        if let Some(index) = stored {
            check_identity(pkg, index.name.as_deref(), index.version.as_deref())?;
            match reuse_stored(ctx, index, files_index_file, opts.fetch_raw_manifest).await {
                Some(result) => {
                    debug!("Package found in store");
                    return Ok(result);
                }
                None => warn!(
                    prefix = %opts.lockfile_dir.display(),
                    "Refetching {} to store. It was either modified or had no integrity checksums",
                    files_index_file.display()
                ),
            }
        }
    }

    let fetcher = ctx.fetchers.pick(&pkg.resolution)?;
    let fetch_opts = FetchOptions {
        lockfile_dir: opts.lockfile_dir.clone(),
        files_index_file: files_index_file.to_path_buf(),
        pkg_name: pkg.name.clone(),
        pkg_version: pkg.version.clone(),
    };
    let raw = {
        let _permit = ctx
            .network
            .acquire()
            .await
            .map_err(|_| RequestError::QueueClosed)?;
        info!("Fetching package");
        fetcher
            .fetch(&pkg.id, &pkg.resolution, &fetch_opts)
            .await
            .map_err(|source| RequestError::Fetch {
                id: pkg.id.clone(),
                source,
            })?
    };

    let cafs = ctx.cafs.clone();
    let id = pkg.id.clone();
    let expected_integrity = pkg.resolution.integrity().cloned();
    let AddFilesResult { files, manifest } =
        tokio::task::spawn_blocking(move || -> Result<AddFilesResult, RequestError> {
            match raw {
                RawContent::Tarball(bytes) => {
                    if let Some(expected) = expected_integrity {
                        if !expected.check(&bytes) {
                            let actual = Integrity::with_algorithm(expected.algorithm(), &bytes);
                            return Err(RequestError::TarballIntegrity {
                                id,
                                expected,
                                actual,
                            });
                        }
                    }
                    Ok(cafs.add_files_from_tarball(&bytes)?)
                }
                RawContent::Directory(dir) => Ok(cafs.add_files_from_dir(&dir)?),
            }
        })
        .await??;

    let name = manifest.as_ref().and_then(|m| non_empty(&m.name)).map(str::to_string);
    let version = manifest
        .as_ref()
        .and_then(|m| non_empty(&m.version))
        .map(str::to_string);
    check_identity(pkg, name.as_deref(), version.as_deref())?;

    let resolved_from = if is_local_dir {
        ResolvedFrom::LocalDir
    } else {
        ResolvedFrom::Remote
    };
    let files_index = ctx.cafs.files_to_paths(&files);
    let index = PackageFilesIndex {
        name,
        version,
        manifest: if opts.fetch_raw_manifest {
            manifest.clone()
        } else {
            None
        },
        resolved_from: Some(resolved_from),
        files,
    };
    write_index(ctx, files_index_file, index).await?;

    if is_local_tarball {
        if let Some(integrity) = pkg.resolution.integrity() {
            local_tarball::write_record(&record_dir, integrity).await?;
        }
    }

    info!(files = files_index.len(), %resolved_from, "Stored package");
    Ok(FetchResult {
        files: FetchedFiles {
            files_index,
            resolved_from,
        },
        bundled_manifest: if opts.fetch_raw_manifest { manifest } else { None },
    })
}

async fn read_index(
    ctx: &Context,
    files_index_file: &Path,
) -> Result<Option<PackageFilesIndex>, RequestError> {
    let cafs = ctx.cafs.clone();
    let path = files_index_file.to_path_buf();
    Ok(tokio::task::spawn_blocking(move || cafs.read_index(&path)).await??)
}

async fn write_index(
    ctx: &Context,
    files_index_file: &Path,
    index: PackageFilesIndex,
) -> Result<(), RequestError> {
    let cafs = ctx.cafs.clone();
    let path = files_index_file.to_path_buf();
    Ok(tokio::task::spawn_blocking(move || cafs.write_index(&path, &index)).await??)
}

/// Serve a package from an existing index, or `None` when it must be fetched again.
///
/// Store errors on this path are not fatal; they only mean the package is
/// fetched again.
async fn reuse_stored(
    ctx: &Context,
    mut index: PackageFilesIndex,
    files_index_file: &Path,
    fetch_raw_manifest: bool,
) -> Option<FetchResult> {
    let cafs = ctx.cafs.clone();
    let verify = ctx.config.verify_store_integrity;
    let path = files_index_file.to_path_buf();

    let reused = tokio::task::spawn_blocking(move || -> Result<Option<FetchResult>, RequestError> {
        let before = index.files.clone();
        if verify && !cafs.verify_integrity(&mut index.files) {
            return Ok(None);
        }
        let mut dirty = index.files != before;

        let mut manifest = index.manifest.clone();
        if fetch_raw_manifest && manifest.is_none() {
            manifest = match cafs.read_manifest(&index.files) {
                Ok(manifest) => manifest,
                Err(e) => {
                    debug!(error = %e, "Stored package.json is unusable");
                    return Ok(None);
                }
            };
            if manifest.is_some() {
                index.manifest = manifest.clone();
                dirty = true;
            }
        }

        if dirty {
            cafs.write_index(&path, &index)?;
        }

        Ok(Some(FetchResult {
            files: FetchedFiles {
                files_index: cafs.files_to_paths(&index.files),
                resolved_from: ResolvedFrom::Store,
            },
            bundled_manifest: if fetch_raw_manifest { manifest } else { None },
        }))
    })
    .await
    .map_err(RequestError::from)
    .and_then(|reused| reused);

    reused.unwrap_or_else(|e| {
        debug!(error = %e, "Stored package could not be reused");
        None
    })
}

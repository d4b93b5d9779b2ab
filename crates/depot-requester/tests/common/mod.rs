//! Shared fixtures for requester integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use depot_cafs::Cafs;
use depot_core::{
    FetchOptions, Fetcher, FetcherKind, Fetchers, Integrity, PackageManifest, PkgResolutionId,
    RawContent, ResolveOptions, ResolveResult, Resolution, ResolvedVia, Resolver,
    WantedDependency,
};
use depot_requester::PackageRequester;
use depot_requester::config::RequesterConfig;
use depot_requester::types::RequestPackageOptions;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::json;
use tempfile::TempDir;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

/// Gzipped tarball with every file under `package/`, like registry tarballs
pub fn tarball(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, bytes) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(bytes.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("package/{path}"), *bytes)
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

pub fn package_tarball(manifest: &serde_json::Value) -> Vec<u8> {
    let manifest = manifest.to_string();
    tarball(&[
        ("package.json", manifest.as_bytes()),
        ("index.js", b"module.exports = true\n"),
    ])
}

pub fn registry_url(name: &str, version: &str) -> String {
    format!("https://registry.example/{name}/-/{name}-{version}.tgz")
}

struct Published {
    manifest: PackageManifest,
    resolution: Resolution,
}

/// In-memory registry. Serves exact `name@version` specifiers, `file:`
/// tarballs and directories, `link:` directories and `git+` repositories.
#[derive(Default)]
pub struct Registry {
    packages: Mutex<HashMap<String, Published>>,
    tarballs: Mutex<HashMap<String, Vec<u8>>>,
    resolutions: AtomicUsize,
}

impl Registry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn publish(&self, name: &str, version: &str) -> Integrity {
        self.publish_manifest(json!({ "name": name, "version": version }))
    }

    /// Publish a package whose tarball carries `manifest` as its package.json.
    pub fn publish_manifest(&self, manifest: serde_json::Value) -> Integrity {
        let bytes = package_tarball(&manifest);
        let manifest: PackageManifest = serde_json::from_value(manifest).unwrap();
        self.publish_tarball(&manifest.name.clone(), &manifest.version.clone(), manifest, bytes)
    }

    /// Publish arbitrary tarball bytes under `name@version`.
    pub fn publish_tarball(
        &self,
        name: &str,
        version: &str,
        manifest: PackageManifest,
        bytes: Vec<u8>,
    ) -> Integrity {
        let integrity = Integrity::from_bytes(&bytes);
        let id = format!("{name}@{version}");
        let resolution = Resolution::Tarball {
            tarball: registry_url(name, version),
            integrity: Some(integrity.clone()),
        };
        self.packages.lock().unwrap().insert(
            id.clone(),
            Published {
                manifest,
                resolution,
            },
        );
        self.tarballs.lock().unwrap().insert(id, bytes);
        integrity
    }

    /// Serve different bytes than the ones the published integrity describes.
    pub fn replace_tarball(&self, id: &str, bytes: Vec<u8>) {
        self.tarballs.lock().unwrap().insert(id.to_string(), bytes);
    }

    /// A git-hosted package. Git resolutions come without a manifest.
    pub fn publish_git(&self, repo: &str, commit: &str, bytes: Vec<u8>) {
        self.tarballs
            .lock()
            .unwrap()
            .insert(git_id(repo, commit), bytes);
    }

    pub fn resolution_count(&self) -> usize {
        self.resolutions.load(Ordering::SeqCst)
    }

    fn tarball_for(&self, id: &str) -> Option<Vec<u8>> {
        self.tarballs.lock().unwrap().get(id).cloned()
    }
}

fn git_id(repo: &str, commit: &str) -> String {
    format!("{repo}#{commit}")
}

#[async_trait]
impl Resolver for Registry {
    async fn resolve(
        &self,
        wanted: &WantedDependency,
        opts: &ResolveOptions,
    ) -> anyhow::Result<ResolveResult> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        let specifier = wanted.bare_specifier.as_str();

        if let Some(relative) = specifier.strip_prefix("link:") {
            let dir = opts.lockfile_dir.join(relative);
            let mut result = ResolveResult::new(
                format!("link:{relative}"),
                Resolution::Directory {
                    directory: relative.into(),
                },
                ResolvedVia::LocalFilesystem,
            );
            if let Ok(bytes) = std::fs::read(dir.join("package.json")) {
                result = result.with_manifest(serde_json::from_slice(&bytes)?);
            }
            return Ok(result);
        }

        if let Some(relative) = specifier.strip_prefix("file:") {
            let path = opts.lockfile_dir.join(relative);
            if path.is_dir() {
                return Ok(ResolveResult::new(
                    specifier,
                    Resolution::Directory {
                        directory: relative.into(),
                    },
                    ResolvedVia::LocalFilesystem,
                ));
            }
            let bytes = std::fs::read(&path)?;
            return Ok(ResolveResult::new(
                specifier,
                Resolution::Tarball {
                    tarball: specifier.to_string(),
                    integrity: Some(Integrity::from_bytes(&bytes)),
                },
                ResolvedVia::LocalFilesystem,
            ));
        }

        if let Some(rest) = specifier.strip_prefix("git+") {
            let (repo, commit) = rest
                .split_once('#')
                .ok_or_else(|| anyhow::anyhow!("git specifier without commit: {specifier}"))?;
            return Ok(ResolveResult::new(
                git_id(repo, commit),
                Resolution::Git {
                    repo: repo.to_string(),
                    commit: commit.to_string(),
                },
                ResolvedVia::GitRepository,
            ));
        }

        let name = wanted.alias.as_deref().unwrap_or_default();
        let id = format!("{name}@{specifier}");
        let packages = self.packages.lock().unwrap();
        let published = packages
            .get(&id)
            .ok_or_else(|| anyhow::anyhow!("No matching version found for {wanted}"))?;
        Ok(ResolveResult::new(
            id.as_str(),
            published.resolution.clone(),
            ResolvedVia::NpmRegistry,
        )
        .with_manifest(published.manifest.clone()))
    }
}

/// Serves registry, local and git tarballs plus local directories.
/// Counts calls and can fail the first N of them.
pub struct RegistryFetcher {
    registry: Arc<Registry>,
    calls: AtomicUsize,
    failures_left: AtomicUsize,
}

impl RegistryFetcher {
    pub fn new(registry: Arc<Registry>) -> Arc<Self> {
        Arc::new(Self {
            registry,
            calls: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(0),
        })
    }

    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for RegistryFetcher {
    async fn fetch(
        &self,
        id: &PkgResolutionId,
        resolution: &Resolution,
        opts: &FetchOptions,
    ) -> anyhow::Result<RawContent> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            anyhow::bail!("404 Not Found");
        }

        if let Resolution::Directory { directory } = resolution {
            return Ok(RawContent::Directory(opts.lockfile_dir.join(directory)));
        }
        if let Some(relative) = resolution.local_tarball_path() {
            return Ok(RawContent::Tarball(std::fs::read(opts.lockfile_dir.join(relative))?));
        }
        self.registry
            .tarball_for(id.as_str())
            .map(RawContent::Tarball)
            .ok_or_else(|| anyhow::anyhow!("404 Not Found: {id}"))
    }
}

pub fn fetchers(fetcher: &Arc<RegistryFetcher>) -> Fetchers {
    Fetchers::new()
        .with(FetcherKind::RemoteTarball, fetcher.clone())
        .with(FetcherKind::LocalTarball, fetcher.clone())
        .with(FetcherKind::Git, fetcher.clone())
        .with(FetcherKind::Directory, fetcher.clone())
}

/// A store, a project directory and a requester wired to a mock registry
pub struct Fixture {
    pub store: TempDir,
    pub project: TempDir,
    pub registry: Arc<Registry>,
    pub fetcher: Arc<RegistryFetcher>,
    pub requester: PackageRequester,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(RequesterConfig::default())
    }

    pub fn with_config(config: RequesterConfig) -> Self {
        let store = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let registry = Registry::new();
        let fetcher = RegistryFetcher::new(registry.clone());
        let requester = requester_for(store.path(), &registry, &fetcher, config);
        Self {
            store,
            project,
            registry,
            fetcher,
            requester,
        }
    }

    /// A separately constructed requester over the same store and registry.
    pub fn second_requester(&self) -> PackageRequester {
        requester_for(
            self.store.path(),
            &self.registry,
            &self.fetcher,
            RequesterConfig::default(),
        )
    }

    pub fn options(&self) -> RequestPackageOptions {
        RequestPackageOptions {
            lockfile_dir: self.project.path().to_path_buf(),
            project_dir: self.project.path().to_path_buf(),
            ..Default::default()
        }
    }

    pub fn write_project_file(&self, relative: &str, bytes: &[u8]) {
        let path = self.project.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }
}

fn requester_for(
    store_dir: &Path,
    registry: &Arc<Registry>,
    fetcher: &Arc<RegistryFetcher>,
    config: RequesterConfig,
) -> PackageRequester {
    PackageRequester::new(
        registry.clone(),
        fetchers(fetcher),
        Cafs::open(store_dir).unwrap(),
        config,
    )
}

/// Collects formatted log output for assertions
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Route this thread's events into the capture until the guard drops.
    pub fn install(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

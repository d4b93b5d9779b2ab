use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::resolution::{CurrentPkg, ResolveResult, WantedDependency};

/// Package name → versions already chosen elsewhere in the graph
pub type PreferredVersions = HashMap<String, Vec<String>>;

/// Context handed to a `Resolver` for a single request
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub lockfile_dir: PathBuf,
    pub project_dir: PathBuf,
    pub preferred_versions: PreferredVersions,
    pub current_pkg: Option<CurrentPkg>,
    pub update: bool,
    pub download_priority: i32,
}

/// Turns a specifier into a concrete resolution, usually by asking a registry
///
/// Implementations must fail with a descriptive error when nothing matches.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(
        &self,
        wanted: &WantedDependency,
        opts: &ResolveOptions,
    ) -> anyhow::Result<ResolveResult>;
}

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::integrity::Integrity;
use crate::manifest::PackageManifest;

/// A dependency as declared by a project: `alias` → `bare_specifier`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WantedDependency {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    pub bare_specifier: String,

    /// Optional dependencies may be skipped when they do not fit the platform
    #[serde(default)]
    pub optional: bool,
}

impl WantedDependency {
    pub fn new(alias: impl Into<String>, bare_specifier: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
            bare_specifier: bare_specifier.into(),
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

impl fmt::Display for WantedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{}@{}", alias, self.bare_specifier),
            None => f.write_str(&self.bare_specifier),
        }
    }
}

/// Stable identity of a resolved package, e.g. `is-positive@1.0.0` or `file:pkg.tgz`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PkgResolutionId(String);

impl PkgResolutionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Ids of packages installed from a path on disk start with `file:`
    pub fn is_local(&self) -> bool {
        self.0.starts_with("file:")
    }
}

impl fmt::Display for PkgResolutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PkgResolutionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PkgResolutionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Where a package's content comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Resolution {
    Tarball {
        tarball: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        integrity: Option<Integrity>,
    },
    Directory {
        directory: PathBuf,
    },
    Git {
        repo: String,
        commit: String,
    },
}

impl Resolution {
    pub fn integrity(&self) -> Option<&Integrity> {
        match self {
            Resolution::Tarball { integrity, .. } => integrity.as_ref(),
            _ => None,
        }
    }

    /// Path of a `file:` tarball relative to the lockfile directory.
    pub fn local_tarball_path(&self) -> Option<&str> {
        match self {
            Resolution::Tarball { tarball, .. } => tarball.strip_prefix("file:"),
            _ => None,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Resolution::Directory { .. }) || self.local_tarball_path().is_some()
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{self:?}"),
        }
    }
}

/// How the resolver arrived at a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolvedVia {
    NpmRegistry,
    GitRepository,
    LocalFilesystem,
    Url,
    Workspace,
}

/// What a `Resolver` returns for a wanted dependency.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveResult {
    pub id: PkgResolutionId,
    pub resolution: Resolution,
    pub resolved_via: ResolvedVia,
    pub manifest: Option<PackageManifest>,
    pub latest: Option<String>,
    pub normalized_bare_specifier: Option<String>,
    pub alias: Option<String>,
}

impl ResolveResult {
    pub fn new(
        id: impl Into<PkgResolutionId>,
        resolution: Resolution,
        resolved_via: ResolvedVia,
    ) -> Self {
        Self {
            id: id.into(),
            resolution,
            resolved_via,
            manifest: None,
            latest: None,
            normalized_bare_specifier: None,
            alias: None,
        }
    }

    pub fn with_manifest(mut self, manifest: PackageManifest) -> Self {
        self.manifest = Some(manifest);
        self
    }
}

/// A package recorded by a previous install, typically read from a lockfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentPkg {
    pub id: PkgResolutionId,
    pub resolution: Resolution,
}

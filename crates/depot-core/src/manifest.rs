//! Package manifests
//!
//! Only the fields the pipeline acts on are typed. `PackageManifest` keeps
//! every other field around untouched, while `BundledManifest` is the subset
//! persisted next to a package's files index.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::version::clean_version;

pub type DependencyMap = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub libc: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engines: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripts: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directories: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<DependencyMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional_dependencies: Option<DependencyMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_dependencies: Option<DependencyMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_dependencies_meta: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundled_dependencies: Option<Value>,

    /// Fields the pipeline does not interpret
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// The manifest subset stored alongside a package in the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundledManifest {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub libc: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engines: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripts: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directories: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<DependencyMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional_dependencies: Option<DependencyMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_dependencies: Option<DependencyMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_dependencies_meta: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundled_dependencies: Option<Value>,
}

impl BundledManifest {
    /// Parse a raw `package.json`, dropping unknown fields and normalizing the version.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let mut manifest: BundledManifest = serde_json::from_slice(bytes)?;
        if let Some(cleaned) = clean_version(&manifest.version) {
            manifest.version = cleaned;
        }
        Ok(manifest)
    }
}

impl From<&PackageManifest> for BundledManifest {
    fn from(manifest: &PackageManifest) -> Self {
        BundledManifest {
            name: manifest.name.clone(),
            version: clean_version(&manifest.version).unwrap_or_else(|| manifest.version.clone()),
            os: manifest.os.clone(),
            cpu: manifest.cpu.clone(),
            libc: manifest.libc.clone(),
            engines: manifest.engines.clone(),
            scripts: manifest.scripts.clone(),
            bin: manifest.bin.clone(),
            directories: manifest.directories.clone(),
            dependencies: manifest.dependencies.clone(),
            optional_dependencies: manifest.optional_dependencies.clone(),
            peer_dependencies: manifest.peer_dependencies.clone(),
            peer_dependencies_meta: manifest.peer_dependencies_meta.clone(),
            bundled_dependencies: manifest.bundled_dependencies.clone(),
        }
    }
}

impl From<BundledManifest> for PackageManifest {
    fn from(manifest: BundledManifest) -> Self {
        PackageManifest {
            name: manifest.name,
            version: manifest.version,
            os: manifest.os,
            cpu: manifest.cpu,
            libc: manifest.libc,
            engines: manifest.engines,
            scripts: manifest.scripts,
            bin: manifest.bin,
            directories: manifest.directories,
            dependencies: manifest.dependencies,
            optional_dependencies: manifest.optional_dependencies,
            peer_dependencies: manifest.peer_dependencies,
            peer_dependencies_meta: manifest.peer_dependencies_meta,
            bundled_dependencies: manifest.bundled_dependencies,
            other: Map::new(),
        }
    }
}

//! Platform compatibility of packages
//!
//! Manifests may restrict the operating systems, CPUs and C libraries they
//! support (`"os": ["darwin", "!win32"]`). An incompatible optional
//! dependency is skipped; anything else is installed with a warning.

use depot_core::{PackageManifest, PkgResolutionId};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: &'static str,
    pub cpu: &'static str,
    pub libc: Option<&'static str>,
}

impl Platform {
    /// The platform this process runs on, in package manifest terms.
    pub fn current() -> Self {
        let os = match std::env::consts::OS {
            "windows" => "win32",
            "macos" => "darwin",
            other => other,
        };
        let cpu = match std::env::consts::ARCH {
            "x86_64" => "x64",
            "aarch64" => "arm64",
            "x86" => "ia32",
            other => other,
        };
        let libc = if cfg!(target_env = "musl") {
            Some("musl")
        } else if cfg!(target_os = "linux") {
            Some("glibc")
        } else {
            None
        };
        Self { os, cpu, libc }
    }
}

/// The first manifest field that rules out `platform`, if any.
pub fn unsupported_field(manifest: &PackageManifest, platform: &Platform) -> Option<&'static str> {
    if let Some(os) = &manifest.os {
        if !allows(os, Some(platform.os)) {
            return Some("os");
        }
    }
    if let Some(cpu) = &manifest.cpu {
        if !allows(cpu, Some(platform.cpu)) {
            return Some("cpu");
        }
    }
    if let Some(libc) = &manifest.libc {
        if !allows(libc, platform.libc) {
            return Some("libc");
        }
    }
    None
}

fn allows(wanted: &[String], current: Option<&str>) -> bool {
    let mut has_allow_list = false;
    let mut allowed = false;
    for entry in wanted {
        match entry.strip_prefix('!') {
            Some(blocked) => {
                if Some(blocked) == current {
                    return false;
                }
            }
            None => {
                has_allow_list = true;
                if entry == "any" || Some(entry.as_str()) == current {
                    allowed = true;
                }
            }
        }
    }
    !has_allow_list || allowed
}

/// Whether a package should be installed on `platform`.
///
/// Only optional dependencies are ever reported as not installable.
pub fn is_installable(
    id: &PkgResolutionId,
    manifest: &PackageManifest,
    optional: bool,
    platform: &Platform,
) -> bool {
    let Some(field) = unsupported_field(manifest, platform) else {
        return true;
    };
    if optional {
        info!(package = %id, field, "Skipping optional dependency: unsupported platform");
        false
    } else {
        warn!(package = %id, field, "Unsupported platform for {}", id);
        true
    }
}

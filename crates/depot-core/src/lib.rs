//! Shared building blocks for the depot dependency pipeline
//!
//! The catalog resolver, the content-addressable store and the package
//! requester all speak the types defined here.
//!
//! ## Modules
//!
//! - `resolution` - wanted dependencies, resolutions and resolver output
//! - `manifest` - package manifests and the bundled subset kept with the store
//! - `integrity` - Subresource Integrity strings used for tarballs and files
//! - `dep_path` - length-bounded, filesystem-safe encoding of package ids
//! - `version` - loose version comparison
//! - `traits` - the `Resolver` and `Fetcher` capabilities

pub mod dep_path;
pub mod error;
pub mod integrity;
pub mod manifest;
pub mod resolution;
pub mod traits;
pub mod version;

pub use dep_path::dep_path_to_filename;
pub use error::{FetcherError, IntegrityError};
pub use integrity::{Algorithm, Integrity};
pub use manifest::{BundledManifest, PackageManifest};
pub use resolution::{
    CurrentPkg, PkgResolutionId, ResolveResult, Resolution, ResolvedVia, WantedDependency,
};
pub use traits::{
    FetchOptions, Fetcher, FetcherKind, Fetchers, RawContent, ResolveOptions, Resolver,
};
pub use version::{clean_version, equal_or_semver_equal};

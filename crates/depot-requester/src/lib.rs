//! Package requester for depot
//!
//! Turns a wanted dependency into a resolved package and, on demand, a
//! verified file set in the content-addressable store.
//!
//! ## Architecture
//!
//! - `requester` - `PackageRequester`, the resolve → fetch → store pipeline
//! - `single_flight` - process-wide deduplication of in-flight fetches
//! - `local_tarball` - freshness records for `file:` tarballs
//! - `installable` - platform checks for optional dependencies
//! - `config` - requester configuration (TOML)
//! - `logging` - tracing subscriber setup
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use depot_core::{Fetchers, Resolver, WantedDependency};
//! use depot_requester::{PackageRequester, RequestPackageOptions, config};
//!
//! # async fn example(resolver: Arc<dyn Resolver>, fetchers: Fetchers) -> anyhow::Result<()> {
//! let requester = PackageRequester::open(resolver, fetchers, config::load_config()?)?;
//! let wanted = WantedDependency::new("is-positive", "^1.0.0");
//! let response = requester
//!     .request_package(&wanted, RequestPackageOptions::default())
//!     .await?;
//! if let Some(fetching) = response.fetching {
//!     let fetched = fetching.get().await?;
//!     println!("{} files from {}", fetched.files.files_index.len(), fetched.files.resolved_from);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod installable;
pub mod local_tarball;
pub mod logging;
pub mod requester;
mod single_flight;
pub mod types;

pub use error::RequestError;
pub use requester::PackageRequester;
pub use types::{
    ExpectedPkg, FetchPackageToStoreOptions, FetchResponse, FetchResult, FetchedFiles, Fetching,
    PackageResponse, PackageResponseBody, PkgToFetch, RequestPackageOptions,
};

//! Catalog resolution for depot
//!
//! A catalog is a named table of pinned specifiers shared by every project in
//! a workspace. A dependency declared as `catalog:` (or `catalog:<name>`)
//! takes its real specifier from that table.
//!
//! ```rust
//! use std::collections::HashMap;
//! use depot_catalogs::{resolve_from_catalog, CatalogResolveResult, WantedDependency};
//!
//! let mut catalogs = HashMap::new();
//! catalogs.insert(
//!     "default".to_string(),
//!     HashMap::from([("react".to_string(), "^18.2.0".to_string())]),
//! );
//!
//! let wanted = WantedDependency::new("react", "catalog:");
//! match resolve_from_catalog(&catalogs, &wanted) {
//!     CatalogResolveResult::Found(found) => assert_eq!(found.specifier, "^18.2.0"),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```
//!
//! Resolution is pure: catalogs are handed in fully loaded and nothing here
//! touches the filesystem or the network.

pub mod error;
pub mod protocol;
pub mod resolver;

pub use error::CatalogError;
pub use protocol::{DEFAULT_CATALOG, parse_catalog_protocol};
pub use resolver::{
    CatalogMisconfiguration, CatalogResolution, CatalogResolveResult, CatalogResultMatcher,
    Catalogs, WantedDependency, match_catalog_resolve_result, resolve_from_catalog,
};

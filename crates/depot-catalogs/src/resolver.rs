use std::collections::HashMap;

pub use depot_core::WantedDependency;

use crate::error::CatalogError;
use crate::protocol::parse_catalog_protocol;

/// Catalog name → (package name → pinned specifier)
pub type Catalogs = HashMap<String, HashMap<String, String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogResolution {
    pub catalog_name: String,
    pub specifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogMisconfiguration {
    pub catalog_name: String,
    pub error: CatalogError,
}

/// Outcome of looking a dependency up in the catalogs.
///
/// Misconfigurations are returned as data. Callers decide whether to raise
/// them, typically through [`CatalogResolveResult::into_result`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogResolveResult {
    Found(CatalogResolution),
    Misconfiguration(CatalogMisconfiguration),
    /// The specifier does not use the catalog protocol
    Unused,
}

impl CatalogResolveResult {
    /// Turn a misconfiguration into an error. `Unused` becomes `Ok(None)`.
    pub fn into_result(self) -> Result<Option<CatalogResolution>, CatalogError> {
        match self {
            CatalogResolveResult::Found(resolution) => Ok(Some(resolution)),
            CatalogResolveResult::Misconfiguration(misconfiguration) => Err(misconfiguration.error),
            CatalogResolveResult::Unused => Ok(None),
        }
    }
}

/// Handlers for each variant of [`CatalogResolveResult`]
pub struct CatalogResultMatcher<F, M, U> {
    pub found: F,
    pub misconfiguration: M,
    pub unused: U,
}

/// Call exactly one handler of `matcher`, picked by the variant of `result`.
pub fn match_catalog_resolve_result<T, F, M, U>(
    result: CatalogResolveResult,
    matcher: CatalogResultMatcher<F, M, U>,
) -> T
where
    F: FnOnce(CatalogResolution) -> T,
    M: FnOnce(CatalogMisconfiguration) -> T,
    U: FnOnce() -> T,
{
    match result {
        CatalogResolveResult::Found(resolution) => (matcher.found)(resolution),
        CatalogResolveResult::Misconfiguration(misconfiguration) => {
            (matcher.misconfiguration)(misconfiguration)
        }
        CatalogResolveResult::Unused => (matcher.unused)(),
    }
}

/// Replace a `catalog:` specifier with the entry pinned in `catalogs`.
///
/// Entries are keyed by alias, so a dependency without one is never found.
pub fn resolve_from_catalog(
    catalogs: &Catalogs,
    wanted: &WantedDependency,
) -> CatalogResolveResult {
    let Some(catalog_name) = parse_catalog_protocol(&wanted.bare_specifier) else {
        return CatalogResolveResult::Unused;
    };

    let alias = wanted.alias.clone().unwrap_or_default();
    let misconfigured = |error: CatalogError| {
        CatalogResolveResult::Misconfiguration(CatalogMisconfiguration {
            catalog_name: catalog_name.to_string(),
            error,
        })
    };

    let Some(entry) = catalogs
        .get(catalog_name)
        .and_then(|catalog| catalog.get(alias.as_str()))
    else {
        return misconfigured(CatalogError::EntryNotFound {
            alias,
            catalog_name: catalog_name.to_string(),
        });
    };

    if parse_catalog_protocol(entry).is_some() {
        return misconfigured(CatalogError::RecursiveDefinition {
            alias,
            catalog_name: catalog_name.to_string(),
        });
    }

    let protocol = entry.split(':').next().unwrap_or_default();
    match protocol {
        "workspace" => misconfigured(CatalogError::WorkspaceSpec {
            alias,
            catalog_name: catalog_name.to_string(),
        }),
        // Relative paths would resolve differently per project
        "file" | "link" => misconfigured(CatalogError::UnsupportedProtocol {
            alias,
            catalog_name: catalog_name.to_string(),
            protocol: protocol.to_string(),
        }),
        _ => CatalogResolveResult::Found(CatalogResolution {
            catalog_name: catalog_name.to_string(),
            specifier: entry.clone(),
        }),
    }
}

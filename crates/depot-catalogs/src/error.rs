use thiserror::Error;

/// A catalog entry that cannot be used for the dependency that referenced it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("No catalog entry '{alias}' was found for catalog '{catalog_name}'.")]
    EntryNotFound { alias: String, catalog_name: String },

    #[error(
        "Found invalid catalog entry using the catalog protocol recursively. The entry for '{alias}' in catalog '{catalog_name}' is invalid."
    )]
    RecursiveDefinition { alias: String, catalog_name: String },

    #[error(
        "The workspace protocol cannot be used as a catalog value. The entry for '{alias}' in catalog '{catalog_name}' is invalid."
    )]
    WorkspaceSpec { alias: String, catalog_name: String },

    #[error(
        "The entry for '{alias}' in catalog '{catalog_name}' declares a dependency using the '{protocol}' protocol. This is not yet supported, but may be in a future version of depot."
    )]
    UnsupportedProtocol {
        alias: String,
        catalog_name: String,
        protocol: String,
    },
}

impl CatalogError {
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::EntryNotFound { .. } => "CATALOG_ENTRY_NOT_FOUND_FOR_SPEC",
            CatalogError::RecursiveDefinition { .. } => "CATALOG_ENTRY_INVALID_RECURSIVE_DEFINITION",
            CatalogError::WorkspaceSpec { .. } => "CATALOG_ENTRY_INVALID_WORKSPACE_SPEC",
            CatalogError::UnsupportedProtocol { .. } => "CATALOG_ENTRY_INVALID_SPEC",
        }
    }

    pub fn alias(&self) -> &str {
        match self {
            CatalogError::EntryNotFound { alias, .. }
            | CatalogError::RecursiveDefinition { alias, .. }
            | CatalogError::WorkspaceSpec { alias, .. }
            | CatalogError::UnsupportedProtocol { alias, .. } => alias,
        }
    }

    pub fn catalog_name(&self) -> &str {
        match self {
            CatalogError::EntryNotFound { catalog_name, .. }
            | CatalogError::RecursiveDefinition { catalog_name, .. }
            | CatalogError::WorkspaceSpec { catalog_name, .. }
            | CatalogError::UnsupportedProtocol { catalog_name, .. } => catalog_name,
        }
    }
}

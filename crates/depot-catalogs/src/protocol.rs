const CATALOG_PROTOCOL: &str = "catalog:";

/// Catalog used when a specifier names none (`catalog:`)
pub const DEFAULT_CATALOG: &str = "default";

/// Extract the catalog name from a `catalog:` specifier.
///
/// Returns `None` for specifiers that do not use the catalog protocol.
pub fn parse_catalog_protocol(bare_specifier: &str) -> Option<&str> {
    let name = bare_specifier.strip_prefix(CATALOG_PROTOCOL)?.trim();
    if name.is_empty() {
        Some(DEFAULT_CATALOG)
    } else {
        Some(name)
    }
}

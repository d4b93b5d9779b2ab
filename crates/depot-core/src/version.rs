use std::cmp::Ordering;

use semver::Version;

/// Parse a version, tolerating a leading `v` or `=` and surrounding whitespace.
fn parse_loose(version: &str) -> Option<Version> {
    let trimmed = version.trim().trim_start_matches(['=', 'v']).trim();
    Version::parse(trimmed).ok()
}

/// Normalize a version string (`v1.2.1` → `1.2.1`). Returns `None` when it is not semver.
pub fn clean_version(version: &str) -> Option<String> {
    parse_loose(version).map(|v| v.to_string())
}

/// Compare two versions the way a registry does: identical text, or the same semver precedence.
pub fn equal_or_semver_equal(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (parse_loose(a), parse_loose(b)) {
        (Some(a), Some(b)) => a.cmp_precedence(&b) == Ordering::Equal,
        _ => false,
    }
}

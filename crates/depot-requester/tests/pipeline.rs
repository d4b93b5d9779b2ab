//! Catalog lookup feeding the requester, the way an install drives them

mod common;

use std::collections::HashMap;

use common::Fixture;
use depot_cafs::ResolvedFrom;
use depot_catalogs::{CatalogError, Catalogs, resolve_from_catalog};
use depot_core::WantedDependency;

fn catalogs() -> Catalogs {
    HashMap::from([
        (
            "default".to_string(),
            HashMap::from([("is-positive".to_string(), "1.0.0".to_string())]),
        ),
        (
            "local".to_string(),
            HashMap::from([("helper".to_string(), "file:vendor/helper".to_string())]),
        ),
    ])
}

fn from_catalog(alias: &str, specifier: &str) -> Result<WantedDependency, CatalogError> {
    let mut wanted = WantedDependency::new(alias, specifier);
    if let Some(resolution) = resolve_from_catalog(&catalogs(), &wanted).into_result()? {
        wanted.bare_specifier = resolution.specifier;
    }
    Ok(wanted)
}

#[tokio::test]
async fn test_catalog_specifier_is_requested_and_stored() {
    let fixture = Fixture::new();
    fixture.registry.publish("is-positive", "1.0.0");

    let wanted = from_catalog("is-positive", "catalog:").unwrap();
    assert_eq!(wanted.bare_specifier, "1.0.0");

    let response = fixture
        .requester
        .request_package(&wanted, fixture.options())
        .await
        .unwrap();
    let fetched = response.fetching.unwrap().get().await.unwrap();
    assert_eq!(fetched.files.resolved_from, ResolvedFrom::Remote);

    // A second install finds everything in the store
    let wanted = from_catalog("is-positive", "catalog:default").unwrap();
    let again = fixture
        .second_requester()
        .request_package(&wanted, fixture.options())
        .await
        .unwrap();
    let fetched = again.fetching.unwrap().get().await.unwrap();
    assert_eq!(fetched.files.resolved_from, ResolvedFrom::Store);
    assert_eq!(fixture.fetcher.call_count(), 1);
}

#[tokio::test]
async fn test_plain_specifier_bypasses_catalogs() {
    let fixture = Fixture::new();
    fixture.registry.publish("is-negative", "2.0.0");

    let wanted = from_catalog("is-negative", "2.0.0").unwrap();
    let response = fixture
        .requester
        .request_package(&wanted, fixture.options())
        .await
        .unwrap();
    assert_eq!(response.body.id.as_str(), "is-negative@2.0.0");
}

#[test]
fn test_misconfigured_catalog_stops_before_requesting() {
    let err = from_catalog("helper", "catalog:local").unwrap_err();
    assert_eq!(err.code(), "CATALOG_ENTRY_INVALID_SPEC");

    let err = from_catalog("left-pad", "catalog:").unwrap_err();
    assert_eq!(err.code(), "CATALOG_ENTRY_NOT_FOUND_FOR_SPEC");
}

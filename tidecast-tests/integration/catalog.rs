//! Catalog integration tests
//!
//! Verifies the catalog service against the demo and mock providers, and
//! that its magnets feed cleanly into the swarm's magnet parser.

use std::sync::Arc;

use tidecast_catalog::{CatalogError, CatalogService, MockCatalogProvider};
use tidecast_core::swarm::MagnetLink;

#[tokio::test]
async fn demo_catalog_magnets_parse_as_magnet_links() {
    let catalog = CatalogService::demo();
    let entries = catalog.list_movies().await.unwrap();
    assert!(!entries.is_empty());

    for entry in &entries {
        let magnet = catalog.magnet_for(&entry.detail_url).await.unwrap();
        let link = MagnetLink::parse(&magnet)
            .unwrap_or_else(|e| panic!("{}: bad magnet {magnet}: {e}", entry.title));
        assert!(link.display_name.is_some(), "{} magnet lacks dn", entry.title);
    }
}

#[tokio::test]
async fn demo_catalog_magnets_have_distinct_hashes() {
    let catalog = CatalogService::demo();
    let entries = catalog.list_movies().await.unwrap();

    let mut hashes = Vec::new();
    for entry in &entries {
        let magnet = catalog.magnet_for(&entry.detail_url).await.unwrap();
        let link = MagnetLink::parse(&magnet).unwrap();
        assert!(
            !hashes.contains(&link.info_hash),
            "duplicate hash for {}",
            entry.title
        );
        hashes.push(link.info_hash);
    }
}

#[tokio::test]
async fn mock_catalog_serves_scripted_magnets() {
    let provider = MockCatalogProvider::new()
        .with_entry("First Film", "1.2 GB", "magnet:?xt=urn:btih:aaa")
        .with_entry("Second Film", "700 MB", "magnet:?xt=urn:btih:bbb");
    let catalog = CatalogService::with_provider(Arc::new(provider));

    let entries = catalog.list_movies().await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(format!("{}", entries[0]), "First Film - 1.2 GB");

    let magnet = catalog.magnet_for(&entries[1].detail_url).await.unwrap();
    assert_eq!(magnet, "magnet:?xt=urn:btih:bbb");
}

#[tokio::test]
async fn failing_listing_surfaces_fetch_error() {
    let catalog = CatalogService::with_provider(Arc::new(MockCatalogProvider::new().failing()));
    let result = catalog.list_movies().await;
    assert!(matches!(result, Err(CatalogError::FetchFailed { .. })));
}

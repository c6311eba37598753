//! Provider implementations for catalog scraping.

use async_trait::async_trait;

use crate::errors::CatalogError;
use crate::types::CatalogEntry;

pub mod demo;
pub mod mock;
pub mod torrent9;

pub use demo::DemoProvider;
pub use mock::MockCatalogProvider;
pub use torrent9::Torrent9Provider;

/// Catalog data source.
///
/// Stateless data extraction: a listing page becomes candidate titles, a
/// detail page becomes a magnet URI. Implementations cover the production
/// scraper, canned demo data, and a scripted mock for tests.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Returns the current candidate titles, listing order preserved.
    ///
    /// # Errors
    /// - `CatalogError::FetchFailed` - The listing page could not be fetched
    /// - `CatalogError::ParseFailed` - No rows could be extracted
    async fn list_titles(&self) -> Result<Vec<CatalogEntry>, CatalogError>;

    /// Resolves a title's detail page to its magnet URI.
    ///
    /// # Errors
    /// - `CatalogError::FetchFailed` - The detail page could not be fetched
    /// - `CatalogError::MagnetMissing` - The page holds no magnet link
    async fn magnet_for(&self, detail_url: &str) -> Result<String, CatalogError>;
}

//! Catalog service facade.

use std::sync::Arc;

use crate::errors::CatalogError;
use crate::providers::{CatalogProvider, DemoProvider, Torrent9Provider};
use crate::types::CatalogEntry;

/// Catalog service wrapping a provider.
///
/// The chat surface talks to this facade; which provider backs it is a
/// wiring decision made at startup.
#[derive(Clone)]
pub struct CatalogService {
    provider: Arc<dyn CatalogProvider>,
}

impl CatalogService {
    /// Creates a service scraping a torrent9-style site.
    ///
    /// # Errors
    /// - `CatalogError::ParseFailed` - The base URL is invalid
    pub fn torrent9(base_url: &str, user_agent: &str) -> Result<Self, CatalogError> {
        Ok(Self {
            provider: Arc::new(Torrent9Provider::new(base_url, user_agent)?),
        })
    }

    /// Creates a service backed by canned demo data.
    pub fn demo() -> Self {
        Self {
            provider: Arc::new(DemoProvider::new()),
        }
    }

    /// Creates a service over an arbitrary provider.
    pub fn with_provider(provider: Arc<dyn CatalogProvider>) -> Self {
        Self { provider }
    }

    /// Returns the current candidate titles.
    ///
    /// # Errors
    /// - `CatalogError::FetchFailed` - The listing could not be fetched
    /// - `CatalogError::ParseFailed` - No rows could be extracted
    pub async fn list_movies(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        self.provider.list_titles().await
    }

    /// Resolves a title's detail page to its magnet URI.
    ///
    /// # Errors
    /// - `CatalogError::FetchFailed` - The detail page could not be fetched
    /// - `CatalogError::MagnetMissing` - The page holds no magnet link
    pub async fn magnet_for(&self, detail_url: &str) -> Result<String, CatalogError> {
        self.provider.magnet_for(detail_url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockCatalogProvider;

    #[tokio::test]
    async fn service_delegates_to_provider() {
        let provider = MockCatalogProvider::new().with_entry(
            "Some Movie",
            "1.4 Go",
            "magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567",
        );
        let service = CatalogService::with_provider(Arc::new(provider));

        let movies = service.list_movies().await.unwrap();
        assert_eq!(movies.len(), 1);

        let magnet = service.magnet_for(&movies[0].detail_url).await.unwrap();
        assert!(magnet.starts_with("magnet:?xt=urn:btih:"));
    }

    #[tokio::test]
    async fn demo_service_lists_titles() {
        let service = CatalogService::demo();
        assert!(!service.list_movies().await.unwrap().is_empty());
    }
}

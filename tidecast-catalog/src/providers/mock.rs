//! Scripted provider for tests.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::CatalogProvider;
use crate::errors::CatalogError;
use crate::types::CatalogEntry;

/// Provider returning scripted entries and magnets.
///
/// Public (not cfg-gated) because the integration test crate consumes it
/// across crate boundaries.
#[derive(Default)]
pub struct MockCatalogProvider {
    entries: Vec<CatalogEntry>,
    magnets: Mutex<Vec<(String, String)>>,
    fail_listing: bool,
}

impl MockCatalogProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a scripted entry with the magnet its detail URL resolves to.
    pub fn with_entry(mut self, title: &str, size: &str, magnet: &str) -> Self {
        let detail_url = format!("mock://{}", self.entries.len());
        self.entries.push(CatalogEntry {
            title: title.to_string(),
            size: size.to_string(),
            detail_url: detail_url.clone(),
        });
        self.magnets.get_mut().push((detail_url, magnet.to_string()));
        self
    }

    /// Makes `list_titles` fail.
    pub fn failing(mut self) -> Self {
        self.fail_listing = true;
        self
    }
}

#[async_trait]
impl CatalogProvider for MockCatalogProvider {
    async fn list_titles(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        if self.fail_listing {
            return Err(CatalogError::FetchFailed {
                url: "mock://listing".to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        Ok(self.entries.clone())
    }

    async fn magnet_for(&self, detail_url: &str) -> Result<String, CatalogError> {
        self.magnets
            .lock()
            .iter()
            .find(|(url, _)| url == detail_url)
            .map(|(_, magnet)| magnet.clone())
            .ok_or_else(|| CatalogError::MagnetMissing {
                url: detail_url.to_string(),
            })
    }
}

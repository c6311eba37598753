//! Demo provider for development runs without a scrapable site.

use async_trait::async_trait;

use super::CatalogProvider;
use crate::errors::CatalogError;
use crate::types::CatalogEntry;

/// Canned open-movie catalog for `--simulate` runs.
///
/// Detail URLs use a private scheme and resolve to synthetic magnets with
/// well-formed info hashes, so the full listmovies/selection/download flow
/// works end to end against the simulation swarm client.
pub struct DemoProvider;

impl DemoProvider {
    pub fn new() -> Self {
        Self
    }

    fn entries() -> Vec<CatalogEntry> {
        [
            ("Big Buck Bunny (2008) 1080p", "276 Mo", "big-buck-bunny"),
            ("Sintel (2010) 1080p", "184 Mo", "sintel"),
            ("Tears of Steel (2012) 1080p", "365 Mo", "tears-of-steel"),
            ("Elephants Dream (2006) 720p", "125 Mo", "elephants-dream"),
        ]
        .iter()
        .map(|(title, size, slug)| CatalogEntry {
            title: title.to_string(),
            size: size.to_string(),
            detail_url: format!("demo://{slug}"),
        })
        .collect()
    }

    /// Derives a deterministic, well-formed btih hash from the slug.
    fn synthetic_hash(slug: &str) -> String {
        let mut hash = String::with_capacity(40);
        for (i, byte) in slug.bytes().cycle().take(20).enumerate() {
            hash.push_str(&format!("{:02x}", byte.wrapping_add(i as u8)));
        }
        hash
    }
}

impl Default for DemoProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogProvider for DemoProvider {
    async fn list_titles(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        Ok(Self::entries())
    }

    async fn magnet_for(&self, detail_url: &str) -> Result<String, CatalogError> {
        let slug = detail_url
            .strip_prefix("demo://")
            .ok_or_else(|| CatalogError::MagnetMissing {
                url: detail_url.to_string(),
            })?;

        let entry = Self::entries()
            .into_iter()
            .find(|entry| entry.detail_url == detail_url)
            .ok_or_else(|| CatalogError::MagnetMissing {
                url: detail_url.to_string(),
            })?;

        Ok(format!(
            "magnet:?xt=urn:btih:{}&dn={}",
            Self::synthetic_hash(slug),
            urlencoding::encode(&entry.title)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_listing_is_stable() {
        let provider = DemoProvider::new();
        let entries = provider.list_titles().await.unwrap();
        assert_eq!(entries.len(), 4);
        assert!(entries[0].title.contains("Big Buck Bunny"));
    }

    #[tokio::test]
    async fn demo_magnets_carry_valid_hashes() {
        let provider = DemoProvider::new();
        let entries = provider.list_titles().await.unwrap();
        let magnet = provider.magnet_for(&entries[0].detail_url).await.unwrap();

        let hash = magnet
            .strip_prefix("magnet:?xt=urn:btih:")
            .and_then(|rest| rest.split('&').next())
            .unwrap();
        assert_eq!(hash.len(), 40);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn unknown_detail_url_is_magnet_missing() {
        let provider = DemoProvider::new();
        let result = provider.magnet_for("demo://nope").await;
        assert!(matches!(result, Err(CatalogError::MagnetMissing { .. })));
    }
}

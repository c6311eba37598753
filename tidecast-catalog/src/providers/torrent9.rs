//! Production catalog provider scraping torrent9-style listing pages.

use async_trait::async_trait;
use regex::Regex;
use url::Url;

use super::CatalogProvider;
use crate::errors::CatalogError;
use crate::types::CatalogEntry;

/// Scraper for the torrent9 films-by-seeds listing.
///
/// The markup is table rows with a title anchor and an inline-styled size
/// cell; extraction is regex over the raw HTML, which has survived the
/// site's cosmetic redesigns better than structural selectors.
pub struct Torrent9Provider {
    client: reqwest::Client,
    base_url: Url,
    row_pattern: Regex,
    anchor_pattern: Regex,
    size_pattern: Regex,
    magnet_pattern: Regex,
}

impl Torrent9Provider {
    /// Creates a provider scraping the given site base URL.
    ///
    /// # Errors
    /// - `CatalogError::ParseFailed` - The base URL is not a valid absolute URL
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self, CatalogError> {
        let base_url = Url::parse(base_url).map_err(|e| CatalogError::ParseFailed {
            reason: format!("invalid base URL {base_url}: {e}"),
        })?;

        let client = reqwest::Client::builder()
            .user_agent(user_agent.to_string())
            .build()
            .map_err(|e| CatalogError::ParseFailed {
                reason: format!("HTTP client construction failed: {e}"),
            })?;

        // Patterns are fixed; a compile failure here is a programming error,
        // surfaced as ParseFailed rather than a panic.
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| CatalogError::ParseFailed {
                reason: format!("scraper pattern compilation failed: {e}"),
            })
        };

        Ok(Self {
            client,
            base_url,
            row_pattern: compile(r#"(?s)<tr[ >].*?</tr>"#)?,
            anchor_pattern: compile(r#"<a\s+href="([^"]+)"[^>]*>\s*([^<]+?)\s*</a>"#)?,
            size_pattern: compile(r#"<td[^>]*font-size:12px[^>]*>\s*([^<]+?)\s*</td>"#)?,
            magnet_pattern: compile(r#"href="(magnet:[^"]+)""#)?,
        })
    }

    async fn fetch(&self, url: &str) -> Result<String, CatalogError> {
        let response =
            self.client
                .get(url)
                .send()
                .await
                .map_err(|e| CatalogError::FetchFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

        if !response.status().is_success() {
            return Err(CatalogError::FetchFailed {
                url: url.to_string(),
                reason: format!("HTTP status {}", response.status()),
            });
        }

        response.text().await.map_err(|e| CatalogError::FetchFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    /// Extracts title rows from the listing page HTML.
    fn parse_listing(&self, html: &str) -> Vec<CatalogEntry> {
        let mut entries = Vec::new();
        for row in self.row_pattern.find_iter(html) {
            let row = row.as_str();
            let Some(anchor) = self.anchor_pattern.captures(row) else {
                continue;
            };
            let href = anchor[1].trim();
            let title = anchor[2].trim();
            let size = self
                .size_pattern
                .captures(row)
                .map(|captures| captures[1].trim().to_string())
                .unwrap_or_default();

            if title.is_empty() || href.is_empty() {
                continue;
            }
            let Ok(detail_url) = self.base_url.join(href) else {
                continue;
            };
            entries.push(CatalogEntry {
                title: title.to_string(),
                size,
                detail_url: detail_url.to_string(),
            });
        }
        entries
    }
}

#[async_trait]
impl CatalogProvider for Torrent9Provider {
    async fn list_titles(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let listing_url = self
            .base_url
            .join("/torrents/films/seeds/desc")
            .map_err(|e| CatalogError::ParseFailed {
                reason: e.to_string(),
            })?;

        let html = self.fetch(listing_url.as_str()).await?;
        let entries = self.parse_listing(&html);

        if entries.is_empty() {
            return Err(CatalogError::ParseFailed {
                reason: format!("no title rows found at {listing_url}"),
            });
        }

        tracing::debug!("Scraped {} titles from {}", entries.len(), listing_url);
        Ok(entries)
    }

    async fn magnet_for(&self, detail_url: &str) -> Result<String, CatalogError> {
        let html = self.fetch(detail_url).await?;

        self.magnet_pattern
            .captures(&html)
            .map(|captures| captures[1].to_string())
            .ok_or_else(|| CatalogError::MagnetMissing {
                url: detail_url.to_string(),
            })
    }
}

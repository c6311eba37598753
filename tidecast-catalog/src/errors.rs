//! Error types for catalog operations.

use thiserror::Error;

/// Errors that can occur while scraping the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The listing or detail page could not be fetched.
    #[error("Fetch of {url} failed: {reason}")]
    FetchFailed { url: String, reason: String },

    /// The page was fetched but no usable rows could be extracted.
    #[error("Parse error: {reason}")]
    ParseFailed { reason: String },

    /// The detail page held no magnet link.
    #[error("No magnet link found on {url}")]
    MagnetMissing { url: String },
}

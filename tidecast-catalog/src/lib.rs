//! Tidecast Catalog - Title discovery for the chat surface
//!
//! Scrapes a public torrent listing into candidate titles with retrieval
//! links, and resolves a title's detail page to its magnet URI. Pure data
//! extraction behind a provider trait, with demo and mock implementations
//! for development and tests.

pub mod errors;
pub mod providers;
pub mod service;
pub mod types;

// Re-export main types
pub use errors::CatalogError;
pub use providers::{CatalogProvider, DemoProvider, MockCatalogProvider, Torrent9Provider};
pub use service::CatalogService;
pub use types::CatalogEntry;

/// Convenience type alias for Results with CatalogError.
pub type Result<T> = std::result::Result<T, CatalogError>;

//! Catalog data types.

/// One candidate title scraped from the listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Human-readable release title
    pub title: String,
    /// Size text as shown on the listing, e.g. "1.4 Go"
    pub size: String,
    /// Absolute URL of the title's detail page
    pub detail_url: String,
}

impl std::fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.title, self.size)
    }
}

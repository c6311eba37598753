//! Centralized configuration for Tidecast.
//!
//! All tunable parameters are defined here to avoid hard-coded values
//! scattered throughout the codebase.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Central configuration for all Tidecast components.
///
/// Groups related settings into logical sections and supports environment
/// variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct TidecastConfig {
    pub library: LibraryConfig,
    pub swarm: SwarmConfig,
    pub segmenting: SegmentingConfig,
    pub chat: ChatConfig,
    pub catalog: CatalogConfig,
}

/// Working-directory configuration.
///
/// Tidecast keeps one flat directory holding in-flight downloads and all
/// segment files from all sessions, distinguished only by the session-key
/// prefix naming convention. No subdirectories, no index file.
#[derive(Debug, Clone)]
pub struct LibraryConfig {
    /// The single working directory for downloads and segments
    pub library_dir: PathBuf,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            library_dir: PathBuf::from("library"),
        }
    }
}

/// Swarm download client configuration.
#[derive(Debug, Clone)]
pub struct SwarmConfig {
    /// Path or name of the aria2c binary
    pub client_binary: PathBuf,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            client_binary: PathBuf::from("aria2c"),
        }
    }
}

/// Segmentation configuration.
#[derive(Debug, Clone)]
pub struct SegmentingConfig {
    /// Fixed duration of each produced segment
    pub segment_seconds: u32,
    /// Target container for every segment regardless of source container
    pub container: &'static str,
    /// Path or name of the ffmpeg binary
    pub ffmpeg_binary: PathBuf,
}

impl Default for SegmentingConfig {
    fn default() -> Self {
        Self {
            segment_seconds: 300, // 5 minute segments
            container: "mp4",
            ffmpeg_binary: PathBuf::from("ffmpeg"),
        }
    }
}

/// Chat surface configuration.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// How long an interactive selection prompt waits for a reply
    pub selection_timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            selection_timeout: Duration::from_secs(60),
        }
    }
}

/// Catalog scraper configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Base URL of the scraped catalog site
    pub base_url: String,
    /// User agent for catalog HTTP requests
    pub user_agent: &'static str,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.torrent9.gl".to_string(),
            user_agent: "tidecast/0.1.0",
        }
    }
}

impl TidecastConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via `TIDECAST_*` variables while
    /// maintaining sensible defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("TIDECAST_LIBRARY_DIR") {
            config.library.library_dir = PathBuf::from(dir);
        }

        if let Ok(seconds) = std::env::var("TIDECAST_SEGMENT_SECONDS") {
            if let Ok(value) = seconds.parse::<u32>() {
                config.segmenting.segment_seconds = value;
            }
        }

        if let Ok(timeout) = std::env::var("TIDECAST_SELECTION_TIMEOUT") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.chat.selection_timeout = Duration::from_secs(seconds);
            }
        }

        if let Ok(url) = std::env::var("TIDECAST_CATALOG_URL") {
            config.catalog.base_url = url;
        }

        config
    }

    /// Returns a copy of this configuration with the working directory moved.
    ///
    /// Convenience for tests and embedders that point the pipeline at a
    /// temporary directory.
    pub fn rooted_at(mut self, dir: impl AsRef<Path>) -> Self {
        self.library.library_dir = dir.as_ref().to_path_buf();
        self
    }
}

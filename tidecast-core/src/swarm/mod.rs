//! Swarm download client abstraction.
//!
//! Tidecast does not speak the peer-to-peer protocol itself; it hands a
//! validated magnet link to an external client and waits for the files to
//! materialize on disk. [`SwarmClient`] is the seam, with an aria2c-based
//! production implementation and a file-fabricating simulation.

pub mod aria2;
pub mod simulation;

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

pub use aria2::Aria2SwarmClient;
pub use simulation::SimulationSwarmClient;

/// Errors from the swarm download client.
#[derive(Debug, Error)]
pub enum SwarmError {
    /// The magnet URI could not be parsed or lacks a usable info hash.
    #[error("Invalid magnet link: {reason}")]
    InvalidMagnet { reason: String },

    /// The external client ran but reported failure.
    #[error("Swarm download failed: {reason}")]
    DownloadFailed { reason: String },

    /// The external client binary could not be started.
    #[error("Swarm client unavailable: {reason}")]
    ClientUnavailable { reason: String },

    /// Filesystem trouble while tracking the downloaded file set.
    #[error("Swarm I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// SHA-1 hash identifying a unique swarm resource.
///
/// 20 bytes extracted from the magnet link's `xt=urn:btih:` parameter. The
/// acquisition engine keys its live-job map on this value, which is what
/// makes duplicate requests for the same resource detectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InfoHash([u8; 20]);

impl InfoHash {
    /// Creates an InfoHash from a 20-byte SHA-1 hash.
    pub fn new(hash: [u8; 20]) -> Self {
        Self(hash)
    }

    /// Returns a reference to the underlying 20-byte hash.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// A syntactically valid swarm resource descriptor.
///
/// Parsing happens once at the boundary; everything past the chat surface
/// works with this typed form, so the engine never sees a malformed URI.
#[derive(Debug, Clone)]
pub struct MagnetLink {
    /// The original magnet URI, passed through to the external client
    pub uri: String,
    /// Resource identity extracted from the `xt` parameter
    pub info_hash: InfoHash,
    /// Optional display name from the `dn` parameter
    pub display_name: Option<String>,
}

impl MagnetLink {
    /// Parses and validates a magnet URI.
    ///
    /// # Errors
    /// - `SwarmError::InvalidMagnet` - Malformed URI or missing/short info hash
    pub fn parse(uri: &str) -> Result<Self, SwarmError> {
        let magnet = magnet_url::Magnet::new(uri).map_err(|e| SwarmError::InvalidMagnet {
            reason: format!("{e}"),
        })?;

        let info_hash = Self::extract_info_hash(uri)?;

        Ok(Self {
            uri: uri.to_string(),
            info_hash,
            display_name: magnet.display_name().map(|name| name.to_string()),
        })
    }

    /// Pulls the btih info hash out of the raw URI.
    ///
    /// The `magnet-url` crate validates overall shape; the hash itself is
    /// extracted from the `xt=urn:btih:` parameter directly.
    fn extract_info_hash(uri: &str) -> Result<InfoHash, SwarmError> {
        let query = uri.strip_prefix("magnet:?").unwrap_or(uri);
        for param in query.split('&') {
            if let Some(value) = param.strip_prefix("xt=urn:btih:") {
                return Self::parse_hash(value);
            }
        }
        Err(SwarmError::InvalidMagnet {
            reason: "missing xt=urn:btih: parameter".to_string(),
        })
    }

    fn parse_hash(hash_str: &str) -> Result<InfoHash, SwarmError> {
        if hash_str.len() != 40 {
            return Err(SwarmError::InvalidMagnet {
                reason: format!("info hash length {} (expected 40)", hash_str.len()),
            });
        }
        let mut hash = [0u8; 20];
        hex::decode_to_slice(hash_str.to_ascii_lowercase(), &mut hash).map_err(|_| {
            SwarmError::InvalidMagnet {
                reason: format!("invalid hex in info hash: {hash_str}"),
            }
        })?;
        Ok(InfoHash::new(hash))
    }
}

/// Asynchronous swarm download driver.
///
/// `download` resolves only once the client has fully materialized the
/// resource, returning the set of files it wrote. No timeout is imposed; a
/// download runs until the client signals completion or error.
#[async_trait]
pub trait SwarmClient: Send + Sync {
    /// Downloads the resource into `dest_dir` and returns the new files.
    ///
    /// # Errors
    /// - `SwarmError::DownloadFailed` - The client reported a failed transfer
    /// - `SwarmError::ClientUnavailable` - The client could not be started
    async fn download(
        &self,
        link: &MagnetLink,
        dest_dir: &Path,
    ) -> Result<Vec<PathBuf>, SwarmError>;

    /// Checks whether the client is installed and runnable.
    fn is_available(&self) -> bool;
}

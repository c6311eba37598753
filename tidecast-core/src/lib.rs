//! Tidecast Core - Acquisition, segmentation and retrieval pipeline
//!
//! This crate provides the stateful heart of Tidecast: deduplicated swarm
//! downloads, stream-copy segmentation of the resulting media, the in-memory
//! session registry, and name-addressed segment delivery. External
//! collaborators (swarm client, transcoder, chat transport) sit behind traits
//! with production and simulation implementations.

pub mod config;
pub mod delivery;
pub mod engine;
pub mod naming;
pub mod segmenting;
pub mod swarm;
pub mod tracing_setup;
pub mod transport;

// Re-export main types for convenient access
pub use config::TidecastConfig;
pub use delivery::{DeliveryError, SegmentDelivery};
pub use engine::{AcquireError, AcquisitionEngineHandle, SessionSummary, spawn_acquisition_engine};
pub use naming::SessionKey;
pub use segmenting::{SegmentingError, Segmenter};
pub use swarm::{InfoHash, MagnetLink, SwarmError};
pub use transport::{ChatAddress, ChatTransport, TransportError};

/// Core errors that can bubble up from any Tidecast subsystem.
#[derive(Debug, thiserror::Error)]
pub enum TidecastError {
    #[error("Acquisition error: {0}")]
    Acquire(#[from] AcquireError),

    #[error("Swarm error: {0}")]
    Swarm(#[from] SwarmError),

    #[error("Segmenting error: {0}")]
    Segmenting(#[from] SegmentingError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TidecastError {
    /// Returns the single requester-facing message for this failure.
    ///
    /// Every failed request produces exactly one outbound chat message; this
    /// is where the error taxonomy maps onto those texts.
    pub fn user_message(&self) -> String {
        match self {
            TidecastError::Acquire(e) => e.user_message().to_string(),
            TidecastError::Swarm(SwarmError::InvalidMagnet { .. }) => {
                "That does not look like a valid magnet link.".to_string()
            }
            TidecastError::Swarm(_) => "Failed to download torrent!".to_string(),
            TidecastError::Segmenting(_) => "Failed to split the video into chunks.".to_string(),
            TidecastError::Delivery(e) => match e {
                DeliveryError::NotFound { .. } => "Chunk not found!".to_string(),
                DeliveryError::SendFailed { .. } => "Failed to send chunk!".to_string(),
                DeliveryError::Io(_) => "File system error occurred.".to_string(),
            },
            TidecastError::Transport(_) => "Failed to send message.".to_string(),
            TidecastError::Configuration { .. } => "Configuration error occurred.".to_string(),
            TidecastError::Io(_) => "File system error occurred.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TidecastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_cover_acquire_failures() {
        let already = TidecastError::Acquire(AcquireError::AlreadyInProgress {
            info_hash: InfoHash::new([0u8; 20]),
        });
        assert!(already.user_message().contains("already being downloaded"));

        let no_media = TidecastError::Acquire(AcquireError::NoPlayableMedia);
        assert!(no_media.user_message().contains("No supported video file"));
    }

    #[test]
    fn user_message_for_missing_chunk() {
        let err = TidecastError::Delivery(DeliveryError::NotFound {
            name: "abc-segment-000.mp4".to_string(),
        });
        assert_eq!(err.user_message(), "Chunk not found!");
    }
}

//! Acquisition engine actor.
//!
//! Owns the live-job map and the session registry behind a single actor
//! task, so the duplicate-request check and the registry write are atomic by
//! construction. Each accepted acquisition runs as its own spawned pipeline
//! task (fetch, scan, segment) and reports back through the actor, which
//! records the session before the caller's future resolves.

pub mod actor;
pub mod commands;
pub mod core;
pub mod handle;

use thiserror::Error;

pub use actor::spawn_acquisition_engine;
pub use commands::{EngineCommand, JobStage, JobStatus, SessionRecord, SessionSummary};
pub use core::AcquisitionEngine;
pub use handle::AcquisitionEngineHandle;

use crate::segmenting::SegmentingError;
use crate::swarm::{InfoHash, SwarmError};

/// Errors from the acquisition pipeline.
///
/// All are terminal for the triggering request; the engine never retries.
#[derive(Debug, Error)]
pub enum AcquireError {
    /// A live job for the same resource already exists. Informational rather
    /// than a fault: the new request is rejected, not queued or merged.
    #[error("Resource {info_hash} is already being fetched")]
    AlreadyInProgress { info_hash: InfoHash },

    /// The download completed but no file matched the playable allow-list.
    #[error("No playable media in the downloaded file set")]
    NoPlayableMedia,

    /// The swarm client failed; surfaced to the requester, not retried.
    #[error(transparent)]
    Swarm(#[from] SwarmError),

    /// Segmentation failed; the unsegmented source file is left in place.
    #[error(transparent)]
    Segmentation(#[from] SegmentingError),

    /// The engine actor is gone; any in-flight request is lost.
    #[error("Acquisition engine shut down")]
    EngineShutdown,
}

impl AcquireError {
    /// The requester-facing text for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            AcquireError::AlreadyInProgress { .. } => {
                "This torrent is already being downloaded. Please wait."
            }
            AcquireError::NoPlayableMedia => "No supported video file found in the torrent.",
            AcquireError::Segmentation(_) => "Failed to split the video into chunks.",
            AcquireError::Swarm(_) => "Failed to download torrent!",
            AcquireError::EngineShutdown => "The downloader is shutting down.",
        }
    }
}

//! Command definitions for the acquisition engine actor.

use std::time::Instant;

use tokio::sync::oneshot;

use super::AcquireError;
use crate::naming::SessionKey;
use crate::swarm::{InfoHash, MagnetLink};
use crate::transport::ChatAddress;

/// Commands processed by the acquisition engine actor.
///
/// Public operations arrive from handles with a response channel; the
/// `Job*` variants are internal events sent by pipeline tasks on the
/// unbounded event channel. One enum, one sequential processing loop, no
/// shared-state locks.
pub enum EngineCommand {
    /// Start an acquisition for a magnet link on behalf of a requester.
    Acquire {
        magnet: MagnetLink,
        requester: ChatAddress,
        responder: oneshot::Sender<Result<SessionSummary, AcquireError>>,
    },
    /// Look up the requester's registered session.
    Session {
        requester: ChatAddress,
        responder: oneshot::Sender<Option<SessionRecord>>,
    },
    /// Snapshot of all live jobs.
    ActiveJobs {
        responder: oneshot::Sender<Vec<JobStatus>>,
    },
    /// Shut the engine actor down gracefully.
    Shutdown { responder: oneshot::Sender<()> },
    /// Internal: a pipeline task advanced to a new stage.
    JobStageChanged { info_hash: InfoHash, stage: JobStage },
    /// Internal: a pipeline task finished. The actor updates the registry
    /// and job map before answering the original caller, so a resolved
    /// acquire future always observes its session as recorded.
    JobFinished {
        info_hash: InfoHash,
        requester: ChatAddress,
        result: Result<SessionSummary, AcquireError>,
        responder: oneshot::Sender<Result<SessionSummary, AcquireError>>,
    },
}

/// Lifecycle stage of a download job.
///
/// `Ready` and `Failed` are terminal: the actor sets them only while
/// removing the job from the live map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    /// Accepted, pipeline task not yet fetching
    Pending,
    /// Swarm download in progress
    Fetching,
    /// Transcoder splitting the downloaded file
    Segmenting,
    /// Pipeline finished successfully
    Ready,
    /// Pipeline failed
    Failed,
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobStage::Pending => "pending",
            JobStage::Fetching => "fetching",
            JobStage::Segmenting => "segmenting",
            JobStage::Ready => "ready",
            JobStage::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// One live download job.
///
/// At most one exists per info hash; a second request for the same resource
/// while this is live is rejected.
#[derive(Debug, Clone)]
pub struct JobStatus {
    pub info_hash: InfoHash,
    pub requester: ChatAddress,
    pub stage: JobStage,
    pub started_at: Instant,
}

/// Registry entry for a requester's most recent session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub session_key: SessionKey,
    pub segment_count: usize,
}

/// Result of a successful acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Key grouping this acquisition's segment files
    pub session_key: SessionKey,
    /// Segment file names ordered by ascending index
    pub segment_files: Vec<String>,
}

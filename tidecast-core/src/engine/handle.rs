//! Handle for communicating with the acquisition engine actor.

use tokio::sync::{mpsc, oneshot};

use super::AcquireError;
use super::commands::{EngineCommand, JobStatus, SessionRecord, SessionSummary};
use crate::swarm::MagnetLink;
use crate::transport::ChatAddress;

/// Handle for communicating with the acquisition engine actor.
///
/// Cloneable and shareable across tasks; every method is an async request
/// to the actor with the result carried back over a oneshot channel.
#[derive(Clone)]
pub struct AcquisitionEngineHandle {
    sender: mpsc::Sender<EngineCommand>,
}

impl AcquisitionEngineHandle {
    /// Creates a new handle with the given command sender.
    pub fn new(sender: mpsc::Sender<EngineCommand>) -> Self {
        Self { sender }
    }

    /// Acquires a resource for a requester: fetch, scan, segment, record.
    ///
    /// Resolves only once the whole pipeline has finished and the session is
    /// registered, or with the error that terminated it. There is no way to
    /// cancel an accepted acquisition and no timeout on the external tools.
    ///
    /// # Errors
    /// - `AcquireError::AlreadyInProgress` - A live job exists for this resource
    /// - `AcquireError::NoPlayableMedia` - The download held no playable file
    /// - `AcquireError::Swarm` - The swarm client failed
    /// - `AcquireError::Segmentation` - The transcoder failed; source preserved
    /// - `AcquireError::EngineShutdown` - The actor is gone
    pub async fn acquire(
        &self,
        magnet: MagnetLink,
        requester: ChatAddress,
    ) -> Result<SessionSummary, AcquireError> {
        let (responder, rx) = oneshot::channel();
        let cmd = EngineCommand::Acquire {
            magnet,
            requester,
            responder,
        };

        self.sender
            .send(cmd)
            .await
            .map_err(|_| AcquireError::EngineShutdown)?;

        rx.await.map_err(|_| AcquireError::EngineShutdown)?
    }

    /// Looks up the requester's registered session, if any.
    ///
    /// Introspection only: the retrieval path addresses segments by literal
    /// file name and never consults the registry.
    ///
    /// # Errors
    /// - `AcquireError::EngineShutdown` - The actor is gone
    pub async fn session(
        &self,
        requester: ChatAddress,
    ) -> Result<Option<SessionRecord>, AcquireError> {
        let (responder, rx) = oneshot::channel();
        let cmd = EngineCommand::Session {
            requester,
            responder,
        };

        self.sender
            .send(cmd)
            .await
            .map_err(|_| AcquireError::EngineShutdown)?;

        rx.await.map_err(|_| AcquireError::EngineShutdown)
    }

    /// Returns a snapshot of all live jobs.
    ///
    /// # Errors
    /// - `AcquireError::EngineShutdown` - The actor is gone
    pub async fn active_jobs(&self) -> Result<Vec<JobStatus>, AcquireError> {
        let (responder, rx) = oneshot::channel();
        let cmd = EngineCommand::ActiveJobs { responder };

        self.sender
            .send(cmd)
            .await
            .map_err(|_| AcquireError::EngineShutdown)?;

        rx.await.map_err(|_| AcquireError::EngineShutdown)
    }

    /// Shuts down the engine actor gracefully.
    ///
    /// After this call every subsequent operation returns
    /// `AcquireError::EngineShutdown`.
    ///
    /// # Errors
    /// - `AcquireError::EngineShutdown` - The actor was already gone
    pub async fn shutdown(&self) -> Result<(), AcquireError> {
        let (responder, rx) = oneshot::channel();
        let cmd = EngineCommand::Shutdown { responder };

        self.sender
            .send(cmd)
            .await
            .map_err(|_| AcquireError::EngineShutdown)?;

        rx.await.map_err(|_| AcquireError::EngineShutdown)
    }

    /// Checks if the engine actor is still accepting commands.
    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }
}

//! Actor implementation for the acquisition engine.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::commands::EngineCommand;
use super::core::AcquisitionEngine;
use super::handle::AcquisitionEngineHandle;
use crate::config::TidecastConfig;
use crate::segmenting::SegmentProcessor;
use crate::swarm::SwarmClient;
use crate::transport::ChatTransport;

/// Spawns the acquisition engine actor and returns its handle.
///
/// The actor task owns the live-job map and session registry and processes
/// commands sequentially, so two concurrent requests for the same resource
/// can never both observe "not in progress". Pipeline tasks report back on
/// an internal unbounded channel.
pub fn spawn_acquisition_engine(
    config: TidecastConfig,
    swarm: Arc<dyn SwarmClient>,
    processor: Arc<dyn SegmentProcessor>,
    transport: Arc<dyn ChatTransport>,
) -> AcquisitionEngineHandle {
    let (sender, receiver) = mpsc::channel(100);
    let (event_sender, event_receiver) = mpsc::unbounded_channel();
    let engine = AcquisitionEngine::new(config, swarm, processor, transport, event_sender);

    tokio::spawn(async move {
        run_actor_loop(engine, receiver, event_receiver).await;
    });

    AcquisitionEngineHandle::new(sender)
}

/// Runs the main actor message processing loop.
///
/// Commands are handled one at a time until the command channel closes or a
/// shutdown command arrives. Pipeline events share the loop so job-map and
/// registry updates are serialized with duplicate checks.
async fn run_actor_loop(
    mut engine: AcquisitionEngine,
    mut receiver: mpsc::Receiver<EngineCommand>,
    mut event_receiver: mpsc::UnboundedReceiver<EngineCommand>,
) {
    tracing::debug!("Acquisition engine actor started");

    loop {
        tokio::select! {
            Some(command) = receiver.recv() => {
                if !handle_command(&mut engine, command) {
                    break;
                }
            }
            Some(command) = event_receiver.recv() => {
                if !handle_command(&mut engine, command) {
                    break;
                }
            }
            else => break,
        }
    }

    tracing::debug!("Acquisition engine actor stopped");
}

/// Handles a single command. Returns false to shut the actor down.
fn handle_command(engine: &mut AcquisitionEngine, command: EngineCommand) -> bool {
    match command {
        EngineCommand::Acquire {
            magnet,
            requester,
            responder,
        } => {
            engine.handle_acquire(magnet, requester, responder);
        }

        EngineCommand::Session {
            requester,
            responder,
        } => {
            let _ = responder.send(engine.session(&requester));
        }

        EngineCommand::ActiveJobs { responder } => {
            let _ = responder.send(engine.active_jobs());
        }

        EngineCommand::JobStageChanged { info_hash, stage } => {
            engine.update_stage(info_hash, stage);
        }

        EngineCommand::JobFinished {
            info_hash,
            requester,
            result,
            responder,
        } => {
            engine.finish_job(info_hash, requester, result, responder);
        }

        EngineCommand::Shutdown { responder } => {
            tracing::debug!("Acquisition engine actor shutting down");
            let _ = responder.send(());
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::engine::{AcquireError, JobStage};
    use crate::segmenting::SimulationSegmentProcessor;
    use crate::swarm::{MagnetLink, SimulationSwarmClient};
    use crate::transport::{ChannelTransport, ChatAddress};

    fn test_magnet(hash_byte: char) -> MagnetLink {
        let uri = format!("magnet:?xt=urn:btih:{}", hash_byte.to_string().repeat(40));
        MagnetLink::parse(&uri).unwrap()
    }

    fn spawn_test_engine(
        dir: &std::path::Path,
        swarm: SimulationSwarmClient,
        processor: SimulationSegmentProcessor,
    ) -> (AcquisitionEngineHandle, ChannelTransport) {
        let transport = ChannelTransport::new();
        let handle = spawn_acquisition_engine(
            TidecastConfig::default().rooted_at(dir),
            Arc::new(swarm),
            Arc::new(processor),
            Arc::new(transport.clone()),
        );
        (handle, transport)
    }

    #[tokio::test]
    async fn actor_spawn_and_shutdown() {
        let dir = tempdir().unwrap();
        let (handle, _transport) = spawn_test_engine(
            dir.path(),
            SimulationSwarmClient::new(),
            SimulationSegmentProcessor::new(),
        );

        assert!(handle.is_running());
        assert!(handle.active_jobs().await.unwrap().is_empty());

        handle.shutdown().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let result = handle.active_jobs().await;
        assert!(matches!(result, Err(AcquireError::EngineShutdown)));
    }

    #[tokio::test]
    async fn successful_acquisition_records_session() {
        let dir = tempdir().unwrap();
        let (handle, transport) = spawn_test_engine(
            dir.path(),
            SimulationSwarmClient::new().with_files(&["movie.mkv"]),
            SimulationSegmentProcessor::new().with_segment_count(3),
        );

        let alice = ChatAddress::new("alice");
        let summary = handle.acquire(test_magnet('a'), alice.clone()).await.unwrap();

        assert_eq!(summary.segment_files.len(), 3);
        assert!(
            summary.segment_files[0].starts_with(summary.session_key.as_str()),
            "segment names carry the session key"
        );

        // Registry entry written before acquire resolved.
        let record = handle.session(alice.clone()).await.unwrap().unwrap();
        assert_eq!(record.session_key, summary.session_key);
        assert_eq!(record.segment_count, 3);

        // Start notice plus segment list.
        let texts = transport.texts_to(&alice);
        assert_eq!(texts.len(), 2);
        assert!(texts[1].contains("-segment-000.mp4"));

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn download_without_video_fails_with_no_playable_media() {
        let dir = tempdir().unwrap();
        let (handle, transport) = spawn_test_engine(
            dir.path(),
            SimulationSwarmClient::new().with_files(&["readme.txt", "cover.jpg"]),
            SimulationSegmentProcessor::new(),
        );

        let alice = ChatAddress::new("alice");
        let result = handle.acquire(test_magnet('b'), alice.clone()).await;
        assert!(matches!(result, Err(AcquireError::NoPlayableMedia)));

        let texts = transport.texts_to(&alice);
        assert!(texts.last().unwrap().contains("No supported video file"));

        // Failed job is discarded.
        assert!(handle.active_jobs().await.unwrap().is_empty());
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn swarm_failure_surfaces_to_requester() {
        let dir = tempdir().unwrap();
        let (handle, transport) = spawn_test_engine(
            dir.path(),
            SimulationSwarmClient::new().failing(),
            SimulationSegmentProcessor::new(),
        );

        let alice = ChatAddress::new("alice");
        let result = handle.acquire(test_magnet('c'), alice.clone()).await;
        assert!(matches!(result, Err(AcquireError::Swarm(_))));

        let texts = transport.texts_to(&alice);
        assert_eq!(
            texts.iter().filter(|t| t.contains("Failed")).count(),
            1,
            "exactly one failure message"
        );
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn active_jobs_reports_fetching_stage() {
        let dir = tempdir().unwrap();
        let (handle, _transport) = spawn_test_engine(
            dir.path(),
            SimulationSwarmClient::new().with_delay(std::time::Duration::from_millis(200)),
            SimulationSegmentProcessor::new(),
        );

        let handle_clone = handle.clone();
        let acquire = tokio::spawn(async move {
            handle_clone
                .acquire(test_magnet('d'), ChatAddress::new("alice"))
                .await
        });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let jobs = handle.active_jobs().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].stage, JobStage::Fetching);

        acquire.await.unwrap().unwrap();
        assert!(handle.active_jobs().await.unwrap().is_empty());
        handle.shutdown().await.unwrap();
    }
}

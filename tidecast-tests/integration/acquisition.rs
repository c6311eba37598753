//! Acquisition engine integration tests
//!
//! Exercises the engine actor with simulated swarm and transcoder: duplicate
//! rejection, segment naming, registry overwrite, and failure notification.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tidecast_core::config::TidecastConfig;
use tidecast_core::engine::AcquireError;
use tidecast_core::segmenting::SimulationSegmentProcessor;
use tidecast_core::swarm::{MagnetLink, SimulationSwarmClient};
use tidecast_core::transport::{ChannelTransport, ChatAddress, ChatTransport};
use tidecast_core::{AcquisitionEngineHandle, spawn_acquisition_engine};

fn magnet(hash_char: char) -> MagnetLink {
    let hash: String = std::iter::repeat_n(hash_char, 40).collect();
    MagnetLink::parse(&format!("magnet:?xt=urn:btih:{hash}")).unwrap()
}

fn engine_with(
    swarm: SimulationSwarmClient,
    processor: SimulationSegmentProcessor,
) -> (AcquisitionEngineHandle, ChannelTransport, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = TidecastConfig::default().rooted_at(dir.path());
    let transport = ChannelTransport::new();
    let shared: Arc<dyn ChatTransport> = Arc::new(transport.clone());
    let handle = spawn_acquisition_engine(config, Arc::new(swarm), Arc::new(processor), shared);
    (handle, transport, dir)
}

#[tokio::test]
async fn concurrent_duplicate_download_runs_one_job() {
    let swarm = SimulationSwarmClient::new().with_delay(Duration::from_millis(100));
    let (engine, transport, _dir) = engine_with(swarm, SimulationSegmentProcessor::new());
    let alice = ChatAddress::new("alice");
    let bob = ChatAddress::new("bob");

    let (first, second) = tokio::join!(
        engine.acquire(magnet('a'), alice.clone()),
        engine.acquire(magnet('a'), bob.clone()),
    );

    // One request completes, the other is rejected, in either order.
    let (winner, loser) = if first.is_ok() {
        (first, second)
    } else {
        (second, first)
    };
    assert!(winner.is_ok());
    assert!(matches!(loser, Err(AcquireError::AlreadyInProgress { .. })));

    // The rejected requester heard about it exactly once.
    let rejected = if transport.texts_to(&alice).iter().any(|t| t.contains("already")) {
        alice
    } else {
        bob
    };
    let notices: Vec<_> = transport
        .texts_to(&rejected)
        .into_iter()
        .filter(|t| t.contains("already being downloaded"))
        .collect();
    assert_eq!(notices.len(), 1);
}

#[tokio::test]
async fn same_magnet_can_be_acquired_again_after_completion() {
    let (engine, _transport, _dir) =
        engine_with(SimulationSwarmClient::new(), SimulationSegmentProcessor::new());
    let alice = ChatAddress::new("alice");

    let first = engine.acquire(magnet('a'), alice.clone()).await.unwrap();
    let second = engine.acquire(magnet('a'), alice.clone()).await.unwrap();
    assert_ne!(first.session_key, second.session_key);
}

#[tokio::test]
async fn segmentation_yields_contiguous_names_and_deletes_source() {
    let swarm = SimulationSwarmClient::new().with_files(&["movie.mkv"]);
    let processor = SimulationSegmentProcessor::new().with_segment_count(4);
    let (engine, _transport, dir) = engine_with(swarm, processor);

    let summary = engine
        .acquire(magnet('b'), ChatAddress::new("alice"))
        .await
        .unwrap();

    let key = summary.session_key.as_str();
    let expected: Vec<String> = (0..4)
        .map(|i| format!("{key}-segment-{i:03}.mp4"))
        .collect();
    assert_eq!(summary.segment_files, expected);

    for name in &summary.segment_files {
        assert!(dir.path().join(name).is_file(), "{name} missing on disk");
    }
    assert!(
        !dir.path().join("movie.mkv").exists(),
        "source must be deleted after segmentation"
    );
}

#[tokio::test]
async fn second_session_replaces_registry_entry_but_keeps_files() {
    let (engine, _transport, dir) =
        engine_with(SimulationSwarmClient::new(), SimulationSegmentProcessor::new());
    let alice = ChatAddress::new("alice");

    let first = engine.acquire(magnet('a'), alice.clone()).await.unwrap();
    let second = engine.acquire(magnet('c'), alice.clone()).await.unwrap();

    let record = engine.session(alice).await.unwrap().unwrap();
    assert_eq!(record.session_key, second.session_key);
    assert_eq!(record.segment_count, second.segment_files.len());

    // The orphaned session's files stay until flushed by key.
    for name in &first.segment_files {
        assert!(dir.path().join(name).is_file());
    }
}

#[tokio::test]
async fn download_failure_notifies_requester_once() {
    let swarm = SimulationSwarmClient::new().failing();
    let (engine, transport, _dir) = engine_with(swarm, SimulationSegmentProcessor::new());
    let alice = ChatAddress::new("alice");

    let result = engine.acquire(magnet('d'), alice.clone()).await;
    assert!(matches!(result, Err(AcquireError::Swarm(_))));

    let texts = transport.texts_to(&alice);
    let failures: Vec<_> = texts
        .iter()
        .filter(|t| t.contains("Failed to download"))
        .collect();
    assert_eq!(failures.len(), 1, "exactly one failure notice: {texts:?}");
    assert!(engine.session(alice).await.unwrap().is_none());
}

#[tokio::test]
async fn segmentation_failure_preserves_source_file() {
    let swarm = SimulationSwarmClient::new().with_files(&["movie.mkv"]);
    let processor = SimulationSegmentProcessor::new().failing();
    let (engine, transport, dir) = engine_with(swarm, processor);
    let alice = ChatAddress::new("alice");

    let result = engine.acquire(magnet('e'), alice.clone()).await;
    assert!(matches!(result, Err(AcquireError::Segmentation(_))));
    assert!(dir.path().join("movie.mkv").exists());
    assert!(
        transport
            .texts_to(&alice)
            .iter()
            .any(|t| t.contains("Failed to split"))
    );
}

#[tokio::test]
async fn torrent_without_video_is_rejected() {
    let swarm = SimulationSwarmClient::new().with_files(&["readme.txt", "cover.jpg"]);
    let (engine, transport, _dir) = engine_with(swarm, SimulationSegmentProcessor::new());
    let alice = ChatAddress::new("alice");

    let result = engine.acquire(magnet('f'), alice.clone()).await;
    assert!(matches!(result, Err(AcquireError::NoPlayableMedia)));
    assert!(
        transport
            .texts_to(&alice)
            .iter()
            .any(|t| t.contains("No supported video file"))
    );
}

#[tokio::test]
async fn shutdown_ends_the_actor() {
    let (engine, _transport, _dir) =
        engine_with(SimulationSwarmClient::new(), SimulationSegmentProcessor::new());

    engine.shutdown().await.unwrap();
    // Give the actor task a moment to drop the receiver.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!engine.is_running());
    let result = engine.acquire(magnet('a'), ChatAddress::new("alice")).await;
    assert!(matches!(result, Err(AcquireError::EngineShutdown)));
}

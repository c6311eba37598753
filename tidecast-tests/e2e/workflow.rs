//! Full download-to-flush workflow
//!
//! Simulated swarm and transcoder behind a real engine, delivery and router:
//! a requester downloads a torrent, reads the chunk list from the reply,
//! fetches each chunk by name, flushes the session, and then finds nothing.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tidecast_catalog::CatalogService;
use tidecast_chat::{ChatRouter, InboundMessage};
use tidecast_core::config::TidecastConfig;
use tidecast_core::segmenting::SimulationSegmentProcessor;
use tidecast_core::swarm::SimulationSwarmClient;
use tidecast_core::transport::{ChannelTransport, ChatAddress, ChatTransport};
use tidecast_core::{SegmentDelivery, spawn_acquisition_engine};

const MAGNET: &str = "magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567";

struct Workflow {
    router: ChatRouter,
    transport: ChannelTransport,
    alice: ChatAddress,
    dir: TempDir,
}

impl Workflow {
    fn start() -> Self {
        let dir = TempDir::new().unwrap();
        let config = TidecastConfig::default().rooted_at(dir.path());
        let transport = ChannelTransport::new();
        let shared: Arc<dyn ChatTransport> = Arc::new(transport.clone());
        let engine = spawn_acquisition_engine(
            config,
            Arc::new(SimulationSwarmClient::new().with_files(&["movie.mkv"])),
            Arc::new(SimulationSegmentProcessor::new().with_segment_count(3)),
            shared.clone(),
        );
        let delivery = SegmentDelivery::new(dir.path(), shared.clone());
        let router = ChatRouter::new(
            engine,
            delivery,
            CatalogService::demo(),
            shared,
            Duration::from_secs(5),
        );
        Self {
            router,
            transport,
            alice: ChatAddress::new("alice"),
            dir,
        }
    }

    fn say(&self, body: &str) {
        self.router.dispatch(InboundMessage {
            from: self.alice.clone(),
            body: body.to_string(),
            is_group: false,
        });
    }

    /// Polls the outbox until a text matching `predicate` arrives.
    async fn wait_for_text(&self, predicate: impl Fn(&str) -> bool) -> String {
        for _ in 0..100 {
            if let Some(text) = self
                .transport
                .texts_to(&self.alice)
                .into_iter()
                .find(|t| predicate(t))
            {
                return text;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!(
            "expected text never arrived; outbox: {:?}",
            self.transport.texts_to(&self.alice)
        );
    }
}

/// Pulls the `- <name>` lines out of the chunk-list notification.
fn chunk_names(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter_map(|line| line.strip_prefix("- "))
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn download_getchunk_flush_round_trip() {
    let flow = Workflow::start();

    flow.say(&format!("!download {MAGNET}"));
    flow.wait_for_text(|t| t.contains("Download started")).await;
    let listing = flow
        .wait_for_text(|t| t.contains("Video chunks created"))
        .await;

    let names = chunk_names(&listing);
    assert_eq!(names.len(), 3);
    for (index, name) in names.iter().enumerate() {
        assert!(
            name.contains(&format!("-segment-{index:03}.mp4")),
            "unexpected chunk name {name}"
        );
        assert!(flow.dir.path().join(name).is_file());
    }
    assert!(
        !flow.dir.path().join("movie.mkv").exists(),
        "source must be gone after segmentation"
    );

    // Every chunk is retrievable by its literal name.
    for name in &names {
        flow.say(&format!("!getchunk {name}"));
    }
    for _ in 0..100 {
        if flow.transport.files_to(&flow.alice).len() == names.len() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let delivered = flow.transport.files_to(&flow.alice);
    assert_eq!(delivered.len(), names.len());

    // The session key is the chunk-name prefix before "-segment-".
    let key = names[0].split("-segment-").next().unwrap().to_string();
    flow.say(&format!("!flush {key}"));
    flow.wait_for_text(|t| t.contains(&format!("Deleted 3 chunk(s) with prefix {key}")))
        .await;
    for name in &names {
        assert!(!flow.dir.path().join(name).exists());
    }

    // A flushed chunk is gone for good.
    flow.say(&format!("!getchunk {}", names[0]));
    flow.wait_for_text(|t| t == "Chunk not found!").await;
}

#[tokio::test]
async fn duplicate_download_while_running_is_rejected_in_chat() {
    let dir = TempDir::new().unwrap();
    let config = TidecastConfig::default().rooted_at(dir.path());
    let transport = ChannelTransport::new();
    let shared: Arc<dyn ChatTransport> = Arc::new(transport.clone());
    let engine = spawn_acquisition_engine(
        config,
        Arc::new(
            SimulationSwarmClient::new()
                .with_files(&["movie.mkv"])
                .with_delay(Duration::from_millis(300)),
        ),
        Arc::new(SimulationSegmentProcessor::new()),
        shared.clone(),
    );
    let delivery = SegmentDelivery::new(dir.path(), shared.clone());
    let router = ChatRouter::new(
        engine,
        delivery,
        CatalogService::demo(),
        shared,
        Duration::from_secs(5),
    );

    let alice = ChatAddress::new("alice");
    let bob = ChatAddress::new("bob");
    router.dispatch(InboundMessage {
        from: alice.clone(),
        body: format!("!download {MAGNET}"),
        is_group: false,
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    router.dispatch(InboundMessage {
        from: bob.clone(),
        body: format!("!download {MAGNET}"),
        is_group: false,
    });

    for _ in 0..100 {
        if !transport.texts_to(&bob).is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let bob_texts = transport.texts_to(&bob);
    assert!(
        bob_texts
            .iter()
            .any(|t| t.contains("already being downloaded")),
        "bob must be told the torrent is in flight: {bob_texts:?}"
    );

    // Alice's download still completes.
    for _ in 0..200 {
        if transport
            .texts_to(&alice)
            .iter()
            .any(|t| t.contains("Video chunks created"))
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("alice's download never completed");
}

//! Chat router integration tests
//!
//! The router wired to a live engine, delivery and catalog, focusing on the
//! interactive selection prompt's lifecycle across messages.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tidecast_catalog::{CatalogService, MockCatalogProvider};
use tidecast_chat::{ChatRouter, InboundMessage};
use tidecast_core::config::TidecastConfig;
use tidecast_core::segmenting::SimulationSegmentProcessor;
use tidecast_core::swarm::SimulationSwarmClient;
use tidecast_core::transport::{ChannelTransport, ChatAddress, ChatTransport};
use tidecast_core::{SegmentDelivery, spawn_acquisition_engine};

fn router_rig(catalog: CatalogService) -> (ChatRouter, ChannelTransport, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = TidecastConfig::default().rooted_at(dir.path());
    let transport = ChannelTransport::new();
    let shared: Arc<dyn ChatTransport> = Arc::new(transport.clone());
    let engine = spawn_acquisition_engine(
        config,
        Arc::new(SimulationSwarmClient::new()),
        Arc::new(SimulationSegmentProcessor::new()),
        shared.clone(),
    );
    let delivery = SegmentDelivery::new(dir.path(), shared.clone());
    let router = ChatRouter::new(
        engine,
        delivery,
        catalog,
        shared,
        Duration::from_millis(300),
    );
    (router, transport, dir)
}

fn scripted_catalog() -> CatalogService {
    let provider = MockCatalogProvider::new()
        .with_entry("First Film", "1.2 GB", "magnet:?xt=urn:btih:aaa")
        .with_entry("Second Film", "700 MB", "magnet:?xt=urn:btih:bbb");
    CatalogService::with_provider(Arc::new(provider))
}

fn direct(from: &str, body: &str) -> InboundMessage {
    InboundMessage {
        from: ChatAddress::new(from),
        body: body.to_string(),
        is_group: false,
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn superseding_prompt_replaces_the_old_one_silently() {
    let (router, transport, _dir) = router_rig(scripted_catalog());
    let alice = ChatAddress::new("alice");

    router.dispatch(direct("alice", "!listmovies"));
    settle().await;
    router.dispatch(direct("alice", "!listmovies"));
    settle().await;
    router.dispatch(direct("alice", "1"));
    settle().await;

    let texts = transport.texts_to(&alice);
    let magnets: Vec<_> = texts.iter().filter(|t| t.contains("Magnet link")).collect();
    assert_eq!(magnets.len(), 1, "one selection resolves once: {texts:?}");
    assert!(
        !texts.iter().any(|t| t.contains("timed out")),
        "superseded prompt must not announce a timeout: {texts:?}"
    );
}

#[tokio::test]
async fn pending_prompt_consumes_the_next_message_even_if_command_shaped() {
    let (router, transport, dir) = router_rig(scripted_catalog());
    std::fs::write(dir.path().join("ab12cd-segment-000.mp4"), b"x").unwrap();
    let alice = ChatAddress::new("alice");

    router.dispatch(direct("alice", "!listmovies"));
    settle().await;
    router.dispatch(direct("alice", "!flush ab12cd"));
    settle().await;

    let texts = transport.texts_to(&alice);
    assert!(texts.iter().any(|t| t.contains("Invalid number")));
    assert!(
        !texts.iter().any(|t| t.contains("Deleted")),
        "flush must not run while consumed as a selection: {texts:?}"
    );
    assert!(dir.path().join("ab12cd-segment-000.mp4").exists());
}

#[tokio::test]
async fn group_messages_do_not_answer_a_pending_prompt() {
    let (router, transport, _dir) = router_rig(scripted_catalog());
    let alice = ChatAddress::new("alice");

    router.dispatch(direct("alice", "!listmovies"));
    settle().await;
    router.dispatch(InboundMessage {
        from: alice.clone(),
        body: "2".to_string(),
        is_group: true,
    });
    settle().await;
    router.dispatch(direct("alice", "2"));
    settle().await;

    let texts = transport.texts_to(&alice);
    assert!(
        texts
            .iter()
            .any(|t| t.contains("Magnet link for Second Film")),
        "the direct reply must still resolve the prompt: {texts:?}"
    );
}

#[tokio::test]
async fn requesters_have_independent_prompts() {
    let (router, transport, _dir) = router_rig(scripted_catalog());
    let alice = ChatAddress::new("alice");
    let bob = ChatAddress::new("bob");

    router.dispatch(direct("alice", "!listmovies"));
    router.dispatch(direct("bob", "!listmovies"));
    settle().await;
    router.dispatch(direct("alice", "1"));
    router.dispatch(direct("bob", "2"));
    settle().await;

    assert!(
        transport
            .texts_to(&alice)
            .iter()
            .any(|t| t.contains("Magnet link for First Film"))
    );
    assert!(
        transport
            .texts_to(&bob)
            .iter()
            .any(|t| t.contains("Magnet link for Second Film"))
    );
}

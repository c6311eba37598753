//! Segment delivery integration tests
//!
//! Retrieval and flush against a real working directory, with the recording
//! transport standing in for the chat network.

use std::sync::Arc;

use tempfile::TempDir;
use tidecast_core::delivery::{DeliveryError, flush_prefix};
use tidecast_core::transport::{ChannelTransport, ChatAddress, ChatTransport};
use tidecast_core::SegmentDelivery;

fn delivery_rig() -> (SegmentDelivery, ChannelTransport, TempDir) {
    let dir = TempDir::new().unwrap();
    let transport = ChannelTransport::new();
    let shared: Arc<dyn ChatTransport> = Arc::new(transport.clone());
    (SegmentDelivery::new(dir.path(), shared), transport, dir)
}

#[tokio::test]
async fn retrieval_streams_segment_bytes_by_name() {
    let (delivery, transport, dir) = delivery_rig();
    std::fs::write(dir.path().join("ab12cd-segment-000.mp4"), b"payload").unwrap();
    let alice = ChatAddress::new("alice");

    delivery
        .retrieve(&alice, "ab12cd-segment-000.mp4")
        .await
        .unwrap();

    let files = transport.files_to(&alice);
    assert_eq!(files.len(), 1);
    assert_eq!(std::fs::read(&files[0]).unwrap(), b"payload");
}

#[tokio::test]
async fn traversal_names_never_resolve_outside_work_dir() {
    let (delivery, transport, dir) = delivery_rig();
    // A file one level above the working directory must stay unreachable.
    let secret = dir.path().parent().unwrap().join("secret.mp4");
    let alice = ChatAddress::new("alice");

    for name in [
        "../secret.mp4",
        "../../etc/passwd",
        "/etc/passwd",
        "a/../b.mp4",
        "..",
        ".",
    ] {
        let result = delivery.retrieve(&alice, name).await;
        assert!(
            matches!(result, Err(DeliveryError::NotFound { .. })),
            "{name:?} must be NotFound"
        );
    }
    assert!(transport.sent().is_empty());
    assert!(!secret.exists());
}

#[tokio::test]
async fn flush_with_no_matches_is_a_successful_noop() {
    let (delivery, _transport, dir) = delivery_rig();
    std::fs::write(dir.path().join("ab12cd-segment-000.mp4"), b"x").unwrap();

    assert_eq!(delivery.flush("zz99yy").await.unwrap(), 0);
    assert!(dir.path().join("ab12cd-segment-000.mp4").exists());
}

#[tokio::test]
async fn flush_removes_exactly_the_keyed_session() {
    let (delivery, _transport, dir) = delivery_rig();
    for name in [
        "ab12cd-segment-000.mp4",
        "ab12cd-segment-001.mp4",
        "ffeedd-segment-000.mp4",
    ] {
        std::fs::write(dir.path().join(name), b"x").unwrap();
    }

    assert_eq!(delivery.flush("ab12cd").await.unwrap(), 2);
    assert!(!dir.path().join("ab12cd-segment-000.mp4").exists());
    assert!(dir.path().join("ffeedd-segment-000.mp4").exists());
}

#[tokio::test]
async fn flush_prefix_works_without_a_transport() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("ab12cd-segment-000.mp4"), b"x").unwrap();

    assert_eq!(flush_prefix(dir.path(), "ab12cd").await.unwrap(), 1);
    assert_eq!(flush_prefix(dir.path(), "ab12cd").await.unwrap(), 0);
}

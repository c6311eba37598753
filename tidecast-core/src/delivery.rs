//! Segment retrieval and flush.
//!
//! Requesters address segments by literal file name, so this path never
//! consults the session registry or the engine actor; it validates the name,
//! checks the working directory, and streams the file out. Flush is the
//! bulk-deletion counterpart keyed by name prefix.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::naming;
use crate::transport::{ChatAddress, ChatTransport};

/// Errors from segment retrieval and flush.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The name failed validation or no such file exists in the working
    /// directory. Unsafe names are folded into this variant deliberately so
    /// a probing requester learns nothing about the filesystem.
    #[error("Segment not found: {name}")]
    NotFound { name: String },

    /// The transport refused the outbound file; reported, not retried.
    #[error("Segment delivery failed: {reason}")]
    SendFailed { reason: String },

    /// Filesystem trouble around the working directory.
    #[error("Delivery I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serves and purges segment files in the fixed working directory.
///
/// Operates directly on the filesystem and may run concurrently with active
/// acquisition pipelines writing new segments. Flushing a prefix belonging
/// to a still-segmenting session is not prevented.
#[derive(Clone)]
pub struct SegmentDelivery {
    work_dir: PathBuf,
    transport: Arc<dyn ChatTransport>,
}

impl SegmentDelivery {
    /// Creates a delivery service over `work_dir`.
    pub fn new(work_dir: impl Into<PathBuf>, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            work_dir: work_dir.into(),
            transport,
        }
    }

    /// Streams one segment to the requester as a file attachment.
    ///
    /// The name must be a bare file name; separators, parent-directory
    /// segments and absolute paths are rejected before any filesystem
    /// access, so a request can never resolve outside the working directory.
    ///
    /// # Errors
    /// - `DeliveryError::NotFound` - Unsafe name or no such segment on disk
    /// - `DeliveryError::SendFailed` - The transport rejected the send
    pub async fn retrieve(
        &self,
        requester: &ChatAddress,
        segment_name: &str,
    ) -> Result<(), DeliveryError> {
        let segment_name = segment_name.trim();
        if !naming::is_safe_segment_name(segment_name) {
            tracing::warn!(
                "Rejected unsafe segment name {:?} from {}",
                segment_name,
                requester
            );
            return Err(DeliveryError::NotFound {
                name: segment_name.to_string(),
            });
        }

        let path = self.work_dir.join(segment_name);
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => {}
            _ => {
                tracing::debug!("Segment {} not found for {}", segment_name, requester);
                return Err(DeliveryError::NotFound {
                    name: segment_name.to_string(),
                });
            }
        }

        tracing::info!("Sending segment {} to {}", segment_name, requester);
        self.transport
            .send_file(requester, &path)
            .await
            .map_err(|e| DeliveryError::SendFailed {
                reason: e.to_string(),
            })
    }

    /// Deletes every working-directory file whose name starts with `prefix`.
    ///
    /// Returns the number of files deleted; zero matches is success, with no
    /// confirmation step.
    ///
    /// # Errors
    /// - `DeliveryError::Io` - The working directory could not be listed
    pub async fn flush(&self, prefix: &str) -> Result<usize, DeliveryError> {
        flush_prefix(&self.work_dir, prefix).await
    }
}

/// Deletes every file in `work_dir` whose name starts with `prefix`.
///
/// Free-function form of [`SegmentDelivery::flush`] for callers without a
/// transport, such as the CLI's offline flush command.
///
/// # Errors
/// - `DeliveryError::Io` - The directory could not be listed
pub async fn flush_prefix(work_dir: &Path, prefix: &str) -> Result<usize, DeliveryError> {
    let mut entries = match tokio::fs::read_dir(work_dir).await {
        Ok(entries) => entries,
        // A missing working directory trivially matches nothing.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(DeliveryError::Io(e)),
    };

    let mut deleted = 0usize;
    while let Some(entry) = entries.next_entry().await? {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if !name.starts_with(prefix) || !entry.path().is_file() {
            continue;
        }
        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => deleted += 1,
            // Lost a race with another flush or cleanup; fine.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(DeliveryError::Io(e)),
        }
    }

    tracing::info!("Flushed {} file(s) with prefix {:?}", deleted, prefix);
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::transport::ChannelTransport;

    fn delivery_over(dir: &Path) -> (SegmentDelivery, ChannelTransport) {
        let transport = ChannelTransport::new();
        let delivery = SegmentDelivery::new(dir, Arc::new(transport.clone()));
        (delivery, transport)
    }

    #[tokio::test]
    async fn retrieve_sends_existing_segment() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("ab12cd-segment-000.mp4"), b"data").unwrap();
        let (delivery, transport) = delivery_over(dir.path());
        let alice = ChatAddress::new("alice");

        delivery
            .retrieve(&alice, "ab12cd-segment-000.mp4")
            .await
            .unwrap();

        let files = transport.files_to(&alice);
        assert_eq!(files, vec![dir.path().join("ab12cd-segment-000.mp4")]);
    }

    #[tokio::test]
    async fn retrieve_trims_surrounding_whitespace() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("ab12cd-segment-000.mp4"), b"data").unwrap();
        let (delivery, transport) = delivery_over(dir.path());
        let alice = ChatAddress::new("alice");

        delivery
            .retrieve(&alice, " ab12cd-segment-000.mp4 ")
            .await
            .unwrap();
        assert_eq!(transport.files_to(&alice).len(), 1);
    }

    #[tokio::test]
    async fn retrieve_missing_segment_is_not_found() {
        let dir = tempdir().unwrap();
        let (delivery, _transport) = delivery_over(dir.path());

        let result = delivery
            .retrieve(&ChatAddress::new("alice"), "nope-segment-000.mp4")
            .await;
        assert!(matches!(result, Err(DeliveryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn retrieve_rejects_traversal_names() {
        let dir = tempdir().unwrap();
        let (delivery, transport) = delivery_over(dir.path());
        let alice = ChatAddress::new("alice");

        for name in ["../../etc/passwd", "/etc/passwd", "..", "a/b.mp4", ""] {
            let result = delivery.retrieve(&alice, name).await;
            assert!(
                matches!(result, Err(DeliveryError::NotFound { .. })),
                "{name:?} must be rejected"
            );
        }
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn retrieve_transport_failure_is_send_failed() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("ab12cd-segment-000.mp4"), b"data").unwrap();
        let transport = ChannelTransport::new().failing();
        let delivery = SegmentDelivery::new(dir.path(), Arc::new(transport));

        let result = delivery
            .retrieve(&ChatAddress::new("alice"), "ab12cd-segment-000.mp4")
            .await;
        assert!(matches!(result, Err(DeliveryError::SendFailed { .. })));
    }

    #[tokio::test]
    async fn flush_deletes_only_matching_prefix() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("ab12cd-segment-000.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("ab12cd-segment-001.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("ffeedd-segment-000.mp4"), b"x").unwrap();
        let (delivery, _transport) = delivery_over(dir.path());

        let deleted = delivery.flush("ab12cd").await.unwrap();
        assert_eq!(deleted, 2);
        assert!(dir.path().join("ffeedd-segment-000.mp4").exists());
    }

    #[tokio::test]
    async fn flush_with_no_matches_succeeds() {
        let dir = tempdir().unwrap();
        let (delivery, _transport) = delivery_over(dir.path());
        assert_eq!(delivery.flush("nothing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn flush_prefix_on_missing_dir_is_zero() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert_eq!(flush_prefix(&missing, "ab12cd").await.unwrap(), 0);
    }
}

//! Segmentation engine.
//!
//! Splits one source media file into a sequence of fixed-duration segment
//! files without re-encoding, via an external transcoder behind the
//! [`SegmentProcessor`] trait. The source file is deleted on success and
//! preserved on failure so a caller could retry; the engine itself never
//! retries.

pub mod ffmpeg;
pub mod simulation;

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use ffmpeg::FfmpegSegmentProcessor;
pub use simulation::SimulationSegmentProcessor;

use crate::naming::{self, SessionKey};

/// Errors from the segmentation engine.
#[derive(Debug, Error)]
pub enum SegmentingError {
    /// The transcoder ran but reported failure; carries its diagnostic.
    #[error("Segmenting process failed: {reason}")]
    ProcessFailed { reason: String },

    /// The transcoder binary could not be started.
    #[error("Segmenting tool unavailable: {reason}")]
    ToolUnavailable { reason: String },

    /// The transcoder claimed success but wrote no segment files.
    #[error("Segmenting produced no output for key {session_key}")]
    NoSegmentsProduced { session_key: String },

    /// Filesystem trouble around the working directory.
    #[error("Segmenting I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One segment file on durable storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentFile {
    /// Zero-based position within the source media
    pub index: u32,
    /// Bare file name, the handle requesters use to retrieve it
    pub file_name: String,
    /// Full path inside the working directory
    pub path: PathBuf,
}

/// External transcoder seam.
///
/// `split` drives one segmentation run against `source`, writing files that
/// honor the `%03d` output template, and resolves only when the tool has
/// finished. No timeout is imposed.
#[async_trait]
pub trait SegmentProcessor: Send + Sync {
    /// Splits `source` into fixed-duration segments named by `output_template`.
    ///
    /// # Errors
    /// - `SegmentingError::ProcessFailed` - The tool reported an error
    /// - `SegmentingError::ToolUnavailable` - The tool could not be started
    async fn split(
        &self,
        source: &Path,
        output_template: &Path,
        segment_seconds: u32,
    ) -> Result<(), SegmentingError>;

    /// Checks whether the transcoder is installed and runnable.
    fn is_available(&self) -> bool;
}

/// Splits source files into session-keyed segment sequences.
///
/// Owns the fixed working directory and target container; the processor is
/// shared so concurrent jobs segment as independent external processes.
#[derive(Clone)]
pub struct Segmenter {
    processor: Arc<dyn SegmentProcessor>,
    work_dir: PathBuf,
    container: &'static str,
}

impl Segmenter {
    /// Creates a segmenter writing into `work_dir` with the given container.
    pub fn new(
        processor: Arc<dyn SegmentProcessor>,
        work_dir: impl Into<PathBuf>,
        container: &'static str,
    ) -> Self {
        Self {
            processor,
            work_dir: work_dir.into(),
            container,
        }
    }

    /// Segments `source` into `<key>-segment-NNN.<container>` files.
    ///
    /// Suspends until the external tool finishes, then lists the working
    /// directory for the session's files, returned in ascending index order.
    /// The source file is deleted only once the listing confirms output, so
    /// every failure leaves it in place; a failed deletion is logged, not
    /// escalated.
    ///
    /// # Errors
    /// - `SegmentingError::ProcessFailed` - The tool reported an error
    /// - `SegmentingError::NoSegmentsProduced` - Success with an empty listing
    /// - `SegmentingError::Io` - The directory listing failed
    pub async fn segment(
        &self,
        source: &Path,
        session_key: &SessionKey,
        segment_seconds: u32,
    ) -> Result<Vec<SegmentFile>, SegmentingError> {
        let template = self
            .work_dir
            .join(naming::output_template(session_key, self.container));

        tracing::info!(
            "Segmenting {} into {}s pieces as {}",
            source.display(),
            segment_seconds,
            template.display()
        );

        self.processor
            .split(source, &template, segment_seconds)
            .await?;

        let segments = self.list_session_segments(session_key).await?;
        if segments.is_empty() {
            return Err(SegmentingError::NoSegmentsProduced {
                session_key: session_key.to_string(),
            });
        }

        // Space reclamation: the unsegmented original is no longer needed.
        match tokio::fs::remove_file(source).await {
            Ok(()) => tracing::debug!("Deleted segmented source {}", source.display()),
            Err(e) => tracing::warn!(
                "Failed to delete segmented source {}: {}",
                source.display(),
                e
            ),
        }

        tracing::info!(
            "Segmented {} into {} piece(s) under key {}",
            source.display(),
            segments.len(),
            session_key
        );

        Ok(segments)
    }

    /// Lists the working directory for this session's segment files,
    /// ordered by ascending index.
    async fn list_session_segments(
        &self,
        session_key: &SessionKey,
    ) -> Result<Vec<SegmentFile>, SegmentingError> {
        let prefix = session_key.file_prefix();
        let mut segments = Vec::new();

        let mut entries = tokio::fs::read_dir(&self.work_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if !name.starts_with(&prefix) {
                continue;
            }
            let Some((_, index)) = naming::parse_segment_name(name) else {
                continue;
            };
            segments.push(SegmentFile {
                index,
                file_name: name.to_string(),
                path: entry.path(),
            });
        }

        segments.sort_by(|a, b| match a.index.cmp(&b.index) {
            Ordering::Equal => a.file_name.cmp(&b.file_name),
            other => other,
        });
        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn write_source(dir: &Path) -> PathBuf {
        let source = dir.join("movie.mkv");
        std::fs::write(&source, vec![0u8; 4096]).unwrap();
        source
    }

    #[tokio::test]
    async fn segment_deletes_source_and_orders_output() {
        let dir = tempdir().unwrap();
        let source = write_source(dir.path());
        let key = SessionKey::from_string("a1b2c3");

        let processor = Arc::new(SimulationSegmentProcessor::new().with_segment_count(4));
        let segmenter = Segmenter::new(processor, dir.path(), "mp4");

        let segments = segmenter.segment(&source, &key, 300).await.unwrap();

        assert_eq!(segments.len(), 4);
        for (expected_index, segment) in segments.iter().enumerate() {
            assert_eq!(segment.index, expected_index as u32);
            assert_eq!(
                segment.file_name,
                format!("a1b2c3-segment-{expected_index:03}.mp4")
            );
            assert!(segment.path.exists());
        }
        assert!(!source.exists());
    }

    #[tokio::test]
    async fn segment_failure_preserves_source() {
        let dir = tempdir().unwrap();
        let source = write_source(dir.path());
        let key = SessionKey::from_string("a1b2c3");

        let processor = Arc::new(SimulationSegmentProcessor::new().failing());
        let segmenter = Segmenter::new(processor, dir.path(), "mp4");

        let result = segmenter.segment(&source, &key, 300).await;
        assert!(matches!(result, Err(SegmentingError::ProcessFailed { .. })));
        assert!(source.exists());
    }

    #[tokio::test]
    async fn empty_output_is_an_error() {
        let dir = tempdir().unwrap();
        let source = write_source(dir.path());
        let key = SessionKey::from_string("a1b2c3");

        let processor = Arc::new(SimulationSegmentProcessor::new().with_segment_count(0));
        let segmenter = Segmenter::new(processor, dir.path(), "mp4");

        let result = segmenter.segment(&source, &key, 300).await;
        assert!(matches!(
            result,
            Err(SegmentingError::NoSegmentsProduced { .. })
        ));
        // The failure came after the split, so the source must survive it.
        assert!(source.exists());
    }

    #[tokio::test]
    async fn listing_keeps_indices_past_999() {
        let dir = tempdir().unwrap();
        let source = write_source(dir.path());
        let key = SessionKey::from_string("a1b2c3");

        // ffmpeg widens %03d to four digits from index 1000 on.
        std::fs::write(dir.path().join("a1b2c3-segment-1000.mp4"), b"x").unwrap();

        let processor = Arc::new(SimulationSegmentProcessor::new().with_segment_count(2));
        let segmenter = Segmenter::new(processor, dir.path(), "mp4");

        let segments = segmenter.segment(&source, &key, 300).await.unwrap();
        let indices: Vec<u32> = segments.iter().map(|segment| segment.index).collect();
        assert_eq!(indices, vec![0, 1, 1000]);
        assert_eq!(segments[2].file_name, "a1b2c3-segment-1000.mp4");
    }

    #[tokio::test]
    async fn listing_ignores_other_sessions() {
        let dir = tempdir().unwrap();
        let source = write_source(dir.path());
        let key = SessionKey::from_string("a1b2c3");

        // Files from an unrelated session and a stray download.
        std::fs::write(dir.path().join("ffeedd-segment-000.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("other.mkv"), b"x").unwrap();

        let processor = Arc::new(SimulationSegmentProcessor::new().with_segment_count(2));
        let segmenter = Segmenter::new(processor, dir.path(), "mp4");

        let segments = segmenter.segment(&source, &key, 300).await.unwrap();
        assert_eq!(segments.len(), 2);
        assert!(
            segments
                .iter()
                .all(|segment| segment.file_name.starts_with("a1b2c3-"))
        );
    }
}

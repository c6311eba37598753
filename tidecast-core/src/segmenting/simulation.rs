//! Simulation segment processor for testing and development.

use std::path::Path;

use async_trait::async_trait;

use super::{SegmentProcessor, SegmentingError};

/// Segment processor that fabricates numbered segment files.
///
/// Honors the `%03d` output template the way ffmpeg's segment muxer would,
/// writing a configurable number of small files, so the segmenter's listing,
/// ordering and source-deletion logic run against real directory contents.
pub struct SimulationSegmentProcessor {
    segment_count: u32,
    segment_bytes: usize,
    fail: bool,
    available: bool,
}

impl SimulationSegmentProcessor {
    pub fn new() -> Self {
        Self {
            segment_count: 3,
            segment_bytes: 256,
            fail: false,
            available: true,
        }
    }

    /// Sets how many segment files a split produces.
    pub fn with_segment_count(mut self, count: u32) -> Self {
        self.segment_count = count;
        self
    }

    /// Sets the size of each fabricated segment in bytes.
    pub fn with_segment_bytes(mut self, bytes: usize) -> Self {
        self.segment_bytes = bytes;
        self
    }

    /// Makes every split fail with a diagnostic.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Simulates the transcoder being uninstalled.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }
}

impl Default for SimulationSegmentProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SegmentProcessor for SimulationSegmentProcessor {
    async fn split(
        &self,
        source: &Path,
        output_template: &Path,
        _segment_seconds: u32,
    ) -> Result<(), SegmentingError> {
        if !self.available {
            return Err(SegmentingError::ToolUnavailable {
                reason: "transcoder not available in simulation".to_string(),
            });
        }
        if self.fail {
            return Err(SegmentingError::ProcessFailed {
                reason: format!("simulated transcoder failure for {}", source.display()),
            });
        }
        if !source.exists() {
            return Err(SegmentingError::ProcessFailed {
                reason: format!("source file missing: {}", source.display()),
            });
        }

        let template = output_template.to_str().ok_or_else(|| {
            SegmentingError::ProcessFailed {
                reason: "output template is not valid UTF-8".to_string(),
            }
        })?;

        for index in 0..self.segment_count {
            let path = template.replace("%03d", &format!("{index:03}"));
            tokio::fs::write(&path, vec![0u8; self.segment_bytes]).await?;
        }

        Ok(())
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn split_honors_template_numbering() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("movie.mkv");
        std::fs::write(&source, b"data").unwrap();

        let processor = SimulationSegmentProcessor::new().with_segment_count(2);
        processor
            .split(&source, &dir.path().join("ab-segment-%03d.mp4"), 300)
            .await
            .unwrap();

        assert!(dir.path().join("ab-segment-000.mp4").exists());
        assert!(dir.path().join("ab-segment-001.mp4").exists());
        assert!(!dir.path().join("ab-segment-002.mp4").exists());
    }

    #[tokio::test]
    async fn unavailable_processor_fails_split() {
        let dir = tempdir().unwrap();
        let processor = SimulationSegmentProcessor::new().unavailable();
        assert!(!processor.is_available());

        let result = processor
            .split(
                &dir.path().join("movie.mkv"),
                &dir.path().join("ab-segment-%03d.mp4"),
                300,
            )
            .await;
        assert!(matches!(result, Err(SegmentingError::ToolUnavailable { .. })));
    }
}

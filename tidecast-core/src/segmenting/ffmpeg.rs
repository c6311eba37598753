//! Production segment processor driving the ffmpeg binary.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{SegmentProcessor, SegmentingError};

/// Segment processor shelling out to ffmpeg's segment muxer.
///
/// Stream-copy only: `-c copy -map 0` carries every stream through
/// unchanged, `-f segment` with `-reset_timestamps 1` produces
/// independently playable pieces, and `-segment_format mp4` pins the
/// output container regardless of the source container.
pub struct FfmpegSegmentProcessor {
    binary: PathBuf,
}

impl FfmpegSegmentProcessor {
    /// Creates a processor using the given ffmpeg binary path or name.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn verify_installation(&self) -> Result<(), SegmentingError> {
        let result = std::process::Command::new(&self.binary)
            .arg("-version")
            .output();

        match result {
            Ok(output) if output.status.success() => Ok(()),
            Ok(_) => Err(SegmentingError::ToolUnavailable {
                reason: "ffmpeg binary found but returned error".to_string(),
            }),
            Err(_) => Err(SegmentingError::ToolUnavailable {
                reason: format!("{} not found in PATH", self.binary.display()),
            }),
        }
    }
}

impl Default for FfmpegSegmentProcessor {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl SegmentProcessor for FfmpegSegmentProcessor {
    async fn split(
        &self,
        source: &Path,
        output_template: &Path,
        segment_seconds: u32,
    ) -> Result<(), SegmentingError> {
        let mut cmd = tokio::process::Command::new(&self.binary);
        cmd.arg("-y")
            .arg("-i")
            .arg(source)
            .arg("-c")
            .arg("copy")
            .arg("-map")
            .arg("0")
            .arg("-f")
            .arg("segment")
            .arg("-segment_time")
            .arg(segment_seconds.to_string())
            .arg("-reset_timestamps")
            .arg("1")
            .arg("-segment_format")
            .arg("mp4")
            .arg(output_template);

        tracing::debug!("Executing ffmpeg command: {:?}", cmd);

        let output = cmd
            .output()
            .await
            .map_err(|e| SegmentingError::ToolUnavailable {
                reason: format!("failed to execute {}: {e}", self.binary.display()),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            tracing::error!(
                "ffmpeg failed with exit code {} for {}: {}",
                output.status,
                source.display(),
                stderr
            );
            return Err(SegmentingError::ProcessFailed {
                reason: format!("ffmpeg exited with {}: {stderr}", output.status),
            });
        }

        // ffmpeg logs progress on stderr even on success.
        if !stderr.is_empty() {
            tracing::trace!("ffmpeg stderr: {}", stderr);
        }

        Ok(())
    }

    fn is_available(&self) -> bool {
        self.verify_installation().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn missing_binary_is_unavailable() {
        let processor = FfmpegSegmentProcessor::new("definitely-not-ffmpeg");
        assert!(!processor.is_available());

        let dir = tempdir().unwrap();
        let source = dir.path().join("movie.mkv");
        std::fs::write(&source, b"data").unwrap();

        let result = processor
            .split(&source, &dir.path().join("k-segment-%03d.mp4"), 300)
            .await;
        assert!(matches!(result, Err(SegmentingError::ToolUnavailable { .. })));
    }
}

//! Production swarm client shelling out to aria2c.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{MagnetLink, SwarmClient, SwarmError};

/// Swarm client driving the aria2c binary.
///
/// aria2c owns peer discovery, piece transfer and verification; this wrapper
/// only starts the process, waits for it to exit, and reports which files
/// appeared in the destination directory. The reported set is computed by
/// diffing a recursive directory snapshot taken before and after the run,
/// because aria2c decides file names from torrent metadata we never see.
pub struct Aria2SwarmClient {
    binary: PathBuf,
}

impl Aria2SwarmClient {
    /// Creates a client using the given aria2c binary path or name.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Recursively lists every file below `dir`, excluding aria2 control files.
    fn snapshot(dir: &Path) -> Result<HashSet<PathBuf>, SwarmError> {
        let mut files = HashSet::new();
        let mut stack = vec![dir.to_path_buf()];
        while let Some(current) = stack.pop() {
            let entries = match std::fs::read_dir(&current) {
                Ok(entries) => entries,
                // The destination may not exist before the first download.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(SwarmError::Io(e)),
            };
            for entry in entries {
                let entry = entry.map_err(SwarmError::Io)?;
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if path.extension().is_none_or(|ext| ext != "aria2") {
                    files.insert(path);
                }
            }
        }
        Ok(files)
    }
}

impl Default for Aria2SwarmClient {
    fn default() -> Self {
        Self::new("aria2c")
    }
}

#[async_trait]
impl SwarmClient for Aria2SwarmClient {
    async fn download(
        &self,
        link: &MagnetLink,
        dest_dir: &Path,
    ) -> Result<Vec<PathBuf>, SwarmError> {
        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(SwarmError::Io)?;

        let before = Self::snapshot(dest_dir)?;

        tracing::info!(
            "Starting aria2c download of {} into {}",
            link.info_hash,
            dest_dir.display()
        );

        let output = tokio::process::Command::new(&self.binary)
            .arg("--dir")
            .arg(dest_dir)
            .arg("--seed-time=0")
            .arg("--summary-interval=0")
            .arg("--console-log-level=warn")
            .arg(&link.uri)
            .output()
            .await
            .map_err(|e| SwarmError::ClientUnavailable {
                reason: format!("failed to execute {}: {e}", self.binary.display()),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            tracing::debug!("aria2c stderr: {}", stderr);
        }

        if !output.status.success() {
            tracing::error!(
                "aria2c failed with exit code {} for {}",
                output.status,
                link.info_hash
            );
            return Err(SwarmError::DownloadFailed {
                reason: format!("aria2c exited with {}: {stderr}", output.status),
            });
        }

        let after = Self::snapshot(dest_dir)?;
        let mut new_files: Vec<PathBuf> = after.difference(&before).cloned().collect();
        new_files.sort();

        if new_files.is_empty() {
            return Err(SwarmError::DownloadFailed {
                reason: "aria2c exited successfully but produced no files".to_string(),
            });
        }

        tracing::info!(
            "aria2c completed {}: {} file(s)",
            link.info_hash,
            new_files.len()
        );

        Ok(new_files)
    }

    fn is_available(&self) -> bool {
        std::process::Command::new(&self.binary)
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn snapshot_skips_control_files_and_recurses() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("movie.mkv"), b"data").unwrap();
        std::fs::write(dir.path().join("movie.mkv.aria2"), b"ctl").unwrap();
        std::fs::create_dir(dir.path().join("extras")).unwrap();
        std::fs::write(dir.path().join("extras/sample.mp4"), b"data").unwrap();

        let files = Aria2SwarmClient::snapshot(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.contains(&dir.path().join("movie.mkv")));
        assert!(files.contains(&dir.path().join("extras/sample.mp4")));
    }

    #[test]
    fn snapshot_of_missing_dir_is_empty() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(Aria2SwarmClient::snapshot(&missing).unwrap().is_empty());
    }

    #[tokio::test]
    async fn download_with_bogus_binary_is_unavailable() {
        let dir = tempdir().unwrap();
        let client = Aria2SwarmClient::new("definitely-not-aria2c");
        let link = MagnetLink::parse(
            "magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567",
        )
        .unwrap();

        let result = client.download(&link, dir.path()).await;
        assert!(matches!(result, Err(SwarmError::ClientUnavailable { .. })));
        assert!(!client.is_available());
    }
}

//! Simulation swarm client for testing and development.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use super::{MagnetLink, SwarmClient, SwarmError};

/// Swarm client that fabricates downloaded files.
///
/// Writes a configurable file set into the destination directory after an
/// optional delay, which is enough to exercise every pipeline path: playable
/// and non-playable file sets, slow downloads for duplicate-request races,
/// and outright failures.
pub struct SimulationSwarmClient {
    files: Vec<String>,
    payload_size: usize,
    delay: Option<Duration>,
    fail: bool,
}

impl SimulationSwarmClient {
    pub fn new() -> Self {
        Self {
            files: vec!["movie.mkv".to_string()],
            payload_size: 1024,
            delay: None,
            fail: false,
        }
    }

    /// Sets the file names the simulated download will produce.
    pub fn with_files(mut self, names: &[&str]) -> Self {
        self.files = names.iter().map(|name| name.to_string()).collect();
        self
    }

    /// Sets how long the simulated transfer takes.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sets the size of each fabricated file in bytes.
    pub fn with_payload_size(mut self, bytes: usize) -> Self {
        self.payload_size = bytes;
        self
    }

    /// Makes every download fail after the configured delay.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl Default for SimulationSwarmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SwarmClient for SimulationSwarmClient {
    async fn download(
        &self,
        link: &MagnetLink,
        dest_dir: &Path,
    ) -> Result<Vec<PathBuf>, SwarmError> {
        tracing::debug!("Simulated download starting for {}", link.info_hash);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail {
            return Err(SwarmError::DownloadFailed {
                reason: "simulated transfer failure".to_string(),
            });
        }

        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(SwarmError::Io)?;

        let mut written = Vec::with_capacity(self.files.len());
        for name in &self.files {
            let path = dest_dir.join(name);
            tokio::fs::write(&path, vec![0u8; self.payload_size])
                .await
                .map_err(SwarmError::Io)?;
            written.push(path);
        }

        tracing::debug!(
            "Simulated download of {} complete: {} file(s)",
            link.info_hash,
            written.len()
        );

        Ok(written)
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn test_link() -> MagnetLink {
        MagnetLink::parse("magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567")
            .unwrap()
    }

    #[tokio::test]
    async fn simulated_download_writes_files() {
        let dir = tempdir().unwrap();
        let client = SimulationSwarmClient::new()
            .with_files(&["movie.mkv", "readme.txt"])
            .with_payload_size(16);

        let files = client.download(&test_link(), dir.path()).await.unwrap();
        assert_eq!(files.len(), 2);
        for file in &files {
            assert_eq!(std::fs::metadata(file).unwrap().len(), 16);
        }
    }

    #[tokio::test]
    async fn failing_client_reports_download_failure() {
        let dir = tempdir().unwrap();
        let client = SimulationSwarmClient::new().failing();

        let result = client.download(&test_link(), dir.path()).await;
        assert!(matches!(result, Err(SwarmError::DownloadFailed { .. })));
    }
}

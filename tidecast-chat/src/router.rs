//! Message routing between the chat transport and the pipeline services.
//!
//! The router owns the inbox loop: it consumes inbound messages, resolves
//! pending catalog-selection prompts, parses commands, and dispatches each
//! accepted command onto its own task so a long acquisition never blocks the
//! inbox.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use tidecast_catalog::{CatalogEntry, CatalogService};
use tidecast_core::engine::AcquireError;
use tidecast_core::{
    AcquisitionEngineHandle, ChatAddress, ChatTransport, MagnetLink, SegmentDelivery,
    TidecastError,
};

use crate::command::{self, Command};

/// A message arriving from the chat transport.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub from: ChatAddress,
    pub body: String,
    /// Group-addressed messages never run commands.
    pub is_group: bool,
}

/// A selection prompt awaiting the requester's next direct message.
///
/// The generation tag lets the timeout arm tell "my prompt is still pending"
/// apart from "a newer prompt replaced mine", so a stale timeout never
/// cancels a fresh prompt.
struct PendingPrompt {
    generation: u64,
    sender: oneshot::Sender<String>,
}

struct RouterInner {
    engine: AcquisitionEngineHandle,
    delivery: SegmentDelivery,
    catalog: CatalogService,
    transport: Arc<dyn ChatTransport>,
    pending: Mutex<HashMap<ChatAddress, PendingPrompt>>,
    prompt_generation: AtomicU64,
    selection_timeout: Duration,
}

/// Routes chat messages to the acquisition engine, delivery and catalog.
#[derive(Clone)]
pub struct ChatRouter {
    inner: Arc<RouterInner>,
}

impl ChatRouter {
    pub fn new(
        engine: AcquisitionEngineHandle,
        delivery: SegmentDelivery,
        catalog: CatalogService,
        transport: Arc<dyn ChatTransport>,
        selection_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                engine,
                delivery,
                catalog,
                transport,
                pending: Mutex::new(HashMap::new()),
                prompt_generation: AtomicU64::new(0),
                selection_timeout,
            }),
        }
    }

    /// Consumes the inbox until the transport closes it.
    pub async fn run(&self, mut inbox: mpsc::Receiver<InboundMessage>) {
        while let Some(message) = inbox.recv().await {
            self.dispatch(message);
        }
        tracing::info!("Inbox closed, chat router stopping");
    }

    /// Handles one inbound message, spawning a task for any accepted command.
    pub fn dispatch(&self, message: InboundMessage) {
        // A pending prompt captures the requester's next direct message
        // whatever it says. If the waiter is already gone (timed out between
        // arrival and here), treat the message as ordinary input instead.
        if !message.is_group {
            let waiter = self.inner.pending.lock().remove(&message.from);
            if let Some(prompt) = waiter {
                if prompt.sender.send(message.body.clone()).is_ok() {
                    return;
                }
            }
        }

        let parsed = match command::parse(&message.body) {
            Some(parsed) => parsed,
            None => return,
        };

        let from = message.from.clone();
        if message.is_group {
            self.spawn_reply(from, "This command can only be used in private messages.");
            return;
        }

        let command = match parsed {
            Ok(command) => command,
            Err(e) => {
                self.spawn_reply(from, &e.to_string());
                return;
            }
        };

        let router = self.clone();
        tokio::spawn(async move {
            match command {
                Command::Download { magnet } => router.handle_download(from, magnet).await,
                Command::Flush { prefix } => router.handle_flush(from, prefix).await,
                Command::GetChunk { file_name } => router.handle_getchunk(from, file_name).await,
                Command::ListMovies => router.handle_listmovies(from).await,
            }
        });
    }

    async fn handle_download(&self, from: ChatAddress, magnet: String) {
        let link = match MagnetLink::parse(&magnet) {
            Ok(link) => link,
            Err(e) => {
                tracing::debug!("Rejected magnet from {}: {}", from, e);
                self.reply(&from, "That does not look like a valid magnet link.")
                    .await;
                return;
            }
        };

        // The pipeline itself notifies the requester of progress and of every
        // failure it sees; the router only speaks up when the engine is gone
        // and nobody else will.
        match self.inner.engine.acquire(link, from.clone()).await {
            Ok(summary) => {
                tracing::info!(
                    "Acquisition for {} finished as session {}",
                    from,
                    summary.session_key
                );
            }
            Err(AcquireError::EngineShutdown) => {
                self.reply(&from, AcquireError::EngineShutdown.user_message())
                    .await;
            }
            Err(e) => {
                tracing::debug!("Acquisition for {} failed: {}", from, e);
            }
        }
    }

    async fn handle_flush(&self, from: ChatAddress, prefix: String) {
        match self.inner.delivery.flush(&prefix).await {
            Ok(deleted) => {
                let body = format!("Deleted {deleted} chunk(s) with prefix {prefix}.");
                self.reply(&from, &body).await;
            }
            Err(e) => {
                tracing::warn!("Flush of {:?} for {} failed: {}", prefix, from, e);
                self.reply(&from, &TidecastError::from(e).user_message())
                    .await;
            }
        }
    }

    async fn handle_getchunk(&self, from: ChatAddress, file_name: String) {
        if let Err(e) = self.inner.delivery.retrieve(&from, &file_name).await {
            tracing::debug!("Chunk request {:?} from {} failed: {}", file_name, from, e);
            self.reply(&from, &TidecastError::from(e).user_message())
                .await;
        }
    }

    async fn handle_listmovies(&self, from: ChatAddress) {
        let entries = match self.inner.catalog.list_movies().await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Catalog listing for {} failed: {}", from, e);
                self.reply(&from, "Failed to fetch the movie list.").await;
                return;
            }
        };

        if entries.is_empty() {
            self.reply(&from, "No movies found.").await;
            return;
        }

        self.reply(&from, &format_listing(&entries)).await;
        self.reply(&from, "Enter the number of the movie to fetch the magnet link:")
            .await;

        let Some(selection) = self.await_selection(&from).await else {
            return;
        };

        let choice = selection.trim().parse::<usize>().ok();
        let entry = choice
            .filter(|n| (1..=entries.len()).contains(n))
            .map(|n| &entries[n - 1]);
        let Some(entry) = entry else {
            self.reply(&from, "Invalid number. Please try again.").await;
            return;
        };

        match self.inner.catalog.magnet_for(&entry.detail_url).await {
            Ok(magnet) => {
                let body = format!(
                    "Magnet link for {} ({}): {}",
                    entry.title, entry.size, magnet
                );
                self.reply(&from, &body).await;
            }
            Err(e) => {
                tracing::warn!("Magnet lookup for {:?} failed: {}", entry.detail_url, e);
                self.reply(&from, "Failed to fetch the magnet link.").await;
            }
        }
    }

    /// Waits for the requester's next direct message, up to the selection
    /// timeout. Returns `None` if the prompt timed out (after telling the
    /// requester) or was superseded by a newer prompt (silently).
    async fn await_selection(&self, from: &ChatAddress) -> Option<String> {
        let generation = self.inner.prompt_generation.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();

        let replaced = self.inner.pending.lock().insert(
            from.clone(),
            PendingPrompt { generation, sender },
        );
        if replaced.is_some() {
            tracing::debug!("Replacing pending selection prompt for {}", from);
        }

        match tokio::time::timeout(self.inner.selection_timeout, receiver).await {
            Ok(Ok(selection)) => Some(selection),
            // Superseded: the newer prompt owns the conversation now.
            Ok(Err(_)) => None,
            Err(_) => {
                // Only clear the entry if it is still ours.
                {
                    let mut pending = self.inner.pending.lock();
                    if pending
                        .get(from)
                        .is_some_and(|p| p.generation == generation)
                    {
                        pending.remove(from);
                    }
                }
                self.reply(from, "Selection timed out.").await;
                None
            }
        }
    }

    async fn reply(&self, to: &ChatAddress, body: &str) {
        if let Err(e) = self.inner.transport.send_text(to, body).await {
            tracing::warn!("Failed to reply to {}: {}", to, e);
        }
    }

    fn spawn_reply(&self, to: ChatAddress, body: &str) {
        let router = self.clone();
        let body = body.to_string();
        tokio::spawn(async move {
            router.reply(&to, &body).await;
        });
    }
}

fn format_listing(entries: &[CatalogEntry]) -> String {
    let mut listing = String::from("Movies found:");
    for (index, entry) in entries.iter().enumerate() {
        listing.push_str(&format!("\n{}. {}", index + 1, entry));
    }
    listing
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::tempdir;

    use tidecast_catalog::providers::MockCatalogProvider;
    use tidecast_core::config::TidecastConfig;
    use tidecast_core::segmenting::SimulationSegmentProcessor;
    use tidecast_core::swarm::SimulationSwarmClient;
    use tidecast_core::transport::ChannelTransport;
    use tidecast_core::spawn_acquisition_engine;

    use super::*;

    struct TestRig {
        router: ChatRouter,
        transport: ChannelTransport,
        _dir: tempfile::TempDir,
    }

    fn test_rig(catalog: CatalogService) -> TestRig {
        let dir = tempdir().unwrap();
        let mut config = TidecastConfig::default();
        config.library.library_dir = dir.path().to_path_buf();

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
            Duration::from_millis(200),
        );
        TestRig {
            router,
            transport,
            _dir: dir,
        }
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
    async fn group_commands_are_rejected() {
        let rig = test_rig(CatalogService::demo());
        rig.router.dispatch(InboundMessage {
            from: ChatAddress::new("room"),
            body: "!listmovies".to_string(),
            is_group: true,
        });
        settle().await;

        let texts = rig.transport.texts_to(&ChatAddress::new("room"));
        assert_eq!(
            texts,
            vec!["This command can only be used in private messages.".to_string()]
        );
    }

    #[tokio::test]
    async fn non_commands_are_ignored() {
        let rig = test_rig(CatalogService::demo());
        rig.router.dispatch(direct("alice", "hello there"));
        rig.router.dispatch(direct("alice", "!frobnicate now"));
        settle().await;
        assert!(rig.transport.sent().is_empty());
    }

    #[tokio::test]
    async fn missing_argument_gets_usage_reply() {
        let rig = test_rig(CatalogService::demo());
        rig.router.dispatch(direct("alice", "!download"));
        settle().await;

        let texts = rig.transport.texts_to(&ChatAddress::new("alice"));
        assert_eq!(texts, vec!["Please provide a torrent magnet link.".to_string()]);
    }

    #[tokio::test]
    async fn invalid_magnet_gets_rejection_reply() {
        let rig = test_rig(CatalogService::demo());
        rig.router.dispatch(direct("alice", "!download not-a-magnet"));
        settle().await;

        let texts = rig.transport.texts_to(&ChatAddress::new("alice"));
        assert_eq!(
            texts,
            vec!["That does not look like a valid magnet link.".to_string()]
        );
    }

    #[tokio::test]
    async fn download_runs_pipeline_and_reports_chunks() {
        let rig = test_rig(CatalogService::demo());
        rig.router.dispatch(direct(
            "alice",
            "!download magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567",
        ));

        let alice = ChatAddress::new("alice");
        for _ in 0..40 {
            settle().await;
            if rig
                .transport
                .texts_to(&alice)
                .iter()
                .any(|t| t.contains("Video chunks created"))
            {
                break;
            }
        }

        let texts = rig.transport.texts_to(&alice);
        assert!(texts.iter().any(|t| t.contains("Download started")));
        assert!(
            texts.iter().any(|t| t.contains("Video chunks created")),
            "got: {texts:?}"
        );
    }

    #[tokio::test]
    async fn flush_reports_deleted_count() {
        let rig = test_rig(CatalogService::demo());
        std::fs::write(rig._dir.path().join("ab12cd-segment-000.mp4"), b"x").unwrap();
        std::fs::write(rig._dir.path().join("ab12cd-segment-001.mp4"), b"x").unwrap();

        rig.router.dispatch(direct("alice", "!flush ab12cd"));
        settle().await;

        let texts = rig.transport.texts_to(&ChatAddress::new("alice"));
        assert_eq!(texts, vec!["Deleted 2 chunk(s) with prefix ab12cd.".to_string()]);
    }

    #[tokio::test]
    async fn getchunk_missing_file_reports_not_found() {
        let rig = test_rig(CatalogService::demo());
        rig.router.dispatch(direct("alice", "!getchunk nope-segment-000.mp4"));
        settle().await;

        let texts = rig.transport.texts_to(&ChatAddress::new("alice"));
        assert_eq!(texts, vec!["Chunk not found!".to_string()]);
    }

    #[tokio::test]
    async fn getchunk_sends_existing_file() {
        let rig = test_rig(CatalogService::demo());
        std::fs::write(rig._dir.path().join("ab12cd-segment-000.mp4"), b"x").unwrap();

        rig.router.dispatch(direct("alice", "!getchunk ab12cd-segment-000.mp4"));
        settle().await;

        let files = rig.transport.files_to(&ChatAddress::new("alice"));
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn listmovies_selection_returns_magnet() {
        let provider = MockCatalogProvider::new()
            .with_entry("First Film", "1.2 GB", "magnet:?xt=urn:btih:aaa")
            .with_entry("Second Film", "700 MB", "magnet:?xt=urn:btih:bbb");
        let rig = test_rig(CatalogService::with_provider(Arc::new(provider)));
        let alice = ChatAddress::new("alice");

        rig.router.dispatch(direct("alice", "!listmovies"));
        settle().await;

        let texts = rig.transport.texts_to(&alice);
        assert!(texts.iter().any(|t| t.contains("1. First Film - 1.2 GB")));
        assert!(texts.iter().any(|t| t.contains("Enter the number")));

        rig.router.dispatch(direct("alice", "2"));
        settle().await;

        let texts = rig.transport.texts_to(&alice);
        assert!(
            texts
                .iter()
                .any(|t| t.contains("Magnet link for Second Film (700 MB): magnet:?xt=urn:btih:bbb")),
            "got: {texts:?}"
        );
    }

    #[tokio::test]
    async fn listmovies_invalid_selection_is_rejected() {
        let provider =
            MockCatalogProvider::new().with_entry("Only Film", "1 GB", "magnet:?xt=urn:btih:aaa");
        let rig = test_rig(CatalogService::with_provider(Arc::new(provider)));
        let alice = ChatAddress::new("alice");

        rig.router.dispatch(direct("alice", "!listmovies"));
        settle().await;
        rig.router.dispatch(direct("alice", "seven"));
        settle().await;

        let texts = rig.transport.texts_to(&alice);
        assert!(texts.iter().any(|t| t == "Invalid number. Please try again."));
    }

    #[tokio::test]
    async fn listmovies_prompt_times_out() {
        let provider =
            MockCatalogProvider::new().with_entry("Only Film", "1 GB", "magnet:?xt=urn:btih:aaa");
        let rig = test_rig(CatalogService::with_provider(Arc::new(provider)));
        let alice = ChatAddress::new("alice");

        rig.router.dispatch(direct("alice", "!listmovies"));
        tokio::time::sleep(Duration::from_millis(400)).await;

        let texts = rig.transport.texts_to(&alice);
        assert!(texts.iter().any(|t| t == "Selection timed out."));

        // The prompt is gone, so a later number is plain chatter.
        rig.router.dispatch(direct("alice", "1"));
        settle().await;
        let texts = rig.transport.texts_to(&alice);
        assert!(!texts.iter().any(|t| t.contains("Magnet link")));
    }

    #[tokio::test]
    async fn empty_catalog_reports_no_movies() {
        let rig = test_rig(CatalogService::with_provider(Arc::new(
            MockCatalogProvider::new(),
        )));
        rig.router.dispatch(direct("alice", "!listmovies"));
        settle().await;

        let texts = rig.transport.texts_to(&ChatAddress::new("alice"));
        assert_eq!(texts, vec!["No movies found.".to_string()]);
    }
}

//! CLI command implementations

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Subcommand;

use tidecast_catalog::CatalogService;
use tidecast_chat::{ChatRouter, ConsoleTransport, spawn_stdin_inbox};
use tidecast_core::config::TidecastConfig;
use tidecast_core::delivery::flush_prefix;
use tidecast_core::segmenting::{
    FfmpegSegmentProcessor, SegmentProcessor, SimulationSegmentProcessor,
};
use tidecast_core::swarm::{Aria2SwarmClient, SimulationSwarmClient, SwarmClient};
use tidecast_core::tracing_setup::{CliLogLevel, init_tracing};
use tidecast_core::transport::{ChatAddress, ChatTransport};
use tidecast_core::spawn_acquisition_engine;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot, reading commands from the console
    Run {
        /// Working directory for downloads and segments
        #[arg(long)]
        library_dir: Option<PathBuf>,

        /// Segment duration in seconds
        #[arg(long)]
        segment_seconds: Option<u32>,

        /// Seconds to wait for a movie-number selection
        #[arg(long)]
        selection_timeout: Option<u64>,

        /// Base URL of the catalog site
        #[arg(long)]
        catalog_url: Option<String>,

        /// Console log level
        #[arg(long, value_enum, default_value = "info")]
        log_level: CliLogLevel,

        /// Use simulated download, segmentation and catalog
        #[arg(long)]
        simulate: bool,
    },

    /// Delete segment files by session-key prefix without starting the bot
    Flush {
        /// Prefix to match against segment file names
        prefix: String,

        /// Working directory holding the segments
        #[arg(long)]
        library_dir: Option<PathBuf>,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run {
            library_dir,
            segment_seconds,
            selection_timeout,
            catalog_url,
            log_level,
            simulate,
        } => {
            let options = RunOptions {
                library_dir,
                segment_seconds,
                selection_timeout,
                catalog_url,
                log_level,
                simulate,
            };
            run_bot(options).await
        }
        Commands::Flush {
            prefix,
            library_dir,
        } => flush_segments(prefix, library_dir).await,
    }
}

struct RunOptions {
    library_dir: Option<PathBuf>,
    segment_seconds: Option<u32>,
    selection_timeout: Option<u64>,
    catalog_url: Option<String>,
    log_level: CliLogLevel,
    simulate: bool,
}

/// Run the bot against the console transport until stdin closes or Ctrl-C.
async fn run_bot(options: RunOptions) -> anyhow::Result<()> {
    init_tracing(options.log_level.as_tracing_level(), None)
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    let mut config = TidecastConfig::from_env();
    if let Some(dir) = options.library_dir {
        config.library.library_dir = dir;
    }
    if let Some(seconds) = options.segment_seconds {
        config.segmenting.segment_seconds = seconds;
    }
    if let Some(seconds) = options.selection_timeout {
        config.chat.selection_timeout = std::time::Duration::from_secs(seconds);
    }
    if let Some(url) = options.catalog_url {
        config.catalog.base_url = url;
    }

    tokio::fs::create_dir_all(&config.library.library_dir)
        .await
        .with_context(|| {
            format!(
                "failed to create library directory {}",
                config.library.library_dir.display()
            )
        })?;

    let (swarm, processor): (Arc<dyn SwarmClient>, Arc<dyn SegmentProcessor>) = if options.simulate
    {
        tracing::info!("Running with simulated swarm and segmentation");
        (
            Arc::new(SimulationSwarmClient::new()),
            Arc::new(SimulationSegmentProcessor::new()),
        )
    } else {
        let swarm = Aria2SwarmClient::new(&config.swarm.client_binary);
        let processor = FfmpegSegmentProcessor::new(&config.segmenting.ffmpeg_binary);
        if !swarm.is_available() {
            tracing::warn!(
                "{} is not available; downloads will fail until it is installed",
                config.swarm.client_binary.display()
            );
        }
        if !processor.is_available() {
            tracing::warn!(
                "{} is not available; segmentation will fail until it is installed",
                config.segmenting.ffmpeg_binary.display()
            );
        }
        (Arc::new(swarm), Arc::new(processor))
    };

    let catalog = if options.simulate {
        CatalogService::demo()
    } else {
        CatalogService::torrent9(&config.catalog.base_url, config.catalog.user_agent)
            .map_err(|e| anyhow::anyhow!("failed to set up the catalog: {e}"))?
    };

    let transport: Arc<dyn ChatTransport> = Arc::new(ConsoleTransport::new());
    let selection_timeout = config.chat.selection_timeout;
    let library_dir = config.library.library_dir.clone();

    let engine = spawn_acquisition_engine(config, swarm, processor, transport.clone());
    let delivery = tidecast_core::SegmentDelivery::new(library_dir, transport.clone());
    let router = ChatRouter::new(
        engine.clone(),
        delivery,
        catalog,
        transport,
        selection_timeout,
    );

    println!("Tidecast ready. Type !download, !getchunk, !flush or !listmovies.");
    let inbox = spawn_stdin_inbox(ChatAddress::new("console"));
    tokio::select! {
        () = router.run(inbox) => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            }
            println!("Shutting down.");
        }
    }

    if let Err(e) = engine.shutdown().await {
        tracing::debug!("Engine already stopped: {}", e);
    }
    Ok(())
}

/// Delete matching segment files and print the count.
async fn flush_segments(prefix: String, library_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let config = TidecastConfig::from_env();
    let dir = library_dir.unwrap_or(config.library.library_dir);

    let deleted = flush_prefix(&dir, &prefix)
        .await
        .with_context(|| format!("failed to flush {} in {}", prefix, dir.display()))?;

    println!("Deleted {deleted} file(s) with prefix {prefix}.");
    Ok(())
}

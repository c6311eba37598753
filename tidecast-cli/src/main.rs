//! Tidecast CLI - Command-line interface
//!
//! Provides command-line access to the Tidecast chat bot and its maintenance
//! operations.

mod commands;

use clap::Parser;

#[derive(Parser)]
#[command(name = "tidecast")]
#[command(about = "A chat bot that downloads, segments and serves media")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    commands::handle_command(cli.command).await
}

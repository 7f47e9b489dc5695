use anyhow::Result;
use clap::{Parser, Subcommand};
use common::init_structured_logging;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod commands;
mod config;
mod storage;

use commands::{IngestArgs, QueryArgs};
use config::FolioConfig;

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Build and query the retrieval corpus behind the portfolio assistant")]
#[command(version)]
struct Cli {
    /// Configuration file (default: ./folio.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use local hash embeddings instead of the embedding endpoint
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Ingest(IngestArgs),
    Query(QueryArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let (mut config, config_path) = FolioConfig::load(cli.config.as_deref())?;
    if cli.offline {
        config = config.offline();
    }

    init_structured_logging(config.logging_config(cli.verbose, cli.json_logs))?;
    match &config_path {
        Some(path) => info!("Using configuration {}", path.display()),
        None => debug!("No configuration file, using defaults"),
    }
    config.validate()?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    match cli.command {
        Commands::Ingest(args) => commands::ingest::run(args, &config, cancel).await,
        Commands::Query(args) => commands::query::run(args, &config, cancel).await,
    }
}

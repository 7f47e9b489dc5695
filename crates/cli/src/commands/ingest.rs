use ai::Embedder;
use anyhow::{Context, Result};
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use retrieval::{ingest_documents, IngestOptions};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::FolioConfig;
use crate::storage;

/// Chunk and embed documents into a corpus file
#[derive(Debug, Args)]
pub struct IngestArgs {
    /// JSON array of documents
    #[arg(short, long)]
    pub documents: PathBuf,

    /// Where to write the corpus
    #[arg(short, long)]
    pub out: PathBuf,

    /// Characters per chunk (200-4000)
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Characters shared by consecutive chunks
    #[arg(long)]
    pub chunk_overlap: Option<usize>,

    /// Texts per embedding batch (1-50)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// One embedding request at a time
    #[arg(long)]
    pub sequential: bool,
}

impl IngestArgs {
    fn options(&self, config: &FolioConfig) -> IngestOptions {
        let mut chunking = config.retrieval.chunking;
        if let Some(chunk_size) = self.chunk_size {
            chunking.chunk_size = chunk_size;
        }
        if let Some(chunk_overlap) = self.chunk_overlap {
            chunking.chunk_overlap = chunk_overlap;
        }

        IngestOptions {
            chunking,
            batch_size: self.batch_size,
            sequential: self.sequential || config.embedding.sequential,
        }
    }
}

pub async fn run(args: IngestArgs, config: &FolioConfig, cancel: CancellationToken) -> Result<()> {
    let documents = storage::read_documents(&args.documents)?;
    let embedder = Embedder::from_config(&config.embedding)?;
    let options = args.options(config);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!(
        "Embedding {} documents with {} provider...",
        documents.len(),
        embedder.provider_name()
    ));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = ingest_documents(&embedder, &documents, options, &cancel).await;
    spinner.finish_and_clear();

    let corpus = result.context("ingestion failed, no corpus written")?;
    storage::write_corpus(&args.out, &corpus)?;

    info!(
        "Wrote {} chunks to {}",
        corpus.len(),
        args.out.display()
    );
    println!(
        "{} {} chunks from {} documents -> {}",
        style("✓").green(),
        corpus.len(),
        documents.len(),
        args.out.display()
    );
    Ok(())
}

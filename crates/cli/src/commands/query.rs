use ai::Embedder;
use anyhow::{bail, Result};
use clap::Args;
use console::style;
use retrieval::{
    query_context, query_context_multi, AssembledContext, CorpusHandle, QueryOptions,
    RetrievalError,
};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::FolioConfig;
use crate::storage;

/// Build prompt context for one or more queries
#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Corpus file written by `folio ingest`
    #[arg(short, long)]
    pub corpus: PathBuf,

    /// Maximum chunks to use (1-50)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Minimum cosine similarity (0-1)
    #[arg(long)]
    pub min_score: Option<f32>,

    /// Character budget for the context (500-20000)
    #[arg(long)]
    pub max_context_chars: Option<usize>,

    /// Print the assembled context as JSON
    #[arg(long)]
    pub json: bool,

    /// Query text; several queries are retrieved separately and merged
    #[arg(required = true)]
    pub queries: Vec<String>,
}

impl QueryArgs {
    fn options(&self, config: &FolioConfig) -> QueryOptions {
        let mut options = QueryOptions::from_config(&config.retrieval);
        if let Some(top_k) = self.top_k {
            options = options.with_top_k(top_k);
        }
        if let Some(min_score) = self.min_score {
            options = options.with_min_score(min_score);
        }
        if let Some(max_context_chars) = self.max_context_chars {
            options = options.with_max_context_chars(max_context_chars);
        }
        options
    }
}

pub async fn run(args: QueryArgs, config: &FolioConfig, cancel: CancellationToken) -> Result<()> {
    let handle = CorpusHandle::new(storage::read_corpus(&args.corpus)?);
    info!(
        "Loaded corpus: {} items, dimension {:?}",
        handle.len(),
        handle.dimension()
    );

    let embedder = Embedder::from_config(&config.embedding)?;
    let options = args.options(config);
    let snapshot = handle.snapshot();

    let result = if args.queries.len() == 1 {
        query_context(&embedder, &args.queries[0], &snapshot, options, &cancel).await
    } else {
        query_context_multi(&embedder, &args.queries, &snapshot, options, &cancel).await
    };

    let assembled = match result {
        Ok(assembled) => assembled,
        Err(e) if e.is_cancelled() => bail!("query cancelled"),
        Err(e) => fallback(e),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&assembled)?);
        return Ok(());
    }

    if assembled.is_empty() {
        println!("{}", style("(no context)").dim());
        return Ok(());
    }

    println!("{}", assembled.context);
    println!();
    println!("{}", style("Used chunks:").bold());
    for chunk in &assembled.used_chunks {
        match chunk.score {
            Some(score) => println!("  {} ({:.4})", chunk.id(), score),
            None => println!("  {}", chunk.id()),
        }
    }
    Ok(())
}

/// A failed query is answered without grounding rather than failing the turn.
fn fallback(err: RetrievalError) -> AssembledContext {
    warn!(error = %err, "Query failed, continuing with empty context");
    eprintln!(
        "{} retrieval failed ({}); continuing without context",
        style("warning:").yellow().bold(),
        err
    );
    AssembledContext::empty()
}

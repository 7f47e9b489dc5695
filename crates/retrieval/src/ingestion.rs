use ai::Embedder;
use common::OperationTimer;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::chunking::{build_chunks_from_documents, ChunkingOptions};
use crate::errors::{Result, RetrievalError};
use crate::types::{Document, EmbeddedChunk};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOptions {
    pub chunking: ChunkingOptions,
    /// Overrides the embedder's batch size
    pub batch_size: Option<usize>,
    /// Force one embedding call at a time
    pub sequential: bool,
}

impl IngestOptions {
    pub fn with_chunking(mut self, chunking: ChunkingOptions) -> Self {
        self.chunking = chunking;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn sequential(mut self, sequential: bool) -> Self {
        self.sequential = sequential;
        self
    }
}

/// Chunk and embed `documents` into a fresh corpus.
///
/// All or nothing: any embedding failure, or cancellation, aborts the whole
/// run and no partial corpus is returned.
#[instrument(skip_all, fields(documents = documents.len()))]
pub async fn ingest_documents(
    embedder: &Embedder,
    documents: &[Document],
    options: IngestOptions,
    cancel: &CancellationToken,
) -> Result<Vec<EmbeddedChunk>> {
    let mut timer = OperationTimer::new("ingest_documents");
    timer.add_field("documents", documents.len());

    let result = run_ingestion(embedder, documents, options, cancel).await;
    if let Ok(corpus) = &result {
        timer.add_field("items_count", corpus.len());
    }
    timer.finish_with_result(&result);
    result
}

async fn run_ingestion(
    embedder: &Embedder,
    documents: &[Document],
    options: IngestOptions,
    cancel: &CancellationToken,
) -> Result<Vec<EmbeddedChunk>> {
    if documents.is_empty() {
        return Err(RetrievalError::EmptyInput("documents"));
    }
    if cancel.is_cancelled() {
        return Err(RetrievalError::Cancelled);
    }

    let chunks = build_chunks_from_documents(documents, options.chunking);
    if chunks.is_empty() {
        return Err(RetrievalError::ChunkingProducedNoOutput);
    }
    info!(
        "Chunked {} documents into {} chunks",
        documents.len(),
        chunks.len()
    );

    let texts: Vec<String> = chunks.iter().map(|chunk| chunk.content.clone()).collect();
    let embedder = if options.sequential {
        embedder.clone().sequential(true)
    } else {
        embedder.clone()
    };

    let embeddings = embedder
        .embed_many_with_cancel(&texts, options.batch_size, cancel)
        .await
        .map_err(RetrievalError::from_embedding)?;

    if embeddings.len() != chunks.len() {
        return Err(RetrievalError::EmbeddingCountMismatch {
            expected: chunks.len(),
            actual: embeddings.len(),
        });
    }

    Ok(chunks
        .into_iter()
        .zip(embeddings)
        .map(|(chunk, embedding)| EmbeddedChunk { chunk, embedding })
        .collect())
}

use ai::Embedder;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::config::RetrievalConfig;
use crate::context::{build_context_from_chunks, AssembledContext, ContextOptions};
use crate::errors::{Result, RetrievalError};
use crate::search::{merge_retrieval_results, retrieve_top_k, SearchOptions};
use crate::types::{QueryPreparation, VectorStoreItem};

/// Per-query knobs; clamped the same way as [`SearchOptions`] and [`ContextOptions`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryOptions {
    pub top_k: usize,
    pub min_score: f32,
    pub max_context_chars: usize,
    pub strict_dimensions: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self::from_parts(SearchOptions::default(), ContextOptions::default())
    }
}

impl QueryOptions {
    pub fn from_parts(search: SearchOptions, context: ContextOptions) -> Self {
        Self {
            top_k: search.top_k,
            min_score: search.min_score,
            max_context_chars: context.max_context_chars,
            strict_dimensions: search.strict_dimensions,
        }
    }

    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self::from_parts(config.search, config.context)
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn with_max_context_chars(mut self, max_context_chars: usize) -> Self {
        self.max_context_chars = max_context_chars;
        self
    }

    fn search_options(&self) -> SearchOptions {
        SearchOptions {
            top_k: self.top_k,
            min_score: self.min_score,
            strict_dimensions: self.strict_dimensions,
        }
        .clamped()
    }

    fn context_options(&self) -> ContextOptions {
        ContextOptions::new(self.max_context_chars).clamped()
    }
}

/// Embed `query` and resolve the clamped options for it.
pub async fn prepare_query(
    embedder: &Embedder,
    query: &str,
    options: QueryOptions,
    cancel: &CancellationToken,
) -> Result<QueryPreparation> {
    if query.trim().is_empty() {
        return Err(RetrievalError::EmptyInput("query"));
    }

    let query_embedding = embedder
        .embed_text_with_cancel(query, cancel)
        .await
        .map_err(RetrievalError::from_embedding)?;

    let search = options.search_options();
    Ok(QueryPreparation {
        query_embedding,
        top_k: search.top_k,
        min_score: search.min_score,
        max_context_chars: options.context_options().max_context_chars,
        strict_dimensions: search.strict_dimensions,
    })
}

/// Rank `corpus` against a prepared query and pack the winners.
///
/// The corpus is borrowed for the duration of the call and never modified.
pub fn build_query_context(
    preparation: &QueryPreparation,
    corpus: &[VectorStoreItem],
) -> Result<AssembledContext> {
    let retrieved = retrieve_top_k(
        &preparation.query_embedding,
        corpus,
        SearchOptions {
            top_k: preparation.top_k,
            min_score: preparation.min_score,
            strict_dimensions: preparation.strict_dimensions,
        },
    )?;
    Ok(build_context_from_chunks(
        &retrieved,
        ContextOptions::new(preparation.max_context_chars),
    ))
}

/// Embed, retrieve and assemble in one call.
#[instrument(skip_all, fields(corpus = corpus.len()))]
pub async fn query_context(
    embedder: &Embedder,
    query: &str,
    corpus: &[VectorStoreItem],
    options: QueryOptions,
    cancel: &CancellationToken,
) -> Result<AssembledContext> {
    let preparation = prepare_query(embedder, query, options, cancel).await?;
    let assembled = build_query_context(&preparation, corpus)?;
    info!(
        "Query context built: {} chunks, {} chars",
        assembled.used_chunks.len(),
        assembled.context.chars().count()
    );
    Ok(assembled)
}

/// Retrieve for each query (e.g. expansions of one question), merge by chunk
/// id keeping the best score, cut to `top_k` and assemble.
///
/// Blank queries are skipped; if none remain the call fails with `EmptyInput`.
#[instrument(skip_all, fields(queries = queries.len(), corpus = corpus.len()))]
pub async fn query_context_multi(
    embedder: &Embedder,
    queries: &[String],
    corpus: &[VectorStoreItem],
    options: QueryOptions,
    cancel: &CancellationToken,
) -> Result<AssembledContext> {
    let queries: Vec<&str> = queries
        .iter()
        .map(String::as_str)
        .filter(|q| !q.trim().is_empty())
        .collect();
    if queries.is_empty() {
        return Err(RetrievalError::EmptyInput("queries"));
    }

    let mut lists = Vec::with_capacity(queries.len());
    for query in &queries {
        let preparation = prepare_query(embedder, query, options, cancel).await?;
        let retrieved = retrieve_top_k(
            &preparation.query_embedding,
            corpus,
            options.search_options(),
        )?;
        debug!("Query {:?} retrieved {} chunks", query, retrieved.len());
        lists.push(retrieved);
    }

    let mut merged = merge_retrieval_results(lists);
    merged.truncate(options.search_options().top_k);

    let assembled = build_context_from_chunks(&merged, options.context_options());
    info!(
        "Multi-query context built: {} queries, {} chunks, {} chars",
        queries.len(),
        assembled.used_chunks.len(),
        assembled.context.chars().count()
    );
    Ok(assembled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai::HashEmbeddingProvider;
    use std::sync::Arc;

    fn embedder() -> Embedder {
        Embedder::new(Arc::new(HashEmbeddingProvider::new(32).unwrap()))
    }

    #[test]
    fn test_default_options_match_component_defaults() {
        let options = QueryOptions::default();
        assert_eq!(options.top_k, 6);
        assert_eq!(options.min_score, 0.0);
        assert_eq!(options.max_context_chars, 5000);
        assert!(!options.strict_dimensions);
    }

    #[tokio::test]
    async fn test_prepare_clamps_options() {
        let options = QueryOptions::default()
            .with_top_k(0)
            .with_min_score(7.0)
            .with_max_context_chars(10);
        let preparation = prepare_query(&embedder(), "rust", options, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(preparation.top_k, 1);
        assert_eq!(preparation.min_score, 1.0);
        assert_eq!(preparation.max_context_chars, 500);
        assert_eq!(preparation.query_embedding.len(), 32);
    }

    #[tokio::test]
    async fn test_blank_query_is_empty_input() {
        let result = prepare_query(
            &embedder(),
            "   ",
            QueryOptions::default(),
            &CancellationToken::new(),
        )
        .await;
        assert!(matches!(result, Err(RetrievalError::EmptyInput("query"))));
    }

    #[tokio::test]
    async fn test_all_blank_queries_rejected() {
        let result = query_context_multi(
            &embedder(),
            &["".to_string(), " ".to_string()],
            &[],
            QueryOptions::default(),
            &CancellationToken::new(),
        )
        .await;
        assert!(matches!(result, Err(RetrievalError::EmptyInput("queries"))));
    }

    #[tokio::test]
    async fn test_empty_corpus_gives_empty_context() {
        let assembled = query_context(
            &embedder(),
            "anything",
            &[],
            QueryOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(assembled.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_query() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = query_context(&embedder(), "rust", &[], QueryOptions::default(), &cancel).await;
        assert!(matches!(result, Err(RetrievalError::Cancelled)));
    }
}

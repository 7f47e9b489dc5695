use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::{clamp_batch_size, EmbeddingConfig, ProviderKind};
use crate::hash_provider::HashEmbeddingProvider;
use crate::provider::EmbeddingProvider;
use crate::{AiError, Result};

/// Turns text into vectors through an [`EmbeddingProvider`].
///
/// Every call is bounded by an optional timeout and can be raced against a
/// [`CancellationToken`]. Batch results always come back in input order.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    timeout: Option<Duration>,
    batch_size: usize,
    sequential: bool,
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("provider", &self.provider.name())
            .field("timeout", &self.timeout)
            .field("batch_size", &self.batch_size)
            .field("sequential", &self.sequential)
            .finish()
    }
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            timeout: None,
            batch_size: clamp_batch_size(None),
            sequential: false,
        }
    }

    /// Build the provider named by `config.provider` and apply its limits.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        config.validate()?;

        // The HTTP provider bounds each attempt itself, so an outer timeout
        // would also swallow its retries.
        let (provider, outer_timeout): (Arc<dyn EmbeddingProvider>, Option<Duration>) =
            match config.provider {
                ProviderKind::Hash => {
                    let provider = HashEmbeddingProvider::new(config.hash_dimension)?;
                    warn!(
                        "Using hash embeddings (dimension: {}), retrieval quality is lexical only",
                        provider.dimension()
                    );
                    (
                        Arc::new(provider) as Arc<dyn EmbeddingProvider>,
                        Some(config.timeout()),
                    )
                }
                #[cfg(feature = "http")]
                ProviderKind::Http => (
                    Arc::new(crate::http_provider::HttpEmbeddingProvider::new(config)?)
                        as Arc<dyn EmbeddingProvider>,
                    None,
                ),
                #[cfg(not(feature = "http"))]
                ProviderKind::Http => {
                    return Err(AiError::Config(
                        "http provider requires the `http` feature".to_string(),
                    ))
                }
            };

        info!(
            "Embedder ready: provider={}, batch_size={}, sequential={}",
            provider.name(),
            config.effective_batch_size(),
            config.sequential
        );

        let mut embedder = Self::new(provider)
            .with_batch_size(config.batch_size)
            .sequential(config.sequential);
        embedder.timeout = outer_timeout;
        Ok(embedder)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Default batch size for [`Embedder::embed_many`], clamped to [1, 50].
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = clamp_batch_size(Some(batch_size));
        self
    }

    /// Embed one text at a time instead of fanning out within a batch.
    pub fn sequential(mut self, sequential: bool) -> Self {
        self.sequential = sequential;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(AiError::EmptyInput("text"));
        }
        self.call_provider(text).await
    }

    pub async fn embed_text_with_cancel(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<f32>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AiError::Cancelled),
            result = self.embed_text(text) => result,
        }
    }

    /// Embed `texts` in batches; see [`Embedder::embed_many_with_cancel`].
    pub async fn embed_many(
        &self,
        texts: &[String],
        batch_size: Option<usize>,
    ) -> Result<Vec<Vec<f32>>> {
        self.embed_many_with_cancel(texts, batch_size, &CancellationToken::new())
            .await
    }

    /// Embed `texts` in batches of `batch_size` (default from the embedder).
    ///
    /// The first failing call fails the whole operation; no partial result is
    /// returned. Vector `i` belongs to `texts[i]`.
    #[instrument(skip(self, texts, cancel), fields(provider = %self.provider.name(), count = texts.len()))]
    pub async fn embed_many_with_cancel(
        &self,
        texts: &[String],
        batch_size: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Err(AiError::EmptyInput("texts"));
        }

        let batch_size = batch_size
            .map(|size| clamp_batch_size(Some(size)))
            .unwrap_or(self.batch_size);
        let mut embeddings = Vec::with_capacity(texts.len());

        for (batch_index, batch) in texts.chunks(batch_size).enumerate() {
            if cancel.is_cancelled() {
                debug!("Cancelled before batch {}", batch_index);
                return Err(AiError::Cancelled);
            }

            let vectors = if self.sequential {
                let mut vectors = Vec::with_capacity(batch.len());
                for text in batch {
                    vectors.push(self.embed_text_with_cancel(text, cancel).await?);
                }
                vectors
            } else {
                try_join_all(
                    batch
                        .iter()
                        .map(|text| self.embed_text_with_cancel(text, cancel)),
                )
                .await?
            };

            if vectors.len() != batch.len() {
                return Err(AiError::EmbeddingCountMismatch {
                    expected: batch.len(),
                    actual: vectors.len(),
                });
            }

            debug!("Batch {} embedded ({} texts)", batch_index, batch.len());
            embeddings.extend(vectors);
        }

        if embeddings.len() != texts.len() {
            return Err(AiError::EmbeddingCountMismatch {
                expected: texts.len(),
                actual: embeddings.len(),
            });
        }

        Ok(embeddings)
    }

    async fn call_provider(&self, text: &str) -> Result<Vec<f32>> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.provider.embed(text))
                .await
                .map_err(|_| AiError::Timeout {
                    after_ms: limit.as_millis() as u64,
                })?,
            None => self.provider.embed(text).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_embedder() -> Embedder {
        Embedder::new(Arc::new(HashEmbeddingProvider::new(32).unwrap()))
    }

    #[tokio::test]
    async fn test_blank_text_is_empty_input() {
        let embedder = hash_embedder();
        assert!(matches!(
            embedder.embed_text("  \n\t").await,
            Err(AiError::EmptyInput("text"))
        ));
    }

    #[tokio::test]
    async fn test_empty_batch_is_empty_input() {
        let embedder = hash_embedder();
        assert!(matches!(
            embedder.embed_many(&[], None).await,
            Err(AiError::EmptyInput("texts"))
        ));
    }

    #[tokio::test]
    async fn test_embed_many_matches_single_calls() {
        let embedder = hash_embedder();
        let texts = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
        let many = embedder.embed_many(&texts, Some(2)).await.unwrap();
        assert_eq!(many.len(), 3);
        for (text, vector) in texts.iter().zip(&many) {
            assert_eq!(&embedder.embed_text(text).await.unwrap(), vector);
        }
    }

    #[test]
    fn test_batch_size_is_clamped() {
        assert_eq!(hash_embedder().with_batch_size(0).batch_size(), 1);
        assert_eq!(hash_embedder().with_batch_size(99).batch_size(), 50);
        assert_eq!(hash_embedder().batch_size(), 10);
    }

    #[test]
    fn test_from_config_hash_provider() {
        let config = EmbeddingConfig {
            provider: ProviderKind::Hash,
            hash_dimension: 8,
            batch_size: 3,
            ..Default::default()
        };
        let embedder = Embedder::from_config(&config).unwrap();
        assert_eq!(embedder.provider_name(), "hash");
        assert_eq!(embedder.batch_size(), 3);
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_from_config_http_leaves_timeout_to_provider() {
        let config = EmbeddingConfig {
            endpoint: "http://127.0.0.1:9/embed".to_string(),
            timeout_ms: 300,
            max_retries: 2,
            ..Default::default()
        };
        let embedder = Embedder::from_config(&config).unwrap();
        assert_eq!(embedder.provider_name(), "http");
        assert_eq!(embedder.timeout, None);

        let hash = Embedder::from_config(&EmbeddingConfig {
            provider: ProviderKind::Hash,
            timeout_ms: 300,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(hash.timeout, Some(Duration::from_millis(300)));
    }
}

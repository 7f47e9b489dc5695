use async_trait::async_trait;
use std::sync::Arc;

use crate::Result;

/// Narrow contract with an external embedding service: one text in, one vector out.
///
/// Implementations must be safe to call concurrently; the [`crate::Embedder`]
/// issues up to `batch_size` calls at once.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Short identifier used in logs
    fn name(&self) -> &str;
}

#[async_trait]
impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for Arc<P> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

//! Text embedding for the retrieval pipeline.
//!
//! [`Embedder`] wraps an [`EmbeddingProvider`] with batching, timeouts and
//! cancellation. Two providers ship with the crate: an HTTP client for a
//! remote embedding service and a deterministic hash provider for offline use.

pub mod config;
pub mod embeddings;
pub mod errors;
pub mod hash_provider;
#[cfg(feature = "http")]
pub mod http_provider;
pub mod provider;
pub mod retry;

pub use config::{
    clamp_batch_size, EmbeddingConfig, ProviderKind, DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE,
    MIN_BATCH_SIZE,
};
pub use embeddings::Embedder;
pub use errors::AiError;
pub use hash_provider::HashEmbeddingProvider;
#[cfg(feature = "http")]
pub use http_provider::HttpEmbeddingProvider;
pub use provider::EmbeddingProvider;
pub use retry::RetryPolicy;

pub type Result<T> = std::result::Result<T, AiError>;

use ai::AiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrievalError {
    /// No documents, texts or query supplied
    #[error("Empty input: {0}")]
    EmptyInput(&'static str),

    #[error("Chunking produced no output: every document normalized to empty text")]
    ChunkingProducedNoOutput,

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding count mismatch: expected {expected}, got {actual}")]
    EmbeddingCountMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Embedding(#[from] AiError),

    #[error("Operation cancelled")]
    Cancelled,
}

impl RetrievalError {
    /// Provider responded with an error, failed in transport, or timed out.
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            RetrievalError::Embedding(AiError::Provider { .. } | AiError::Timeout { .. })
        )
    }

    /// Like `From<AiError>` but folds embedder cancellation into [`RetrievalError::Cancelled`].
    pub(crate) fn from_embedding(err: AiError) -> Self {
        match err {
            AiError::Cancelled => RetrievalError::Cancelled,
            other => RetrievalError::Embedding(other),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            RetrievalError::Cancelled | RetrievalError::Embedding(AiError::Cancelled)
        )
    }
}

pub type Result<T> = std::result::Result<T, RetrievalError>;

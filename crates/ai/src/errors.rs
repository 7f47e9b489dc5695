use thiserror::Error;

/// Errors produced while turning text into vectors.
#[derive(Debug, Error)]
pub enum AiError {
    /// Blank text or an empty batch
    #[error("Empty input: {0}")]
    EmptyInput(&'static str),

    /// Non-success response or failed network call from the provider
    #[error("Embedding provider error{}: {message}", status_suffix(.status))]
    Provider {
        status: Option<u16>,
        message: String,
    },

    #[error("Embedding request timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("Embedding cancelled")]
    Cancelled,

    /// Provider or transport returned a different number of vectors than inputs
    #[error("Embedding count mismatch: expected {expected}, got {actual}")]
    EmbeddingCountMismatch { expected: usize, actual: usize },

    #[error("Config error: {0}")]
    Config(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

impl AiError {
    pub fn provider(status: Option<u16>, message: impl Into<String>) -> Self {
        AiError::Provider {
            status,
            message: message.into(),
        }
    }

    /// 429, 5xx and transport-level failures
    pub fn is_transient(&self) -> bool {
        match self {
            AiError::Provider { status: None, .. } => true,
            AiError::Provider {
                status: Some(code), ..
            } => *code == 429 || (500..600).contains(code),
            AiError::Timeout { .. } => true,
            _ => false,
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for AiError {
    fn from(e: reqwest::Error) -> Self {
        AiError::Provider {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

impl From<common::ConfigError> for AiError {
    fn from(e: common::ConfigError) -> Self {
        AiError::Config(e.to_string())
    }
}

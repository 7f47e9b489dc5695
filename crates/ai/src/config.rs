use common::{ConfigError, ConfigLoader};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const MIN_BATCH_SIZE: usize = 1;
pub const MAX_BATCH_SIZE: usize = 50;

/// Which provider backs the embedder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Remote `{text} -> {embedding}` endpoint
    Http,
    /// Deterministic local vectors, no network
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: ProviderKind,
    /// Full URL of the embedding endpoint
    pub endpoint: String,
    /// Sent as a bearer token when present
    pub api_key: Option<String>,
    /// Forwarded in the request body when present
    pub model: Option<String>,
    /// Per-call timeout
    pub timeout_ms: u64,
    /// Texts per batch; also the in-flight limit within a batch
    pub batch_size: usize,
    /// One call at a time, in input order
    pub sequential: bool,
    /// Retries for transient provider failures (0 = fail on first error)
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    /// Vector length of the hash provider
    pub hash_dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Http,
            endpoint: "http://127.0.0.1:8080/embed".to_string(),
            api_key: None,
            model: None,
            timeout_ms: 30_000,
            batch_size: DEFAULT_BATCH_SIZE,
            sequential: false,
            max_retries: 0,
            retry_base_delay_ms: 250,
            hash_dimension: 256,
        }
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// `batch_size` clamped to [1, 50].
    pub fn effective_batch_size(&self) -> usize {
        clamp_batch_size(Some(self.batch_size))
    }

    /// Apply `<PREFIX>_EMBEDDING_*` environment overrides.
    pub fn apply_env(&mut self, loader: &ConfigLoader) -> Result<(), ConfigError> {
        if let Some(provider) = loader.env_var("EMBEDDING_PROVIDER") {
            self.provider = match provider.to_lowercase().as_str() {
                "http" => ProviderKind::Http,
                "hash" => ProviderKind::Hash,
                other => {
                    return Err(ConfigError::invalid(
                        "embedding.provider",
                        other,
                        "expected `http` or `hash`",
                    ))
                }
            };
        }
        if let Some(endpoint) = loader.env_var("EMBEDDING_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(api_key) = loader.env_var("EMBEDDING_API_KEY") {
            self.api_key = Some(api_key);
        }
        if let Some(model) = loader.env_var("EMBEDDING_MODEL") {
            self.model = Some(model);
        }
        if let Some(timeout_ms) = loader.env_parse("EMBEDDING_TIMEOUT_MS")? {
            self.timeout_ms = timeout_ms;
        }
        if let Some(batch_size) = loader.env_parse("EMBEDDING_BATCH_SIZE")? {
            self.batch_size = batch_size;
        }
        if let Some(max_retries) = loader.env_parse("EMBEDDING_MAX_RETRIES")? {
            self.max_retries = max_retries;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider == ProviderKind::Http {
            let endpoint = self.endpoint.trim();
            if endpoint.is_empty() {
                return Err(ConfigError::invalid(
                    "embedding.endpoint",
                    "\"\"",
                    "endpoint is required for the http provider",
                ));
            }
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(ConfigError::invalid(
                    "embedding.endpoint",
                    endpoint,
                    "must be an http(s) URL",
                ));
            }
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "embedding.timeout_ms",
                0,
                "timeout must be greater than 0",
            ));
        }
        if self.provider == ProviderKind::Hash && self.hash_dimension == 0 {
            return Err(ConfigError::invalid(
                "embedding.hash_dimension",
                0,
                "dimension must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Default 10, clamped to [1, 50].
pub fn clamp_batch_size(batch_size: Option<usize>) -> usize {
    batch_size
        .unwrap_or(DEFAULT_BATCH_SIZE)
        .clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = EmbeddingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.effective_batch_size(), 10);
    }

    #[test]
    fn test_clamp_batch_size() {
        assert_eq!(clamp_batch_size(None), 10);
        assert_eq!(clamp_batch_size(Some(0)), 1);
        assert_eq!(clamp_batch_size(Some(500)), 50);
        assert_eq!(clamp_batch_size(Some(7)), 7);
    }

    #[test]
    fn test_http_provider_requires_url() {
        let config = EmbeddingConfig {
            endpoint: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EmbeddingConfig {
            endpoint: "localhost:8080".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_hash_provider_ignores_endpoint() {
        let config = EmbeddingConfig {
            provider: ProviderKind::Hash,
            endpoint: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EmbeddingConfig =
            toml_from("provider = \"hash\"\nhash_dimension = 64\n");
        assert_eq!(config.provider, ProviderKind::Hash);
        assert_eq!(config.hash_dimension, 64);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_env_overrides() {
        let loader = ConfigLoader::new("x").with_env_prefix("AI_CONFIG_TEST");
        std::env::set_var("AI_CONFIG_TEST_EMBEDDING_PROVIDER", "hash");
        std::env::set_var("AI_CONFIG_TEST_EMBEDDING_BATCH_SIZE", "4");

        let mut config = EmbeddingConfig::default();
        config.apply_env(&loader).unwrap();
        assert_eq!(config.provider, ProviderKind::Hash);
        assert_eq!(config.batch_size, 4);

        std::env::set_var("AI_CONFIG_TEST_EMBEDDING_PROVIDER", "grpc");
        assert!(config.apply_env(&loader).is_err());

        std::env::remove_var("AI_CONFIG_TEST_EMBEDDING_PROVIDER");
        std::env::remove_var("AI_CONFIG_TEST_EMBEDDING_BATCH_SIZE");
    }

    fn toml_from(content: &str) -> EmbeddingConfig {
        ConfigLoader::parse(
            content,
            common::ConfigFormat::Toml,
            std::path::Path::new("inline.toml"),
        )
        .unwrap()
    }
}

use ai::{EmbeddingConfig, ProviderKind};
use anyhow::{Context, Result};
use common::{ConfigLoader, LoggingConfig};
use retrieval::RetrievalConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::Level;

pub const APP_NAME: &str = "folio";

/// Contents of `folio.toml` (or `.json` / `.yaml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `error`, `warn`, `info`, `debug` or `trace`
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl FolioConfig {
    /// File (explicit or discovered), then `FOLIO_*` environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        Self::load_with(&ConfigLoader::new(APP_NAME), explicit)
    }

    pub fn load_with(loader: &ConfigLoader, explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let (mut config, path): (FolioConfig, _) = loader.load(explicit)?;

        config
            .embedding
            .apply_env(loader)
            .context("invalid embedding environment override")?;
        config
            .retrieval
            .apply_env(loader)
            .context("invalid retrieval environment override")?;
        if let Some(level) = loader.env_var("LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok((config, path))
    }

    /// Switch to the hash provider; no network access needed.
    pub fn offline(mut self) -> Self {
        self.embedding.provider = ProviderKind::Hash;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.embedding.validate()?;
        self.retrieval.validate()?;
        Ok(())
    }

    pub fn logging_config(&self, verbose: bool, json: bool) -> LoggingConfig {
        let level = if verbose {
            Level::DEBUG
        } else {
            self.logging.level.parse().unwrap_or(Level::INFO)
        };
        LoggingConfig::default()
            .with_level(level)
            .json(json || self.logging.json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigLoader::new(APP_NAME)
            .with_search_paths(vec![dir.path().to_path_buf()])
            .with_env_prefix("FOLIO_CLI_TEST_DEFAULTS");

        let (config, path) = FolioConfig::load_with(&loader, None).unwrap();
        assert!(path.is_none());
        assert_eq!(config.embedding.provider, ProviderKind::Http);
        assert_eq!(config.retrieval.search.top_k, 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_then_env() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("folio.toml"),
            r#"
[embedding]
provider = "hash"
hash_dimension = 64

[retrieval.search]
top_k = 4

[logging]
level = "warn"
"#,
        )
        .unwrap();

        let loader = ConfigLoader::new(APP_NAME)
            .with_search_paths(vec![dir.path().to_path_buf()])
            .with_env_prefix("FOLIO_CLI_TEST_FILE");
        std::env::set_var("FOLIO_CLI_TEST_FILE_TOP_K", "9");

        let (config, path) = FolioConfig::load_with(&loader, None).unwrap();
        std::env::remove_var("FOLIO_CLI_TEST_FILE_TOP_K");

        assert_eq!(path.unwrap(), dir.path().join("folio.toml"));
        assert_eq!(config.embedding.provider, ProviderKind::Hash);
        assert_eq!(config.embedding.hash_dimension, 64);
        assert_eq!(config.retrieval.search.top_k, 9);
        assert_eq!(config.logging_config(false, false).level, Level::WARN);
        assert_eq!(config.logging_config(true, false).level, Level::DEBUG);
    }

    #[test]
    fn test_offline_ignores_endpoint() {
        let mut config = FolioConfig::default();
        config.embedding.endpoint = String::new();
        assert!(config.validate().is_err());
        assert!(config.offline().validate().is_ok());
    }
}

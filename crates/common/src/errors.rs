use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} config {path}: {reason}")]
    Parse {
        path: PathBuf,
        format: &'static str,
        reason: String,
    },

    #[error("Invalid value for {config_key}: {value} ({reason})")]
    InvalidValue {
        config_key: String,
        value: String,
        reason: String,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    pub fn invalid(
        config_key: impl Into<String>,
        value: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        ConfigError::InvalidValue {
            config_key: config_key.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

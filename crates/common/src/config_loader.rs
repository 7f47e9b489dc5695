//! Configuration file discovery and parsing.
//!
//! Sources, lowest priority first:
//! - `Default` of the target type
//! - the first configuration file found (explicit path, `./<app>.toml`,
//!   then `<config dir>/<app>/<app>.toml`)
//! - environment variables `<PREFIX>_<KEY>`, applied by the caller through
//!   [`ConfigLoader::env_var`] / [`ConfigLoader::env_parse`]

use serde::de::DeserializeOwned;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use crate::errors::{ConfigError, ConfigResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Format by file extension; unknown extensions are treated as TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => ConfigFormat::Json,
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Toml,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Json => "JSON",
            ConfigFormat::Yaml => "YAML",
        }
    }
}

pub struct ConfigLoader {
    search_paths: Vec<PathBuf>,
    file_stem: String,
    env_prefix: String,
}

impl ConfigLoader {
    /// Loader for `app_name`; environment prefix is the upper-cased name.
    pub fn new(app_name: &str) -> Self {
        let mut search_paths = vec![PathBuf::from(".")];
        if let Some(config_dir) = dirs::config_dir() {
            search_paths.push(config_dir.join(app_name));
        }

        Self {
            search_paths,
            file_stem: app_name.to_string(),
            env_prefix: app_name.to_uppercase(),
        }
    }

    pub fn with_search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.search_paths = paths;
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn env_prefix(&self) -> &str {
        &self.env_prefix
    }

    pub fn find_configuration_file(&self) -> Option<PathBuf> {
        let candidates = ["toml", "json", "yaml", "yml"];
        for dir in &self.search_paths {
            for ext in candidates {
                let path = dir.join(format!("{}.{}", self.file_stem, ext));
                if path.is_file() {
                    return Some(path);
                }
            }
        }
        None
    }

    /// Load `T` from `explicit` if given, else from the first discovered file,
    /// else `T::default()`. Returns the path that was used, if any.
    pub fn load<T>(&self, explicit: Option<&Path>) -> ConfigResult<(T, Option<PathBuf>)>
    where
        T: DeserializeOwned + Default,
    {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => self.find_configuration_file(),
        };

        match path {
            Some(path) => {
                let config = Self::load_from_file(&path)?;
                debug!("Loaded configuration from {}", path.display());
                Ok((config, Some(path)))
            }
            None => {
                debug!("No configuration file found, using defaults");
                Ok((T::default(), None))
            }
        }
    }

    pub fn load_from_file<T: DeserializeOwned>(path: &Path) -> ConfigResult<T> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, ConfigFormat::from_path(path), path)
    }

    pub fn parse<T: DeserializeOwned>(
        content: &str,
        format: ConfigFormat,
        path: &Path,
    ) -> ConfigResult<T> {
        let parse_error = |reason: String| ConfigError::Parse {
            path: path.to_path_buf(),
            format: format.name(),
            reason,
        };

        match format {
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string())),
            ConfigFormat::Json => {
                serde_json::from_str(content).map_err(|e| parse_error(e.to_string()))
            }
            ConfigFormat::Yaml => {
                serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))
            }
        }
    }

    /// Raw value of `<PREFIX>_<KEY>`; empty values count as unset.
    pub fn env_var(&self, key: &str) -> Option<String> {
        env::var(format!("{}_{}", self.env_prefix, key))
            .ok()
            .filter(|v| !v.trim().is_empty())
    }

    pub fn env_parse<V>(&self, key: &str) -> ConfigResult<Option<V>>
    where
        V: FromStr,
        V::Err: std::fmt::Display,
    {
        match self.env_var(key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<V>().map(Some).map_err(|e| {
                ConfigError::invalid(format!("{}_{}", self.env_prefix, key), &raw, e.to_string())
            }),
        }
    }
}

use common::{ConfigError, ConfigLoader};
use serde::{Deserialize, Serialize};

use crate::chunking::ChunkingOptions;
use crate::context::ContextOptions;
use crate::search::SearchOptions;

/// Retrieval tuning. Out-of-range values are clamped where they are used,
/// so only values that cannot be clamped are rejected here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub chunking: ChunkingOptions,
    pub search: SearchOptions,
    pub context: ContextOptions,
}

impl RetrievalConfig {
    /// Apply `<PREFIX>_CHUNK_SIZE`, `_CHUNK_OVERLAP`, `_TOP_K`, `_MIN_SCORE`,
    /// `_MAX_CONTEXT_CHARS` and `_STRICT_DIMENSIONS`.
    pub fn apply_env(&mut self, loader: &ConfigLoader) -> Result<(), ConfigError> {
        if let Some(chunk_size) = loader.env_parse("CHUNK_SIZE")? {
            self.chunking.chunk_size = chunk_size;
        }
        if let Some(chunk_overlap) = loader.env_parse("CHUNK_OVERLAP")? {
            self.chunking.chunk_overlap = chunk_overlap;
        }
        if let Some(top_k) = loader.env_parse("TOP_K")? {
            self.search.top_k = top_k;
        }
        if let Some(min_score) = loader.env_parse("MIN_SCORE")? {
            self.search.min_score = min_score;
        }
        if let Some(strict) = loader.env_parse("STRICT_DIMENSIONS")? {
            self.search.strict_dimensions = strict;
        }
        if let Some(max_context_chars) = loader.env_parse("MAX_CONTEXT_CHARS")? {
            self.context.max_context_chars = max_context_chars;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.search.min_score.is_finite() {
            return Err(ConfigError::invalid(
                "search.min_score",
                self.search.min_score,
                "must be a finite number",
            ));
        }
        Ok(())
    }
}

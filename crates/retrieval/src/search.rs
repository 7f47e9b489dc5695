use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

use crate::errors::{Result, RetrievalError};
use crate::types::{RetrievedChunk, VectorStoreItem};

pub const DEFAULT_TOP_K: usize = 6;
pub const MIN_TOP_K: usize = 1;
pub const MAX_TOP_K: usize = 50;
pub const DEFAULT_MIN_SCORE: f32 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub top_k: usize,
    /// Items scoring below this are dropped
    pub min_score: f32,
    /// Fail on differing vector lengths instead of comparing the common prefix
    pub strict_dimensions: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            min_score: DEFAULT_MIN_SCORE,
            strict_dimensions: false,
        }
    }
}

impl SearchOptions {
    /// `top_k` into [1, 50], `min_score` into [0, 1].
    pub fn clamped(self) -> Self {
        let min_score = if self.min_score.is_nan() {
            DEFAULT_MIN_SCORE
        } else {
            self.min_score.clamp(0.0, 1.0)
        };
        Self {
            top_k: self.top_k.clamp(MIN_TOP_K, MAX_TOP_K),
            min_score,
            strict_dimensions: self.strict_dimensions,
        }
    }
}

/// Cosine similarity over the common prefix of `a` and `b`.
///
/// Returns 0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (&x, &y) in a[..len].iter().zip(&b[..len]) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0) as f32
}

/// Like [`cosine_similarity`] but rejects vectors of different length.
pub fn cosine_similarity_checked(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(RetrievalError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(cosine_similarity(a, b))
}

/// Score every item against `query`, keep those at or above `min_score`,
/// and return the best `top_k`, highest first.
///
/// Equal scores keep corpus order. `items` is only read.
pub fn retrieve_top_k(
    query: &[f32],
    items: &[VectorStoreItem],
    options: SearchOptions,
) -> Result<Vec<RetrievedChunk>> {
    let options = options.clamped();
    let mut scored: Vec<(usize, f32)> = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let score = if options.strict_dimensions {
            cosine_similarity_checked(query, &item.embedding)?
        } else {
            cosine_similarity(query, &item.embedding)
        };
        if !score.is_nan() && score >= options.min_score {
            scored.push((index, score));
        }
    }

    // stable: ties stay in corpus order
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(options.top_k);

    debug!(
        "Retrieved {} of {} items (top_k={}, min_score={})",
        scored.len(),
        items.len(),
        options.top_k,
        options.min_score
    );

    Ok(scored
        .into_iter()
        .map(|(index, score)| RetrievedChunk::new(items[index].chunk.clone(), score))
        .collect())
}

/// Merge ranked lists, keeping one entry per chunk id with its highest score.
///
/// Output is sorted by score, highest first; ties keep the order in which
/// ids first appeared across `lists`.
pub fn merge_retrieval_results<I>(lists: I) -> Vec<RetrievedChunk>
where
    I: IntoIterator,
    I::Item: IntoIterator<Item = RetrievedChunk>,
{
    let mut merged: Vec<RetrievedChunk> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for list in lists {
        for candidate in list {
            match positions.get(candidate.id()).copied() {
                Some(position) => {
                    if candidate.rank_score() > merged[position].rank_score() {
                        merged[position] = candidate;
                    }
                }
                None => {
                    positions.insert(candidate.id().to_string(), merged.len());
                    merged.push(candidate);
                }
            }
        }
    }

    sort_by_score_desc(&mut merged);
    merged
}

/// Stable sort, highest score first, unscored last.
pub(crate) fn sort_by_score_desc(chunks: &mut [RetrievedChunk]) {
    chunks.sort_by(|a, b| {
        b.rank_score()
            .partial_cmp(&a.rank_score())
            .unwrap_or(Ordering::Equal)
    });
}

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::provider::EmbeddingProvider;
use crate::{AiError, Result};

/// Deterministic offline embeddings.
///
/// Each lower-cased word is hashed to a bucket and a sign (feature hashing),
/// so texts sharing vocabulary get a positive cosine similarity. Texts with no
/// word characters fall back to a vector derived from the whole-text digest.
/// Vectors are L2-normalised. Not a semantic model.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dimension: usize,
}

impl HashEmbeddingProvider {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(AiError::Config(
                "hash embedding dimension must be greater than 0".to_string(),
            ));
        }
        debug!("Hash embedding provider created (dimension: {})", dimension);
        Ok(Self { dimension })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimension];
        let mut tokens = 0usize;

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let bucket = u64::from_le_bytes(digest_prefix(&digest)) as usize % self.dimension;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
            tokens += 1;
        }

        if tokens == 0 {
            let digest = Sha256::digest(text.as_bytes());
            for (i, value) in embedding.iter_mut().enumerate() {
                let byte = digest[i % digest.len()] as f32;
                *value = ((byte - 127.5) / 127.5).tanh();
            }
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 1e-6 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

fn digest_prefix(digest: &[u8]) -> [u8; 8] {
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    prefix
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn name(&self) -> &str {
        "hash"
    }
}

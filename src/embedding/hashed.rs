//! Deterministic bag-of-words embeddings for offline development and tests.

use super::{EmbeddingClient, EmbeddingClientError, EmbeddingPurpose};
use async_trait::async_trait;

/// Embedding client that hashes lowercase word tokens into a fixed number of buckets.
///
/// Texts sharing vocabulary land close together under L2 distance, which is enough to exercise
/// retrieval without a model provider.
pub struct HashedEmbeddingClient {
    dimension: usize,
    model_id: String,
}

impl HashedEmbeddingClient {
    /// Construct a client producing vectors of `dimension` components.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            model_id: format!("hashed-bow-{dimension}"),
        }
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let bucket = fnv1a(&token.to_lowercase()) as usize % self.dimension;
            embedding[bucket] += 1.0;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();

        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

impl Default for HashedEmbeddingClient {
    fn default() -> Self {
        Self::new(256)
    }
}

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

#[async_trait]
impl EmbeddingClient for HashedEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
        _purpose: EmbeddingPurpose,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if self.dimension == 0 {
            return Err(EmbeddingClientError::GenerationFailed(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }
        Ok(texts.iter().map(|text| self.encode(text)).collect())
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

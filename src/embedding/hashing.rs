//! Feature-hashing bag-of-words embedder.

use super::EmbeddingModel;
use crate::error::KbResult;
use crate::vector::{VectorDimension, normalize_vector};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Deterministic embedder that hashes lowercased word tokens into a
/// fixed number of buckets and L2-normalizes the result.
///
/// Texts sharing vocabulary get a high cosine similarity. No model files,
/// no network, same output on every platform.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: VectorDimension,
    model_id: String,
}

impl HashingEmbedder {
    #[must_use]
    pub fn new(dimension: VectorDimension) -> Self {
        Self {
            dimension,
            model_id: format!("hashing-bow-{dimension}"),
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let dim = self.dimension.get();
        let mut vector = vec![0.0f32; dim];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let hash = fnv1a(&token.to_lowercase());
            let bucket = (hash % dim as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        normalize_vector(&mut vector);
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(VectorDimension::dimension_384())
    }
}

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

impl EmbeddingModel for HashingEmbedder {
    fn encode(&self, texts: &[&str]) -> KbResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

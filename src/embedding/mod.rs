//! Embedding model adapters.
//!
//! The knowledge base only sees the [`EmbeddingModel`] trait. Two
//! implementations ship with the crate:
//!
//! - [`FastEmbedModel`]: ONNX sentence-transformer models through fastembed
//! - [`HashingEmbedder`]: a dependency-free feature-hashing model, used for
//!   tests, benchmarks and offline operation

mod fastembed;
mod hashing;

pub use self::fastembed::{FastEmbedModel, parse_model_name, supported_models};
pub use hashing::HashingEmbedder;

use crate::error::{KbResult, KnowledgeBaseError};
use crate::vector::VectorDimension;

/// Trait for turning texts into fixed-dimension vectors.
///
/// Implementations must be thread-safe. `dimension` and `model_id` are
/// constant for the lifetime of an instance.
pub trait EmbeddingModel: Send + Sync {
    /// Encode a batch of texts, one vector per input, in input order.
    ///
    /// An empty batch yields an empty result without touching the backend.
    ///
    /// # Errors
    /// Returns `Model` when the backend fails.
    fn encode(&self, texts: &[&str]) -> KbResult<Vec<Vec<f32>>>;

    /// Dimension of every vector this model produces.
    fn dimension(&self) -> VectorDimension;

    /// Stable identifier recorded next to the vectors it produced.
    fn model_id(&self) -> &str;

    /// Encode a single text.
    fn encode_one(&self, text: &str) -> KbResult<Vec<f32>> {
        self.encode(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| KnowledgeBaseError::Model {
                model_id: self.model_id().to_string(),
                reason: "backend returned no vector".to_string(),
            })
    }
}

/// Check that a backend returned one vector of the right size per input.
pub(crate) fn validate_batch(
    model_id: &str,
    dimension: VectorDimension,
    inputs: usize,
    vectors: &[Vec<f32>],
) -> KbResult<()> {
    if vectors.len() != inputs {
        return Err(KnowledgeBaseError::Model {
            model_id: model_id.to_string(),
            reason: format!("expected {inputs} vectors, backend returned {}", vectors.len()),
        });
    }
    for vector in vectors {
        dimension.validate_vector(vector)?;
    }
    Ok(())
}

//! Type-safe wrappers for embedding vectors.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{KbResult, KnowledgeBaseError};

/// Dimension of all-MiniLM-L6-v2 and the other small sentence-transformer models.
pub const VECTOR_DIMENSION_384: usize = 384;

/// Type-safe wrapper for vector dimensions.
///
/// A dimension is never zero; every vector in a store shares one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VectorDimension(usize);

impl VectorDimension {
    /// Creates a new `VectorDimension` with validation.
    ///
    /// Returns a `Configuration` error if the dimension is zero.
    pub fn new(dim: usize) -> KbResult<Self> {
        if dim == 0 {
            return Err(KnowledgeBaseError::Configuration {
                reason: "vector dimension cannot be zero".to_string(),
            });
        }
        Ok(Self(dim))
    }

    /// Creates a standard 384-dimensional vector dimension.
    #[must_use]
    pub const fn dimension_384() -> Self {
        Self(VECTOR_DIMENSION_384)
    }

    /// Returns the underlying dimension value.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }

    /// Validates that a vector has the expected dimension.
    pub fn validate_vector(&self, vector: &[f32]) -> KbResult<()> {
        if vector.len() != self.0 {
            return Err(KnowledgeBaseError::DimensionMismatch {
                expected: self.0,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for VectorDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//! Error types for the knowledge base core
//!
//! This module provides structured error types using thiserror for better
//! error handling and actionable error messages.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for chunking, embedding, storage and search operations
#[derive(Error, Debug)]
pub enum KnowledgeBaseError {
    /// Invalid chunking or knowledge base parameters, raised at construction time
    #[error("Invalid configuration: {reason}\nSuggestion: Fix the [chunking] or [embedding] settings")]
    Configuration { reason: String },

    /// Embedding backend failure
    #[error(
        "Embedding model '{model_id}' failed: {reason}\nSuggestion: Retry the operation or reduce the batch size"
    )]
    Model { model_id: String, reason: String },

    #[error(
        "Vector dimension mismatch: expected {expected}, got {actual}\nSuggestion: Ensure all vectors use the same embedding model"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(
        "Embedding model mismatch: store holds vectors from '{expected}', batch was produced by '{actual}'\nSuggestion: Clear the store or switch back to the original model"
    )]
    ModelMismatch { expected: String, actual: String },

    #[error("Batch length mismatch: {segments} segments but {vectors} vectors")]
    BatchLengthMismatch { segments: usize, vectors: usize },

    #[error("Invalid segment: {reason}")]
    InvalidSegment { reason: String },

    /// Malformed persisted data. The in-memory state is left untouched.
    #[error("Store file '{path}' is corrupted: {reason}\nSuggestion: Rebuild the knowledge base from its documents")]
    CorruptStore { path: PathBuf, reason: String },

    #[error("Store file '{path}' does not exist")]
    StoreNotFound { path: PathBuf },

    #[error("Failed to persist store to '{path}': {source}")]
    Persistence {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl KnowledgeBaseError {
    /// Get a stable status code for this error type.
    pub fn status_code(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Model { .. } => "MODEL_ERROR",
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::ModelMismatch { .. } => "MODEL_MISMATCH",
            Self::BatchLengthMismatch { .. } => "BATCH_LENGTH_MISMATCH",
            Self::InvalidSegment { .. } => "INVALID_SEGMENT",
            Self::CorruptStore { .. } => "CORRUPT_STORE",
            Self::StoreNotFound { .. } => "STORE_NOT_FOUND",
            Self::Persistence { .. } => "PERSISTENCE_ERROR",
        }
    }

    /// Whether the caller may reasonably retry the failed operation as-is.
    ///
    /// Only embedding backend failures qualify; the core never retries them itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Model { .. })
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Configuration { .. } => vec![
                "chunk_overlap must be smaller than chunk_size",
                "Valid strategies are 'simple' and 'context_aware'",
            ],
            Self::Model { .. } => vec![
                "The store was not modified, the batch can be retried",
                "Check that the model files are cached and memory is available",
            ],
            Self::DimensionMismatch { .. } | Self::ModelMismatch { .. } => vec![
                "A store only holds vectors from one embedding model",
                "Call clear() before switching models, then re-ingest documents",
            ],
            Self::CorruptStore { .. } => vec![
                "The previously loaded knowledge base is still in memory",
                "Re-ingest the documents and save to a fresh file",
            ],
            Self::StoreNotFound { .. } => vec!["Save the knowledge base before loading it"],
            Self::Persistence { .. } => vec![
                "Check disk space and permissions for the store directory",
                "The previous store file, if any, was left intact",
            ],
            _ => vec![],
        }
    }
}

pub type KbResult<T> = Result<T, KnowledgeBaseError>;

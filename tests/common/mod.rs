//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use litkb::{
    ChunkingConfig, ChunkingProfile, Document, EmbeddingModel, HashingEmbedder, KbResult,
    KnowledgeBase, KnowledgeBaseError, StrategyKind, VectorDimension,
};
use std::sync::Arc;
use tempfile::TempDir;

pub const SCHRODINGER: &str = r"The Schrödinger equation is $$i\hbar\partial_t\psi = H\psi$$. It describes quantum evolution.";
pub const NEWTON: &str = "Classical mechanics uses Newton's laws.";

pub fn profile(strategy: StrategyKind, chunk_size: usize, overlap: usize) -> ChunkingProfile {
    ChunkingProfile {
        strategy,
        config: ChunkingConfig::new(chunk_size, overlap).expect("valid chunking config"),
    }
}

/// Context-aware knowledge base with 20-word chunks and the hashing model.
pub fn small_kb() -> KnowledgeBase {
    KnowledgeBase::with_strategy(
        profile(StrategyKind::ContextAware, 20, 5),
        Arc::new(HashingEmbedder::default()),
    )
    .expect("knowledge base")
}

pub fn physics_documents() -> Vec<Document> {
    vec![
        Document::new(SCHRODINGER, "papers/schrodinger.pdf", "literature"),
        Document::new(NEWTON, "papers/newton.pdf", "literature"),
    ]
}

/// `count` distinct sentences, numbered from zero.
pub fn numbered_sentences(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("Sentence number {i} talks about topic {i}."))
        .collect()
}

pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

/// Hashing model reporting a different model id.
pub struct RenamedModel {
    inner: HashingEmbedder,
    id: String,
}

impl RenamedModel {
    pub fn new(id: &str) -> Self {
        Self {
            inner: HashingEmbedder::default(),
            id: id.to_string(),
        }
    }
}

impl EmbeddingModel for RenamedModel {
    fn encode(&self, texts: &[&str]) -> KbResult<Vec<Vec<f32>>> {
        self.inner.encode(texts)
    }

    fn dimension(&self) -> VectorDimension {
        self.inner.dimension()
    }

    fn model_id(&self) -> &str {
        &self.id
    }
}

/// Model whose backend always fails.
pub struct FailingModel;

impl EmbeddingModel for FailingModel {
    fn encode(&self, _texts: &[&str]) -> KbResult<Vec<Vec<f32>>> {
        Err(KnowledgeBaseError::Model {
            model_id: "failing".to_string(),
            reason: "resource exhausted".to_string(),
        })
    }

    fn dimension(&self) -> VectorDimension {
        VectorDimension::dimension_384()
    }

    fn model_id(&self) -> &str {
        "failing"
    }
}

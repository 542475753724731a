//! Retrieval core for a research-literature assistant: document chunking,
//! an embedding store with file persistence, and similarity search.

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod knowledge_base;
pub mod logging;
pub mod search;
pub mod store;
pub mod types;
pub mod vector;

// Explicit exports for better API clarity
pub use chunking::{
    Chunk, ChunkingConfig, ChunkingProfile, ChunkingStrategy, ContextAwareStrategy,
    SimpleStrategy, StrategyKind, available_strategies, create_strategy,
};
pub use config::Settings;
pub use document::{Document, SkipReason};
pub use embedding::{EmbeddingModel, FastEmbedModel, HashingEmbedder};
pub use error::{KbResult, KnowledgeBaseError};
pub use knowledge_base::{
    IngestionSummary, KnowledgeBase, KnowledgeBaseState, KnowledgeBaseStatistics, LoadReport,
    SkippedDocument,
};
pub use search::{Relevance, SearchEngine, SearchFilter, SearchRequest, SearchResult};
pub use store::{StoreStatistics, VectorStore};
pub use types::{ChunkPosition, PendingSegment, SectionType, Segment, SegmentId, StructuralTags};
pub use vector::{VectorDimension, cosine_similarity};

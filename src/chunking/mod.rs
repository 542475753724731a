//! Text chunking strategies.
//!
//! A [`ChunkingStrategy`] turns the text of one document into an ordered list
//! of [`Chunk`]s. Two implementations are registered by name:
//!
//! - `simple`: fixed word windows with a word overlap
//! - `context_aware`: sentence, equation and section aware packing
//!
//! All sizes are counted in whitespace-delimited words.

mod context_aware;
mod detect;
mod simple;

pub use context_aware::ContextAwareStrategy;
pub use detect::{detect_citations, detect_equations, find_equation_regions};
pub use simple::SimpleStrategy;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{KbResult, KnowledgeBaseError};
use crate::types::StructuralTags;

/// Confidence assigned to a chunk made from text below `min_chunk_size`.
pub const SHORT_TEXT_CONFIDENCE: f32 = 0.5;

/// One chunk produced by a strategy, before provenance is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    pub tags: StructuralTags,
    pub confidence: f32,
}

impl Chunk {
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Size parameters shared by every strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk length in words
    pub chunk_size: usize,

    /// Words shared between consecutive chunks
    pub chunk_overlap: usize,

    /// Texts shorter than this become a single low-confidence chunk
    pub min_chunk_size: usize,

    /// Hard ceiling before a single sentence is force-split
    pub max_chunk_size: usize,

    /// Detect section headings and tag chunks with their section
    pub section_awareness: bool,
}

impl ChunkingConfig {
    /// Create a validated config, deriving `min_chunk_size` (a tenth of the
    /// target) and `max_chunk_size` (twice the target).
    ///
    /// # Errors
    /// Returns `Configuration` if `chunk_overlap >= chunk_size` or `chunk_size` is zero.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> KbResult<Self> {
        let config = Self {
            chunk_size,
            chunk_overlap,
            min_chunk_size: (chunk_size / 10).max(1),
            max_chunk_size: chunk_size.saturating_mul(2),
            section_awareness: true,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_min_chunk_size(mut self, min_chunk_size: usize) -> KbResult<Self> {
        self.min_chunk_size = min_chunk_size;
        self.validate()?;
        Ok(self)
    }

    pub fn with_max_chunk_size(mut self, max_chunk_size: usize) -> KbResult<Self> {
        self.max_chunk_size = max_chunk_size;
        self.validate()?;
        Ok(self)
    }

    pub fn with_section_awareness(mut self, enabled: bool) -> Self {
        self.section_awareness = enabled;
        self
    }

    /// Check the size relationships between the parameters.
    pub fn validate(&self) -> KbResult<()> {
        let reason = if self.chunk_size == 0 {
            "chunk_size must be greater than zero".to_string()
        } else if self.chunk_overlap >= self.chunk_size {
            format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )
        } else if self.min_chunk_size > self.chunk_size {
            format!(
                "min_chunk_size ({}) must not exceed chunk_size ({})",
                self.min_chunk_size, self.chunk_size
            )
        } else if self.chunk_size > self.max_chunk_size {
            format!(
                "chunk_size ({}) must not exceed max_chunk_size ({})",
                self.chunk_size, self.max_chunk_size
            )
        } else {
            return Ok(());
        };

        Err(KnowledgeBaseError::Configuration { reason })
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            min_chunk_size: 100,
            max_chunk_size: 2000,
            section_awareness: true,
        }
    }
}

/// Contract shared by all chunking strategies.
///
/// Implementations must be deterministic: identical text and configuration
/// always yield identical chunk boundaries. Blank input yields no chunks.
pub trait ChunkingStrategy: Send + Sync {
    /// Registry name of the strategy.
    fn kind(&self) -> StrategyKind;

    fn config(&self) -> &ChunkingConfig;

    /// Split `text` into ordered chunks.
    fn chunk(&self, text: &str) -> Vec<Chunk>;

    fn profile(&self) -> ChunkingProfile {
        ChunkingProfile {
            strategy: self.kind(),
            config: *self.config(),
        }
    }
}

/// Names under which strategies can be selected from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    Simple,
    ContextAware,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 2] = [StrategyKind::Simple, StrategyKind::ContextAware];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Simple => "simple",
            StrategyKind::ContextAware => "context_aware",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = KnowledgeBaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "simple" => Ok(StrategyKind::Simple),
            "context_aware" | "contextaware" => Ok(StrategyKind::ContextAware),
            other => Err(KnowledgeBaseError::Configuration {
                reason: format!(
                    "unknown chunking strategy '{other}', available: {}",
                    available_strategies().join(", ")
                ),
            }),
        }
    }
}

/// Strategy name plus parameters, recorded alongside persisted vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingProfile {
    pub strategy: StrategyKind,
    pub config: ChunkingConfig,
}

impl ChunkingProfile {
    pub fn build(&self) -> KbResult<Box<dyn ChunkingStrategy>> {
        build_strategy(self.strategy, self.config)
    }
}

impl Default for ChunkingProfile {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::ContextAware,
            config: ChunkingConfig::default(),
        }
    }
}

/// Create a strategy by its configuration name.
///
/// # Errors
/// Returns `Configuration` for unknown names or invalid parameters.
pub fn create_strategy(name: &str, config: ChunkingConfig) -> KbResult<Box<dyn ChunkingStrategy>> {
    build_strategy(name.parse()?, config)
}

fn build_strategy(kind: StrategyKind, config: ChunkingConfig) -> KbResult<Box<dyn ChunkingStrategy>> {
    Ok(match kind {
        StrategyKind::Simple => Box::new(SimpleStrategy::new(config)?),
        StrategyKind::ContextAware => Box::new(ContextAwareStrategy::new(config)?),
    })
}

/// Names accepted by [`create_strategy`].
pub fn available_strategies() -> Vec<&'static str> {
    StrategyKind::ALL.iter().map(StrategyKind::as_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        assert!(ChunkingConfig::new(100, 20).is_ok());

        for overlap in [100, 150] {
            match ChunkingConfig::new(100, overlap) {
                Err(KnowledgeBaseError::Configuration { reason }) => {
                    assert!(reason.contains("chunk_overlap"));
                }
                other => panic!("Expected Configuration error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        assert!(ChunkingConfig::new(0, 0).is_err());
    }

    #[test]
    fn test_derived_sizes() {
        let config = ChunkingConfig::new(20, 5).unwrap();
        assert_eq!(config.min_chunk_size, 2);
        assert_eq!(config.max_chunk_size, 40);

        assert!(config.with_max_chunk_size(10).is_err());
        assert!(config.with_min_chunk_size(30).is_err());
    }

    #[test]
    fn test_registry_by_name() {
        let config = ChunkingConfig::new(50, 10).unwrap();

        let simple = create_strategy("simple", config).unwrap();
        assert_eq!(simple.kind(), StrategyKind::Simple);

        let aware = create_strategy("context-aware", config).unwrap();
        assert_eq!(aware.kind(), StrategyKind::ContextAware);
        assert_eq!(aware.profile().config, config);

        assert!(create_strategy("semantic", config).is_err());
        assert_eq!(available_strategies(), vec!["simple", "context_aware"]);
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let config = ChunkingConfig {
            chunk_overlap: 1000,
            ..ChunkingConfig::default()
        };
        assert!(create_strategy("simple", config).is_err());
        assert!(create_strategy("context_aware", config).is_err());
    }
}

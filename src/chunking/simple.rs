//! Fixed-width word windows.

use super::detect::word_spans;
use super::{Chunk, ChunkingConfig, ChunkingStrategy, SHORT_TEXT_CONFIDENCE, StrategyKind};
use crate::error::KbResult;
use crate::types::StructuralTags;

/// Greedy windows of `chunk_size` words, each starting `chunk_overlap` words
/// before the previous one ended. The last window may be shorter.
///
/// Chunk texts are slices of the input, so inner whitespace is preserved.
#[derive(Debug, Clone)]
pub struct SimpleStrategy {
    config: ChunkingConfig,
}

impl SimpleStrategy {
    pub fn new(config: ChunkingConfig) -> KbResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl ChunkingStrategy for SimpleStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Simple
    }

    fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    fn chunk(&self, text: &str) -> Vec<Chunk> {
        let words = word_spans(text);
        if words.is_empty() {
            return Vec::new();
        }

        let confidence = if words.len() < self.config.min_chunk_size {
            SHORT_TEXT_CONFIDENCE
        } else {
            1.0
        };

        let step = self.config.chunk_size - self.config.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.config.chunk_size).min(words.len());
            chunks.push(Chunk {
                text: text[words[start].start..words[end - 1].end].to_string(),
                tags: StructuralTags::default(),
                confidence,
            });
            if end == words.len() {
                break;
            }
            start += step;
        }
        chunks
    }
}

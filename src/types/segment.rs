//! Retrievable text segments and their provenance.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{ChunkPosition, SegmentId, StructuralTags};
use crate::error::{KbResult, KnowledgeBaseError};

/// A chunk that has been produced for a document but not yet stored.
///
/// The store assigns the [`SegmentId`] when the chunk is appended.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSegment {
    source_path: PathBuf,
    source_label: String,
    text: String,
    position: ChunkPosition,
    tags: StructuralTags,
    confidence: f32,
}

impl PendingSegment {
    /// Create a pending segment with default tags and full confidence.
    ///
    /// # Errors
    /// Returns `InvalidSegment` if `text` is blank.
    pub fn new(
        source_path: impl Into<PathBuf>,
        source_label: impl Into<String>,
        text: impl Into<String>,
        position: ChunkPosition,
    ) -> KbResult<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(KnowledgeBaseError::InvalidSegment {
                reason: "segment text must not be empty".to_string(),
            });
        }

        Ok(Self {
            source_path: source_path.into(),
            source_label: source_label.into(),
            text,
            position,
            tags: StructuralTags::default(),
            confidence: 1.0,
        })
    }

    pub fn with_tags(mut self, tags: StructuralTags) -> Self {
        self.tags = tags;
        self
    }

    /// Set the boundary-quality estimate, clamped to [0, 1].
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn into_segment(self, id: SegmentId) -> Segment {
        Segment {
            id,
            source_path: self.source_path,
            source_label: self.source_label,
            text: self.text,
            position: self.position,
            tags: self.tags,
            confidence: self.confidence,
        }
    }
}

/// An immutable unit of retrievable text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    id: SegmentId,
    source_path: PathBuf,
    source_label: String,
    text: String,
    position: ChunkPosition,
    tags: StructuralTags,
    confidence: f32,
}

impl Segment {
    pub fn id(&self) -> SegmentId {
        self.id
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn source_label(&self) -> &str {
        &self.source_label
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn position(&self) -> ChunkPosition {
        self.position
    }

    pub fn tags(&self) -> &StructuralTags {
        &self.tags
    }

    /// Boundary-quality estimate in [0, 1].
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// File name of the source document, falling back to the full path.
    pub fn file_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_path.display().to_string())
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// Check the invariants a stored segment must satisfy.
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.text.trim().is_empty() {
            return Err(format!("segment {} has empty text", self.id));
        }
        if self.position.index >= self.position.total {
            return Err(format!(
                "segment {} has position {}/{}",
                self.id, self.position.index, self.position.total
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!(
                "segment {} has confidence {} outside [0, 1]",
                self.id, self.confidence
            ));
        }
        Ok(())
    }
}

//! Candidate filters applied before top-k selection.

use crate::error::{KbResult, KnowledgeBaseError};
use crate::types::{SectionType, Segment};

/// Confidence a segment must exceed to count as well bounded.
pub const HIGH_CONFIDENCE: f32 = 0.8;

/// Predicate over stored segments. Every set field must match; an empty
/// filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    /// Keep segments whose source label is one of these
    pub source_labels: Option<Vec<String>>,
    pub has_equations: Option<bool>,
    pub has_citations: Option<bool>,
    /// Keep segments tagged with one of these sections
    pub section_types: Option<Vec<SectionType>>,
    /// Keep segments whose confidence is strictly above this
    pub confidence_above: Option<f32>,
    /// Drop candidates scoring below this cosine similarity
    pub min_similarity: Option<f32>,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only segments containing mathematical content.
    pub fn equations() -> Self {
        Self::new().with_equations(true)
    }

    /// Only segments containing citation markers.
    pub fn citations() -> Self {
        Self::new().with_citations(true)
    }

    /// Only segments with clean sentence boundaries.
    pub fn high_confidence() -> Self {
        Self::new().with_confidence_above(HIGH_CONFIDENCE)
    }

    /// Preset by name: `equations`, `citations` or `high_confidence`.
    ///
    /// # Errors
    /// Returns `Configuration` for other names.
    pub fn for_context_type(context_type: &str) -> KbResult<Self> {
        match context_type.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "equations" => Ok(Self::equations()),
            "citations" => Ok(Self::citations()),
            "high_confidence" => Ok(Self::high_confidence()),
            other => Err(KnowledgeBaseError::Configuration {
                reason: format!(
                    "unknown context type '{other}', expected equations, citations or high_confidence"
                ),
            }),
        }
    }

    pub fn with_label(self, label: impl Into<String>) -> Self {
        self.with_labels([label])
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_labels
            .get_or_insert_with(Vec::new)
            .extend(labels.into_iter().map(Into::into));
        self
    }

    pub fn with_equations(mut self, has_equations: bool) -> Self {
        self.has_equations = Some(has_equations);
        self
    }

    pub fn with_citations(mut self, has_citations: bool) -> Self {
        self.has_citations = Some(has_citations);
        self
    }

    pub fn with_sections(mut self, sections: impl IntoIterator<Item = SectionType>) -> Self {
        self.section_types
            .get_or_insert_with(Vec::new)
            .extend(sections);
        self
    }

    pub fn with_confidence_above(mut self, confidence: f32) -> Self {
        self.confidence_above = Some(confidence);
        self
    }

    pub fn with_min_similarity(mut self, similarity: f32) -> Self {
        self.min_similarity = Some(similarity);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether a segment passes the structural part of the filter.
    pub fn matches(&self, segment: &Segment) -> bool {
        let tags = segment.tags();

        if let Some(labels) = &self.source_labels {
            if !labels.iter().any(|label| label == segment.source_label()) {
                return false;
            }
        }
        if self
            .has_equations
            .is_some_and(|wanted| tags.has_equations() != wanted)
        {
            return false;
        }
        if self
            .has_citations
            .is_some_and(|wanted| tags.has_citations() != wanted)
        {
            return false;
        }
        if let Some(sections) = &self.section_types {
            if !tags
                .section_type
                .is_some_and(|section| sections.contains(&section))
            {
                return false;
            }
        }
        if self
            .confidence_above
            .is_some_and(|threshold| segment.confidence() <= threshold)
        {
            return false;
        }
        true
    }

    /// Whether a similarity score passes `min_similarity`.
    pub fn accepts_score(&self, score: f32) -> bool {
        self.min_similarity.is_none_or(|min| score >= min)
    }
}

//! In-memory vector store with atomic file persistence.
//!
//! Segments and their vectors are kept in two parallel vectors in insertion
//! order. Because ids are handed out by a monotonic counter, insertion order
//! is also id order, which lets lookups by id use binary search.

mod persist;

pub use persist::{FORMAT_VERSION, StoreMetadata};

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::chunking::ChunkingProfile;
use crate::error::{KbResult, KnowledgeBaseError};
use crate::types::{PendingSegment, Segment, SegmentCounter, SegmentId};
use crate::vector::VectorDimension;

/// Aggregate numbers describing the store contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStatistics {
    pub total_segments: usize,
    pub segments_per_label: BTreeMap<String, usize>,
    pub average_words: f64,
    pub dimension: Option<usize>,
    pub model_id: Option<String>,
    pub documents: usize,
    pub equation_segments: usize,
    pub citation_segments: usize,
    pub average_confidence: f64,
}

/// One source document as seen through its stored segments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub source_path: PathBuf,
    pub source_label: String,
    pub segments: usize,
    pub words: usize,
}

/// Per-label totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceSummary {
    pub documents: usize,
    pub segments: usize,
    pub words: usize,
}

/// Ordered segment records plus one vector per segment.
#[derive(Debug, Clone, Default)]
pub struct VectorStore {
    segments: Vec<Segment>,
    vectors: Vec<Vec<f32>>,
    dimension: Option<VectorDimension>,
    model_id: Option<String>,
    counter: SegmentCounter,
    profile: ChunkingProfile,
}

impl VectorStore {
    pub fn new(profile: ChunkingProfile) -> Self {
        Self {
            profile,
            ..Self::default()
        }
    }

    /// Append a batch, assigning consecutive ids in batch order.
    ///
    /// The first non-empty batch fixes the store's dimension and model id.
    /// Every check happens before anything is written, so a rejected batch
    /// leaves the store unchanged.
    ///
    /// # Errors
    /// - `BatchLengthMismatch` if the two inputs differ in length
    /// - `DimensionMismatch` if any vector disagrees with the store dimension
    /// - `ModelMismatch` if `model_id` differs from the store's model
    pub fn append(
        &mut self,
        segments: Vec<PendingSegment>,
        vectors: Vec<Vec<f32>>,
        model_id: &str,
    ) -> KbResult<Vec<SegmentId>> {
        if segments.len() != vectors.len() {
            return Err(KnowledgeBaseError::BatchLengthMismatch {
                segments: segments.len(),
                vectors: vectors.len(),
            });
        }
        if segments.is_empty() {
            return Ok(Vec::new());
        }

        let dimension = match self.dimension {
            Some(dimension) => dimension,
            None => VectorDimension::new(vectors[0].len())?,
        };
        for vector in &vectors {
            dimension.validate_vector(vector)?;
        }

        if let Some(expected) = &self.model_id {
            if expected != model_id {
                return Err(KnowledgeBaseError::ModelMismatch {
                    expected: expected.clone(),
                    actual: model_id.to_string(),
                });
            }
        }

        let exhausted = |next: u32| KnowledgeBaseError::InvalidSegment {
            reason: format!("segment id space exhausted at {next} ids"),
        };
        if !self.counter.has_room_for(segments.len()) {
            return Err(exhausted(self.counter.peek()));
        }

        let mut ids = Vec::with_capacity(segments.len());
        for (pending, vector) in segments.into_iter().zip(vectors) {
            let id = self
                .counter
                .next_id()
                .ok_or_else(|| exhausted(self.counter.peek()))?;
            self.segments.push(pending.into_segment(id));
            self.vectors.push(vector);
            ids.push(id);
        }

        self.dimension = Some(dimension);
        if self.model_id.is_none() {
            self.model_id = Some(model_id.to_string());
        }

        debug!(
            "Appended {} segments (ids {}..={})",
            ids.len(),
            ids[0],
            ids[ids.len() - 1]
        );
        Ok(ids)
    }

    /// Empty the store and reset the id counter. The chunking profile is kept.
    pub fn clear(&mut self) {
        self.segments.clear();
        self.vectors.clear();
        self.dimension = None;
        self.model_id = None;
        self.counter.reset();
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    /// Segments paired with their vectors, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&Segment, &[f32])> {
        self.segments
            .iter()
            .zip(self.vectors.iter().map(Vec::as_slice))
    }

    pub fn get(&self, id: SegmentId) -> Option<&Segment> {
        self.segments
            .binary_search_by_key(&id, Segment::id)
            .ok()
            .map(|index| &self.segments[index])
    }

    pub fn dimension(&self) -> Option<VectorDimension> {
        self.dimension
    }

    pub fn model_id(&self) -> Option<&str> {
        self.model_id.as_deref()
    }

    pub fn profile(&self) -> &ChunkingProfile {
        &self.profile
    }

    pub fn set_profile(&mut self, profile: ChunkingProfile) {
        self.profile = profile;
    }

    /// The id the next appended segment will receive.
    pub fn next_id(&self) -> SegmentId {
        SegmentId(self.counter.peek())
    }

    pub fn statistics(&self) -> StoreStatistics {
        let mut segments_per_label: BTreeMap<String, usize> = BTreeMap::new();
        let mut total_words = 0usize;
        let mut total_confidence = 0.0f64;
        let mut equation_segments = 0;
        let mut citation_segments = 0;

        for segment in &self.segments {
            *segments_per_label
                .entry(segment.source_label().to_string())
                .or_default() += 1;
            total_words += segment.word_count();
            total_confidence += f64::from(segment.confidence());
            if segment.tags().has_equations() {
                equation_segments += 1;
            }
            if segment.tags().has_citations() {
                citation_segments += 1;
            }
        }

        let count = self.segments.len();
        let average = |total: f64| if count == 0 { 0.0 } else { total / count as f64 };

        StoreStatistics {
            total_segments: count,
            segments_per_label,
            average_words: average(total_words as f64),
            dimension: self.dimension.map(|d| d.get()),
            model_id: self.model_id.clone(),
            documents: self.documents(None).len(),
            equation_segments,
            citation_segments,
            average_confidence: average(total_confidence),
        }
    }

    /// Segments of one source document, in chunk order.
    pub fn document_segments(&self, source_path: &Path) -> Vec<&Segment> {
        self.segments
            .iter()
            .filter(|segment| segment.source_path() == source_path)
            .collect()
    }

    /// Documents in order of first ingestion, optionally restricted to a label.
    pub fn documents(&self, label: Option<&str>) -> Vec<DocumentSummary> {
        let mut summaries: Vec<DocumentSummary> = Vec::new();
        let mut index_of: BTreeMap<(&Path, &str), usize> = BTreeMap::new();

        for segment in &self.segments {
            if label.is_some_and(|wanted| wanted != segment.source_label()) {
                continue;
            }
            let key = (segment.source_path(), segment.source_label());
            let index = *index_of.entry(key).or_insert_with(|| {
                summaries.push(DocumentSummary {
                    source_path: segment.source_path().to_path_buf(),
                    source_label: segment.source_label().to_string(),
                    segments: 0,
                    words: 0,
                });
                summaries.len() - 1
            });
            summaries[index].segments += 1;
            summaries[index].words += segment.word_count();
        }
        summaries
    }

    /// Document, segment and word totals per source label.
    pub fn source_summary(&self) -> BTreeMap<String, SourceSummary> {
        let mut summary: BTreeMap<String, SourceSummary> = BTreeMap::new();
        for document in self.documents(None) {
            let entry = summary.entry(document.source_label).or_default();
            entry.documents += 1;
            entry.segments += document.segments;
            entry.words += document.words;
        }
        summary
    }

    /// Write the store to `path` atomically.
    ///
    /// # Errors
    /// Returns `Persistence` if the file cannot be written; an existing file
    /// at `path` is left intact in that case.
    pub fn save(&self, path: &Path) -> KbResult<()> {
        persist::save(self, path)?;
        info!("Saved {} segments to {}", self.len(), path.display());
        Ok(())
    }

    /// Replace the store contents with the file at `path`.
    ///
    /// When `pinned` is set, a store of another dimension is rejected.
    /// Any failure leaves the current contents untouched.
    ///
    /// # Errors
    /// `StoreNotFound`, `CorruptStore`, `DimensionMismatch` or `Persistence`.
    pub fn load(&mut self, path: &Path, pinned: Option<VectorDimension>) -> KbResult<StoreMetadata> {
        let (loaded, metadata) = persist::load(path, pinned)?;
        *self = loaded;
        info!(
            "Loaded {} segments from {} (model {})",
            metadata.segments,
            path.display(),
            metadata.model_id.as_deref().unwrap_or("none")
        );
        Ok(metadata)
    }
}

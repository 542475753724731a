//! Ingestion and query orchestration.
//!
//! A [`KnowledgeBase`] owns one chunking strategy, one embedding model and
//! one [`VectorStore`]. Documents are chunked one after another, every
//! resulting segment is embedded in a single batch, and the batch is
//! appended in document order. Search delegates to [`SearchEngine`].

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::chunking::{Chunk, ChunkingProfile, ChunkingStrategy, StrategyKind};
use crate::config::{SearchSettings, Settings, StoreSettings};
use crate::document::{Document, SkipReason};
use crate::embedding::EmbeddingModel;
use crate::error::KbResult;
use crate::search::{SearchEngine, SearchFilter, SearchRequest, SearchResult};
use crate::store::{DocumentSummary, SourceSummary, StoreStatistics, VectorStore};
use crate::types::{ChunkPosition, PendingSegment, Segment};

/// Whether the knowledge base holds anything searchable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KnowledgeBaseState {
    Empty,
    Populated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDocument {
    pub source_path: PathBuf,
    pub reason: SkipReason,
}

/// Outcome of one [`KnowledgeBase::add_documents`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestionSummary {
    pub documents_processed: usize,
    pub documents_skipped: usize,
    pub segments_added: usize,
    pub skipped: Vec<SkippedDocument>,
}

/// Store statistics plus ingestion-time metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeBaseStatistics {
    pub store: StoreStatistics,
    pub chunking_strategy: String,
    /// Strategy and sizes used for documents added from now on
    pub profile: ChunkingProfile,
    pub embedding_model: String,
    pub state: KnowledgeBaseState,
}

/// What [`KnowledgeBase::load_from_file`] found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub segments: usize,
    pub stored_model_id: Option<String>,
    /// The stored vectors come from a different model than the configured
    /// one; they stay searchable but query scores are not comparable.
    pub model_mismatch: bool,
    pub profile: ChunkingProfile,
}

pub struct KnowledgeBase {
    store: VectorStore,
    strategy: Box<dyn ChunkingStrategy>,
    model: Arc<dyn EmbeddingModel>,
    search: SearchSettings,
    pin_dimension: bool,
    store_path: PathBuf,
}

impl std::fmt::Debug for KnowledgeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBase")
            .field("segments", &self.store.len())
            .field("strategy", &self.strategy.kind())
            .field("model", &self.model.model_id())
            .finish()
    }
}

impl KnowledgeBase {
    /// Build a knowledge base from settings around an already loaded model.
    ///
    /// # Errors
    /// Returns `Configuration` for an unknown strategy or invalid chunk sizes.
    pub fn new(settings: &Settings, model: Arc<dyn EmbeddingModel>) -> KbResult<Self> {
        let profile = ChunkingProfile {
            strategy: settings.chunking.strategy.parse::<StrategyKind>()?,
            config: settings.chunking.to_config()?,
        };
        let mut kb = Self::with_strategy(profile, model)?;
        kb.search = settings.search.clone();
        kb.pin_dimension = settings.embedding.pin_dimension;
        kb.store_path = settings.store.path.clone();
        Ok(kb)
    }

    pub fn with_strategy(profile: ChunkingProfile, model: Arc<dyn EmbeddingModel>) -> KbResult<Self> {
        let strategy = profile.build()?;
        info!(
            "Knowledge base ready: strategy {}, model {} ({} dimensions)",
            profile.strategy,
            model.model_id(),
            model.dimension()
        );
        Ok(Self {
            store: VectorStore::new(profile),
            strategy,
            model,
            search: SearchSettings::default(),
            pin_dimension: false,
            store_path: StoreSettings::default().path,
        })
    }

    /// Chunk, embed and store a batch of documents.
    ///
    /// Documents without text, with a failed extraction, or yielding no
    /// chunks are skipped and reported; the rest are still ingested. All
    /// segments are embedded in one call, and nothing is stored if that
    /// call fails.
    ///
    /// # Errors
    /// `Model` when embedding fails, `DimensionMismatch`/`ModelMismatch`
    /// when the store was filled by another model.
    pub fn add_documents(&mut self, documents: &[Document]) -> KbResult<IngestionSummary> {
        let mut summary = IngestionSummary::default();
        let mut pending: Vec<PendingSegment> = Vec::new();

        for document in documents {
            let reason = match document.skip_reason() {
                Some(reason) => Some(reason),
                None => {
                    let segments = self.segment_document(document);
                    if segments.is_empty() {
                        Some(SkipReason::NoChunks)
                    } else {
                        debug!(
                            "Chunked {} into {} segments",
                            document.source_path().display(),
                            segments.len()
                        );
                        pending.extend(segments);
                        None
                    }
                }
            };

            match reason {
                Some(reason) => {
                    warn!(
                        "Skipping {}: {reason}",
                        document.source_path().display()
                    );
                    summary.documents_skipped += 1;
                    summary.skipped.push(SkippedDocument {
                        source_path: document.source_path().to_path_buf(),
                        reason,
                    });
                }
                None => summary.documents_processed += 1,
            }
        }

        if pending.is_empty() {
            info!(
                "No segments to add ({} documents skipped)",
                summary.documents_skipped
            );
            return Ok(summary);
        }

        let vectors = {
            let texts: Vec<&str> = pending.iter().map(PendingSegment::text).collect();
            self.model.encode(&texts)?
        };
        let ids = self
            .store
            .append(pending, vectors, self.model.model_id())?;
        summary.segments_added = ids.len();

        info!(
            "Added {} segments from {} documents ({} skipped)",
            summary.segments_added, summary.documents_processed, summary.documents_skipped
        );
        Ok(summary)
    }

    fn segment_document(&self, document: &Document) -> Vec<PendingSegment> {
        let chunks: Vec<Chunk> = self
            .strategy
            .chunk(&document.prepared_text())
            .into_iter()
            .filter(|chunk| !chunk.text.trim().is_empty())
            .collect();
        let total = u32::try_from(chunks.len()).unwrap_or(u32::MAX);

        chunks
            .into_iter()
            .zip(0..total)
            .filter_map(|(chunk, index)| {
                let position = ChunkPosition::new(index, total)?;
                PendingSegment::new(
                    document.source_path.clone(),
                    document.source_label.clone(),
                    chunk.text,
                    position,
                )
                .ok()
                .map(|segment| {
                    segment
                        .with_tags(chunk.tags)
                        .with_confidence(chunk.confidence)
                })
            })
            .collect()
    }

    /// Chunk documents added from now on with another strategy.
    ///
    /// Segments already stored keep their old boundaries; re-ingest them to
    /// make the store uniform. The store records the new profile.
    ///
    /// # Errors
    /// Returns `Configuration` for invalid chunk sizes; the current strategy
    /// is kept.
    pub fn set_strategy(&mut self, profile: ChunkingProfile) -> KbResult<()> {
        let strategy = profile.build()?;
        let previous = self.strategy.profile();
        if previous == profile {
            return Ok(());
        }

        if !self.store.is_empty() {
            warn!(
                "Switching chunking from {} to {} with {} segments stored; existing segments may need re-ingestion",
                previous.strategy,
                profile.strategy,
                self.store.len()
            );
        }
        self.strategy = strategy;
        self.store.set_profile(profile);
        info!(
            "Chunking strategy set to {} (size {}, overlap {})",
            profile.strategy, profile.config.chunk_size, profile.config.chunk_overlap
        );
        Ok(())
    }

    fn engine(&self) -> SearchEngine<'_> {
        SearchEngine::new(&self.store, self.model.as_ref())
            .with_context_prefix_chars(self.search.context_prefix_chars)
    }

    fn base_filter(&self) -> SearchFilter {
        match self.search.similarity_threshold {
            Some(threshold) => SearchFilter::new().with_min_similarity(threshold),
            None => SearchFilter::new(),
        }
    }

    /// The `top_k` most similar segments. An empty knowledge base yields
    /// no results.
    pub fn search(&self, query: &str, top_k: usize) -> KbResult<Vec<SearchResult>> {
        self.engine()
            .search_filtered(query, top_k, &self.base_filter())
    }

    /// Search with a bounded prefix of recent conversation appended to the query.
    pub fn search_with_context(
        &self,
        query: &str,
        context: &str,
        top_k: usize,
    ) -> KbResult<Vec<SearchResult>> {
        let request = SearchRequest::new(query)
            .with_context(context)
            .with_top_k(top_k);
        self.search_request(&request)
    }

    /// Run a full request. The configured similarity threshold applies
    /// unless the request sets its own.
    pub fn search_request(&self, request: &SearchRequest) -> KbResult<Vec<SearchResult>> {
        if request.filter.min_similarity.is_none() && self.search.similarity_threshold.is_some() {
            let mut request = request.clone();
            request.filter.min_similarity = self.search.similarity_threshold;
            return self.engine().execute(&request);
        }
        self.engine().execute(request)
    }

    /// A request pre-filled with the configured default result count.
    pub fn request(&self, query: impl Into<String>) -> SearchRequest {
        SearchRequest::new(query).with_top_k(self.search.default_top_k)
    }

    pub fn get_statistics(&self) -> KnowledgeBaseStatistics {
        KnowledgeBaseStatistics {
            store: self.store.statistics(),
            chunking_strategy: self.strategy.kind().to_string(),
            profile: self.strategy.profile(),
            embedding_model: self.model.model_id().to_string(),
            state: self.state(),
        }
    }

    pub fn state(&self) -> KnowledgeBaseState {
        if self.store.is_empty() {
            KnowledgeBaseState::Empty
        } else {
            KnowledgeBaseState::Populated
        }
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    pub fn model(&self) -> &dyn EmbeddingModel {
        self.model.as_ref()
    }

    pub fn document_segments(&self, source_path: impl AsRef<Path>) -> Vec<&Segment> {
        self.store.document_segments(source_path.as_ref())
    }

    pub fn list_documents(&self, label: Option<&str>) -> Vec<DocumentSummary> {
        self.store.documents(label)
    }

    pub fn source_summary(&self) -> BTreeMap<String, SourceSummary> {
        self.store.source_summary()
    }

    /// Drop every segment and restart ids at zero.
    pub fn clear(&mut self) {
        let dropped = self.store.len();
        self.store.clear();
        self.store.set_profile(self.strategy.profile());
        info!("Cleared knowledge base ({dropped} segments removed)");
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> KbResult<()> {
        self.store.save(path.as_ref())
    }

    /// Where [`save_default`](Self::save_default) and
    /// [`load_default`](Self::load_default) go (`store.path` in settings).
    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    pub fn save_default(&self) -> KbResult<()> {
        self.save_to_file(&self.store_path)
    }

    pub fn load_default(&mut self) -> KbResult<LoadReport> {
        let path = self.store_path.clone();
        self.load_from_file(path)
    }

    /// Replace the contents with a saved store.
    ///
    /// A store written by a different model still loads; the mismatch is
    /// logged and flagged in the report. With `pin_dimension` set, a store
    /// of another dimension is refused. The chunking strategy switches to
    /// the one the store was built with, so later additions and saves stay
    /// consistent with it. On any error the current contents are kept.
    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> KbResult<LoadReport> {
        let path = path.as_ref();
        let pinned = self.pin_dimension.then(|| self.model.dimension());
        let mut loaded = VectorStore::default();
        let metadata = loaded.load(path, pinned)?;
        let strategy = metadata.profile.build()?;

        let model_mismatch = metadata
            .model_id
            .as_deref()
            .is_some_and(|stored| stored != self.model.model_id());
        if model_mismatch {
            warn!(
                "Store {} was built with model '{}' but '{}' is configured; similarity scores may be unreliable",
                path.display(),
                metadata.model_id.as_deref().unwrap_or_default(),
                self.model.model_id()
            );
        }
        if metadata.profile != self.strategy.profile() {
            info!(
                "Store {} was chunked with {} (size {}, overlap {}); using it instead of {}",
                path.display(),
                metadata.profile.strategy,
                metadata.profile.config.chunk_size,
                metadata.profile.config.chunk_overlap,
                self.strategy.kind()
            );
        }
        self.store = loaded;
        self.strategy = strategy;

        Ok(LoadReport {
            segments: metadata.segments,
            stored_model_id: metadata.model_id,
            model_mismatch,
            profile: metadata.profile,
        })
    }
}

//! Similarity search over a [`VectorStore`].
//!
//! Every stored vector is scored against the query embedding with cosine
//! similarity. Filters are applied to candidates before top-k selection, so
//! a filtered search still returns `top_k` results when enough matches exist.
//! Equal scores are ordered by segment id, earliest first.

mod filter;

pub use filter::{HIGH_CONFIDENCE, SearchFilter};

use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use tracing::debug;

use crate::embedding::EmbeddingModel;
use crate::error::{KbResult, KnowledgeBaseError};
use crate::store::VectorStore;
use crate::types::Segment;
use crate::vector::cosine_similarity;

/// Similarity threshold recommendations based on testing
pub mod thresholds {
    /// Threshold for very similar passages (same concept, different wording)
    pub const VERY_SIMILAR: f32 = 0.75;

    /// Threshold for similar passages (related concepts)
    pub const SIMILAR: f32 = 0.60;

    /// Threshold for somewhat related passages
    pub const RELATED: f32 = 0.40;

    /// Default threshold for threshold search
    pub const DEFAULT: f32 = SIMILAR;
}

/// Characters of context prepended to the query when nothing else is configured.
pub const DEFAULT_CONTEXT_PREFIX_CHARS: usize = 200;

pub const DEFAULT_TOP_K: usize = 10;

/// Coarse relevance band for displaying a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Relevance {
    VerySimilar,
    Similar,
    Related,
    Weak,
}

impl Relevance {
    pub fn from_score(score: f32) -> Self {
        if score >= thresholds::VERY_SIMILAR {
            Self::VerySimilar
        } else if score >= thresholds::SIMILAR {
            Self::Similar
        } else if score >= thresholds::RELATED {
            Self::Related
        } else {
            Self::Weak
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VerySimilar => "very similar",
            Self::Similar => "similar",
            Self::Related => "related",
            Self::Weak => "weak",
        }
    }
}

impl fmt::Display for Relevance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ranked segment. Produced per query, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub segment: Segment,
    /// Cosine similarity in `[-1, 1]`
    pub score: f32,
}

impl SearchResult {
    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn relevance(&self) -> Relevance {
        Relevance::from_score(self.score)
    }

    /// Short attribution such as `[literature] paper.pdf`.
    pub fn citation_label(&self) -> String {
        format!(
            "[{}] {}",
            self.segment.source_label(),
            self.segment.file_name()
        )
    }
}

/// A full query description.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub context: Option<String>,
    pub top_k: usize,
    pub filter: SearchFilter,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            context: None,
            top_k: DEFAULT_TOP_K,
            filter: SearchFilter::default(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_filter(mut self, filter: SearchFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Effective query text for a context-augmented search: the query followed
/// by at most `prefix_chars` characters of context.
pub fn build_context_query(query: &str, context: &str, prefix_chars: usize) -> String {
    let prefix: String = context.chars().take(prefix_chars).collect();
    let prefix = prefix.trim();
    if prefix.is_empty() {
        query.to_string()
    } else {
        format!("{query} {prefix}")
    }
}

/// Read-only search view over a store and the model that filled it.
pub struct SearchEngine<'a> {
    store: &'a VectorStore,
    model: &'a dyn EmbeddingModel,
    context_prefix_chars: usize,
}

impl<'a> SearchEngine<'a> {
    pub fn new(store: &'a VectorStore, model: &'a dyn EmbeddingModel) -> Self {
        Self {
            store,
            model,
            context_prefix_chars: DEFAULT_CONTEXT_PREFIX_CHARS,
        }
    }

    pub fn with_context_prefix_chars(mut self, chars: usize) -> Self {
        self.context_prefix_chars = chars;
        self
    }

    /// The `top_k` segments most similar to `query`, best first.
    ///
    /// # Errors
    /// `Model` if the query cannot be embedded, `DimensionMismatch` if the
    /// model and the store disagree on dimension.
    pub fn search(&self, query: &str, top_k: usize) -> KbResult<Vec<SearchResult>> {
        self.search_filtered(query, top_k, &SearchFilter::default())
    }

    /// Like [`search`](Self::search) with a bounded prefix of `context`
    /// appended to the query before embedding.
    pub fn search_with_context(
        &self,
        query: &str,
        context: &str,
        top_k: usize,
    ) -> KbResult<Vec<SearchResult>> {
        let effective = build_context_query(query, context, self.context_prefix_chars);
        self.search_filtered(&effective, top_k, &SearchFilter::default())
    }

    pub fn search_filtered(
        &self,
        query: &str,
        top_k: usize,
        filter: &SearchFilter,
    ) -> KbResult<Vec<SearchResult>> {
        if self.store.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        let query_vector = self.model.encode_one(query)?;
        self.search_by_vector(&query_vector, top_k, filter)
    }

    pub fn execute(&self, request: &SearchRequest) -> KbResult<Vec<SearchResult>> {
        match request.context.as_deref() {
            Some(context) => {
                let effective =
                    build_context_query(&request.query, context, self.context_prefix_chars);
                self.search_filtered(&effective, request.top_k, &request.filter)
            }
            None => self.search_filtered(&request.query, request.top_k, &request.filter),
        }
    }

    /// Rank stored segments against an already embedded query.
    pub fn search_by_vector(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filter: &SearchFilter,
    ) -> KbResult<Vec<SearchResult>> {
        let Some(dimension) = self.store.dimension() else {
            return Ok(Vec::new());
        };
        if top_k == 0 {
            return Ok(Vec::new());
        }
        if query_vector.len() != dimension.get() {
            return Err(KnowledgeBaseError::DimensionMismatch {
                expected: dimension.get(),
                actual: query_vector.len(),
            });
        }

        // Filter before scoring so truncation only ever drops matching candidates
        let mut scored: Vec<(usize, f32)> = self
            .store
            .segments()
            .par_iter()
            .zip(self.store.vectors().par_iter())
            .enumerate()
            .filter(|(_, (segment, _))| filter.matches(segment))
            .map(|(index, (_, vector))| {
                let score = cosine_similarity(query_vector, vector);
                (index, if score.is_nan() { -1.0 } else { score })
            })
            .filter(|(_, score)| filter.accepts_score(*score))
            .collect();

        debug!(
            "Scored {} of {} segments",
            scored.len(),
            self.store.len()
        );

        // Storage order is id order, so the index breaks ties by id
        scored.sort_by(|a, b| match b.1.total_cmp(&a.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });
        scored.truncate(top_k);

        let segments = self.store.segments();
        Ok(scored
            .into_iter()
            .map(|(index, score)| SearchResult {
                segment: segments[index].clone(),
                score,
            })
            .collect())
    }
}

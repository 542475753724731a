//! fastembed-backed sentence embeddings.

use ::fastembed::{EmbeddingModel as FastEmbedKind, InitOptions, TextEmbedding};
use parking_lot::Mutex;
use std::path::PathBuf;
use tracing::{debug, info};

use super::{EmbeddingModel, validate_batch};
use crate::config::EmbeddingSettings;
use crate::error::{KbResult, KnowledgeBaseError};
use crate::vector::VectorDimension;

/// Model names accepted in `[embedding] model`, with their fastembed variant.
const SUPPORTED_MODELS: &[(&str, FastEmbedKind)] = &[
    ("AllMiniLML6V2", FastEmbedKind::AllMiniLML6V2),
    ("AllMiniLML12V2", FastEmbedKind::AllMiniLML12V2),
    ("BGESmallENV15", FastEmbedKind::BGESmallENV15),
    ("BGEBaseENV15", FastEmbedKind::BGEBaseENV15),
    ("NomicEmbedTextV15", FastEmbedKind::NomicEmbedTextV15),
    ("MultilingualE5Small", FastEmbedKind::MultilingualE5Small),
    (
        "ParaphraseMLMiniLML12V2",
        FastEmbedKind::ParaphraseMLMiniLML12V2,
    ),
];

/// Names accepted by [`parse_model_name`].
pub fn supported_models() -> Vec<&'static str> {
    SUPPORTED_MODELS.iter().map(|(name, _)| *name).collect()
}

/// Resolve a configured model name, ignoring case, dashes and underscores.
pub fn parse_model_name(name: &str) -> KbResult<FastEmbedKind> {
    let wanted: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();

    SUPPORTED_MODELS
        .iter()
        .find(|(candidate, _)| candidate.to_ascii_lowercase() == wanted)
        .map(|(_, kind)| kind.clone())
        .ok_or_else(|| KnowledgeBaseError::Configuration {
            reason: format!(
                "unknown embedding model '{name}', supported: {}",
                supported_models().join(", ")
            ),
        })
}

/// Default location for downloaded model files.
fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("litkb")
        .join("models")
}

/// Sentence-transformer model running through fastembed's ONNX runtime.
///
/// The dimension is measured once at construction by embedding a test string.
pub struct FastEmbedModel {
    model: Mutex<TextEmbedding>,
    model_id: String,
    dimension: VectorDimension,
    batch_size: usize,
}

impl std::fmt::Debug for FastEmbedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedModel")
            .field("model_id", &self.model_id)
            .field("dimension", &self.dimension)
            .field("batch_size", &self.batch_size)
            .field("model", &"<TextEmbedding>")
            .finish()
    }
}

impl FastEmbedModel {
    /// Load the model named in the settings, downloading it on first use.
    ///
    /// # Errors
    /// Returns `Configuration` for unknown model names and `Model` if the
    /// model cannot be downloaded or initialized.
    pub fn from_settings(settings: &EmbeddingSettings) -> KbResult<Self> {
        let kind = parse_model_name(&settings.model)?;
        let cache_dir = settings.cache_dir.clone().unwrap_or_else(default_cache_dir);
        let model_id = settings.model.clone();

        let has_cached_models = cache_dir
            .read_dir()
            .is_ok_and(|mut entries| entries.any(|_| true));
        if has_cached_models {
            debug!("Loading embedding model {model_id} from {}", cache_dir.display());
        } else {
            info!("Downloading embedding model {model_id} (first time only)");
        }

        let mut text_model = TextEmbedding::try_new(
            InitOptions::new(kind)
                .with_cache_dir(cache_dir)
                .with_show_download_progress(settings.show_download_progress),
        )
        .map_err(|e| KnowledgeBaseError::Model {
            model_id: model_id.clone(),
            reason: format!(
                "failed to initialize: {e}. Ensure you have internet connection for first-time model download"
            ),
        })?;

        // Get dimensions by generating a test embedding
        let sample = text_model
            .embed(vec!["test"], None)
            .map_err(|e| KnowledgeBaseError::Model {
                model_id: model_id.clone(),
                reason: e.to_string(),
            })?;
        let dimension = VectorDimension::new(sample.first().map_or(0, Vec::len))?;

        info!("Embedding model {model_id} ready ({dimension} dimensions)");
        Ok(Self {
            model: Mutex::new(text_model),
            model_id,
            dimension,
            batch_size: settings.batch_size.max(1),
        })
    }
}

impl EmbeddingModel for FastEmbedModel {
    fn encode(&self, texts: &[&str]) -> KbResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // fastembed expects owned strings
        let text_strings: Vec<String> = texts.iter().map(|&s| s.to_string()).collect();
        let embeddings = self
            .model
            .lock()
            .embed(text_strings, Some(self.batch_size))
            .map_err(|e| KnowledgeBaseError::Model {
                model_id: self.model_id.clone(),
                reason: format!("failed to generate embeddings: {e}"),
            })?;

        validate_batch(&self.model_id, self.dimension, texts.len(), &embeddings)?;
        Ok(embeddings)
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

//! Configuration module for the knowledge base core.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `LITKB_` and use double
//! underscores to separate nested levels:
//! - `LITKB_CHUNKING__CHUNK_SIZE=500` sets `chunking.chunk_size`
//! - `LITKB_EMBEDDING__MODEL=BGESmallENV15` sets `embedding.model`
//! - `LITKB_DEBUG=true` sets `debug`
//!
//! `LITKB_CONFIG` names the configuration file; it defaults to `./litkb.toml`.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::chunking::ChunkingConfig;
use crate::error::KbResult;

const ENV_PREFIX: &str = "LITKB_";
const CONFIG_PATH_VAR: &str = "LITKB_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "litkb.toml";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Global debug mode
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub chunking: ChunkingSettings,

    #[serde(default)]
    pub embedding: EmbeddingSettings,

    #[serde(default)]
    pub search: SearchSettings,

    #[serde(default)]
    pub store: StoreSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ChunkingSettings {
    /// Strategy name: "simple" or "context_aware"
    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// Target chunk length in words
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Words shared between consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Defaults to a tenth of `chunk_size`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_chunk_size: Option<usize>,

    /// Defaults to twice `chunk_size`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chunk_size: Option<usize>,

    #[serde(default = "default_true")]
    pub section_awareness: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EmbeddingSettings {
    /// fastembed model name
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Where model files are cached; defaults to the user cache directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Texts per inference batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default)]
    pub show_download_progress: bool,

    /// Refuse to load stores whose dimension differs from the model's
    #[serde(default)]
    pub pin_dimension: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SearchSettings {
    /// Results returned when the caller does not ask for a count
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Characters of context prepended to the query in context search
    #[serde(default = "default_context_prefix_chars")]
    pub context_prefix_chars: usize,

    /// Drop results below this cosine similarity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StoreSettings {
    /// Default location of the persisted store
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_version() -> u32 {
    1
}
fn default_true() -> bool {
    true
}
fn default_strategy() -> String {
    "context_aware".to_string()
}
fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_embedding_model() -> String {
    "AllMiniLML6V2".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_top_k() -> usize {
    10
}
fn default_context_prefix_chars() -> usize {
    200
}
fn default_store_path() -> PathBuf {
    PathBuf::from("knowledge_base/store.lkb")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            debug: false,
            chunking: ChunkingSettings::default(),
            embedding: EmbeddingSettings::default(),
            search: SearchSettings::default(),
            store: StoreSettings::default(),
        }
    }
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            min_chunk_size: None,
            max_chunk_size: None,
            section_awareness: true,
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            cache_dir: None,
            batch_size: default_batch_size(),
            show_download_progress: false,
            pin_dimension: false,
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            context_prefix_chars: default_context_prefix_chars(),
            similarity_threshold: None,
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl ChunkingSettings {
    /// Build the validated chunking parameters these settings describe.
    ///
    /// # Errors
    /// Returns `Configuration` if the sizes are inconsistent.
    pub fn to_config(&self) -> KbResult<ChunkingConfig> {
        let mut config = ChunkingConfig::new(self.chunk_size, self.chunk_overlap)?
            .with_section_awareness(self.section_awareness);
        if let Some(max) = self.max_chunk_size {
            config = config.with_max_chunk_size(max)?;
        }
        if let Some(min) = self.min_chunk_size {
            config = config.with_min_chunk_size(min)?;
        }
        Ok(config)
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = std::env::var_os(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still honoring environment overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path.as_ref()))
            // Double underscore (__) separates nested levels
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }
}

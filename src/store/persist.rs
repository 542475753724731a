//! Versioned binary snapshot format.
//!
//! Layout:
//!
//! ```text
//! [0..4)    magic "LKBS"
//! [4..8)    format version, u32 little-endian
//! [8..40)   SHA-256 of the payload
//! [40..)    payload: lz4 (size-prepended) of a bincode-encoded snapshot
//! ```
//!
//! Files are written to a temporary sibling and renamed into place, so a
//! failed save never leaves a half-written store behind.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use super::VectorStore;
use crate::chunking::ChunkingProfile;
use crate::error::{KbResult, KnowledgeBaseError};
use crate::types::{Segment, SegmentCounter};
use crate::vector::VectorDimension;

/// Magic bytes to identify store files
const MAGIC_BYTES: &[u8; 4] = b"LKBS";

/// Version of the store format written by this build
pub const FORMAT_VERSION: u32 = 1;

const CHECKSUM_LEN: usize = 32;
const HEADER_SIZE: usize = 4 + 4 + CHECKSUM_LEN;

/// Descriptive fields of a loaded store file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreMetadata {
    pub format_version: u32,
    pub model_id: Option<String>,
    pub dimension: Option<usize>,
    pub segments: usize,
    pub profile: ChunkingProfile,
    /// RFC 3339 timestamp of the save
    pub saved_at: String,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    model_id: Option<&'a str>,
    dimension: Option<usize>,
    profile: &'a ChunkingProfile,
    next_id: u32,
    saved_at: String,
    segments: &'a [Segment],
    vectors: &'a [Vec<f32>],
}

#[derive(Deserialize)]
struct Snapshot {
    model_id: Option<String>,
    dimension: Option<usize>,
    profile: ChunkingProfile,
    next_id: u32,
    saved_at: String,
    segments: Vec<Segment>,
    vectors: Vec<Vec<f32>>,
}

impl Snapshot {
    /// Re-check the invariants the store maintains in memory.
    fn validate(&self) -> Result<(), String> {
        if self.segments.len() != self.vectors.len() {
            return Err(format!(
                "{} segments but {} vectors",
                self.segments.len(),
                self.vectors.len()
            ));
        }

        if !self.segments.is_empty() {
            let Some(dimension) = self.dimension.filter(|d| *d > 0) else {
                return Err("non-empty store without a vector dimension".to_string());
            };
            if self.model_id.is_none() {
                return Err("non-empty store without a model id".to_string());
            }
            if let Some(vector) = self.vectors.iter().find(|v| v.len() != dimension) {
                return Err(format!(
                    "vector of dimension {} in a store of dimension {dimension}",
                    vector.len()
                ));
            }
        }

        for pair in self.segments.windows(2) {
            if pair[0].id() >= pair[1].id() {
                return Err(format!(
                    "segment ids out of order: {} before {}",
                    pair[0].id(),
                    pair[1].id()
                ));
            }
        }
        if let Some(last) = self.segments.last() {
            if last.id().value() >= self.next_id {
                return Err(format!(
                    "segment id {} is not below the id counter {}",
                    last.id(),
                    self.next_id
                ));
            }
        }

        for segment in &self.segments {
            segment.validate()?;
        }
        self.profile
            .config
            .validate()
            .map_err(|e| format!("invalid chunking profile: {e}"))
    }
}

/// Frame a payload with magic, version and checksum.
fn encode_blob(version: u32, payload: &[u8]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(HEADER_SIZE + payload.len());
    blob.extend_from_slice(MAGIC_BYTES);
    blob.extend_from_slice(&version.to_le_bytes());
    blob.extend_from_slice(&Sha256::digest(payload));
    blob.extend_from_slice(payload);
    blob
}

pub(super) fn save(store: &VectorStore, path: &Path) -> KbResult<()> {
    let io_error = |source: std::io::Error| KnowledgeBaseError::Persistence {
        path: path.to_path_buf(),
        source,
    };

    let snapshot = SnapshotRef {
        model_id: store.model_id.as_deref(),
        dimension: store.dimension.map(|d| d.get()),
        profile: &store.profile,
        next_id: store.counter.peek(),
        saved_at: chrono::Utc::now().to_rfc3339(),
        segments: &store.segments,
        vectors: &store.vectors,
    };
    let encoded = bincode::serde::encode_to_vec(&snapshot, bincode::config::standard())
        .map_err(|e| io_error(std::io::Error::other(e.to_string())))?;
    let blob = encode_blob(FORMAT_VERSION, &lz4_flex::compress_prepend_size(&encoded));

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(io_error)?;

    let mut temp = NamedTempFile::new_in(parent).map_err(io_error)?;
    temp.write_all(&blob).map_err(io_error)?;
    temp.as_file().sync_all().map_err(io_error)?;
    temp.persist(path).map_err(|e| io_error(e.error))?;
    Ok(())
}

pub(super) fn load(
    path: &Path,
    pinned: Option<VectorDimension>,
) -> KbResult<(VectorStore, StoreMetadata)> {
    let corrupt = |reason: String| KnowledgeBaseError::CorruptStore {
        path: path.to_path_buf(),
        reason,
    };

    if !path.exists() {
        return Err(KnowledgeBaseError::StoreNotFound {
            path: path.to_path_buf(),
        });
    }
    let bytes = fs::read(path).map_err(|source| KnowledgeBaseError::Persistence {
        path: path.to_path_buf(),
        source,
    })?;

    if bytes.len() < HEADER_SIZE {
        return Err(corrupt(format!(
            "file is {} bytes, shorter than the {HEADER_SIZE}-byte header",
            bytes.len()
        )));
    }
    if &bytes[0..4] != MAGIC_BYTES {
        return Err(corrupt("not a knowledge base store (bad magic bytes)".to_string()));
    }

    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version == 0 {
        return Err(corrupt("unversioned store file".to_string()));
    }
    if version > FORMAT_VERSION {
        return Err(corrupt(format!(
            "format version {version} is newer than supported version {FORMAT_VERSION}"
        )));
    }

    let payload = &bytes[HEADER_SIZE..];
    if Sha256::digest(payload).as_slice() != &bytes[8..HEADER_SIZE] {
        return Err(corrupt("checksum mismatch, file is damaged or truncated".to_string()));
    }

    let encoded = lz4_flex::decompress_size_prepended(payload)
        .map_err(|e| corrupt(format!("decompression failed: {e}")))?;
    let (snapshot, _): (Snapshot, usize) =
        bincode::serde::decode_from_slice(&encoded, bincode::config::standard())
            .map_err(|e| corrupt(format!("decoding failed: {e}")))?;
    snapshot.validate().map_err(corrupt)?;

    // An empty store has no meaningful dimension or model
    let populated = !snapshot.segments.is_empty();
    let dimension = match snapshot.dimension.filter(|_| populated) {
        Some(dim) => Some(VectorDimension::new(dim).map_err(|e| corrupt(e.to_string()))?),
        None => None,
    };

    if let (Some(expected), Some(actual)) = (pinned, dimension) {
        if expected != actual {
            return Err(KnowledgeBaseError::DimensionMismatch {
                expected: expected.get(),
                actual: actual.get(),
            });
        }
    }

    let model_id = snapshot.model_id.filter(|_| populated);
    let metadata = StoreMetadata {
        format_version: version,
        model_id: model_id.clone(),
        dimension: dimension.map(|d| d.get()),
        segments: snapshot.segments.len(),
        profile: snapshot.profile,
        saved_at: snapshot.saved_at,
    };
    let store = VectorStore {
        segments: snapshot.segments,
        vectors: snapshot.vectors,
        dimension,
        model_id,
        counter: SegmentCounter::from_value(snapshot.next_id),
        profile: snapshot.profile,
    };
    Ok((store, metadata))
}

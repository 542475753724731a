//! Input records handed over by the document-extraction layer.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static PAGE_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(?:newpage|clearpage)\b\s*").expect("page break pattern is valid")
});
static REFERENCE_COMMAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*\\(cite|ref)\{").expect("reference command pattern is valid")
});

/// Rewrite LaTeX layout commands that would otherwise confuse chunking.
///
/// `\newpage` and `\clearpage` become paragraph breaks, and every `\cite{`
/// or `\ref{` is preceded by exactly one space.
pub fn preprocess_text(text: &str) -> String {
    let text = PAGE_BREAK.replace_all(text, "\n\n");
    REFERENCE_COMMAND
        .replace_all(&text, r" \${1}{")
        .into_owned()
}

/// Conventional source labels used by the assistant layer.
pub mod labels {
    pub const LITERATURE: &str = "literature";
    pub const USER_WORK: &str = "user-work";
    pub const DRAFT: &str = "draft";
}

/// Extracted plain text of one document plus its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Extracted text; may be empty, in which case ingestion skips it
    pub text: String,

    /// Where the document came from (used for citation labels)
    pub source_path: PathBuf,

    /// Coarse provenance, e.g. "literature", "user-work", "draft"
    pub source_label: String,

    /// Set by the extractor when text extraction failed
    #[serde(default)]
    pub extraction_failed: bool,
}

impl Document {
    pub fn new(
        text: impl Into<String>,
        source_path: impl Into<PathBuf>,
        source_label: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            source_path: source_path.into(),
            source_label: source_label.into(),
            extraction_failed: false,
        }
    }

    /// A placeholder for a document the extractor could not read.
    pub fn failed(source_path: impl Into<PathBuf>, source_label: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            source_path: source_path.into(),
            source_label: source_label.into(),
            extraction_failed: true,
        }
    }

    /// Text as handed to the chunker, see [`preprocess_text`].
    pub fn prepared_text(&self) -> String {
        preprocess_text(&self.text)
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Why this document cannot be ingested, if it cannot.
    pub fn skip_reason(&self) -> Option<SkipReason> {
        if self.extraction_failed {
            Some(SkipReason::ExtractionFailed)
        } else if self.text.trim().is_empty() {
            Some(SkipReason::EmptyText)
        } else {
            None
        }
    }
}

/// Why a document was left out of an ingestion batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    EmptyText,
    ExtractionFailed,
    NoChunks,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            SkipReason::EmptyText => "no text",
            SkipReason::ExtractionFailed => "text extraction failed",
            SkipReason::NoChunks => "chunking produced no segments",
        };
        f.write_str(reason)
    }
}

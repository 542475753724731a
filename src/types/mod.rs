mod segment;
mod segment_counter;

pub use segment::{PendingSegment, Segment};
pub use segment_counter::SegmentCounter;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a stored segment, assigned at insertion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub u32);

impl SegmentId {
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a segment inside its source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPosition {
    pub index: u32,
    pub total: u32,
}

impl ChunkPosition {
    /// Returns `None` unless `index < total`.
    pub fn new(index: u32, total: u32) -> Option<Self> {
        (index < total).then_some(Self { index, total })
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == self.total
    }
}

/// Section of a scientific paper a chunk belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SectionType {
    Abstract,
    Introduction,
    Methods,
    Results,
    Discussion,
    Conclusion,
    References,
}

impl SectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionType::Abstract => "abstract",
            SectionType::Introduction => "introduction",
            SectionType::Methods => "methods",
            SectionType::Results => "results",
            SectionType::Discussion => "discussion",
            SectionType::Conclusion => "conclusion",
            SectionType::References => "references",
        }
    }

    /// Map a heading keyword (already lowercased) to a section.
    pub fn from_heading_keyword(keyword: &str) -> Option<Self> {
        let keyword = keyword.trim();
        let section = if keyword.starts_with("abstract") {
            SectionType::Abstract
        } else if keyword.starts_with("introduction") || keyword.starts_with("background") {
            SectionType::Introduction
        } else if keyword.starts_with("method")
            || keyword.starts_with("materials and method")
            || keyword.starts_with("experimental")
            || keyword.starts_with("procedure")
        {
            SectionType::Methods
        } else if keyword.starts_with("result") || keyword.starts_with("finding") {
            SectionType::Results
        } else if keyword.starts_with("discussion") || keyword.starts_with("analysis") {
            SectionType::Discussion
        } else if keyword.starts_with("conclu")
            || keyword.starts_with("summary")
            || keyword.starts_with("outlook")
        {
            SectionType::Conclusion
        } else if keyword.starts_with("reference") || keyword.starts_with("bibliography") {
            SectionType::References
        } else {
            return None;
        };
        Some(section)
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionType {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abstract" => Ok(SectionType::Abstract),
            "introduction" => Ok(SectionType::Introduction),
            "methods" => Ok(SectionType::Methods),
            "results" => Ok(SectionType::Results),
            "discussion" => Ok(SectionType::Discussion),
            "conclusion" => Ok(SectionType::Conclusion),
            "references" => Ok(SectionType::References),
            _ => Err("Unknown section type"),
        }
    }
}

/// Content-shape flags attached to a chunk.
///
/// Every field is optional: `None` means the chunking strategy did not
/// look, which is different from "looked and found nothing".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralTags {
    pub has_equations: Option<bool>,
    pub has_citations: Option<bool>,
    pub section_type: Option<SectionType>,
}

impl StructuralTags {
    pub fn has_equations(&self) -> bool {
        self.has_equations.unwrap_or(false)
    }

    pub fn has_citations(&self) -> bool {
        self.has_citations.unwrap_or(false)
    }
}

//! Sentence, equation and section aware chunking.
//!
//! The text is first cut into *units*: sentences, paragraph tails and heading
//! lines. Cuts never fall inside a delimited equation. Units are then packed
//! greedily up to `chunk_size` words; consecutive chunks share whole trailing
//! sentences up to `chunk_overlap` words. A unit longer than `max_chunk_size`
//! is the only thing ever split mid-sentence, and then only at a word gap
//! outside any equation.

use regex::Regex;
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::LazyLock;

use super::detect::{
    detect_citations, detect_equations, ends_sentence, find_equation_regions,
    has_truncated_equation, heading_line, heading_prefix, inside_region, overlaps_region,
    sentence_starts, word_spans,
};
use super::{Chunk, ChunkingConfig, ChunkingStrategy, SHORT_TEXT_CONFIDENCE, StrategyKind};
use crate::error::KbResult;
use crate::types::{SectionType, StructuralTags};

const OPEN_BOUNDARY_PENALTY: f32 = 0.8;
const TRUNCATED_EQUATION_PENALTY: f32 = 0.6;

static LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r\n?").expect("line break pattern is valid"));
static INLINE_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\S\n]+").expect("space pattern is valid"));
static PADDED_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" ?\n ?").expect("newline pattern is valid"));
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank line pattern is valid"));

/// Collapse runs of spaces, unify line endings and keep at most one blank line.
pub(crate) fn normalize_whitespace(text: &str) -> String {
    let text = LINE_BREAKS.replace_all(text, "\n");
    let text = INLINE_SPACE.replace_all(&text, " ");
    let text = PADDED_NEWLINE.replace_all(&text, "\n");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Sentence,
    Paragraph,
    Heading,
    End,
}

#[derive(Debug, Clone)]
struct Unit {
    start: usize,
    end: usize,
    words: usize,
    /// Set when the unit is a heading line of its own
    heading: Option<SectionType>,
    /// Set when the unit opens with an inline marker such as `Abstract:`
    marker: Option<SectionType>,
    starts_sentence: bool,
    ends_sentence: bool,
}

impl Unit {
    fn opens_section(&self) -> Option<SectionType> {
        self.heading.or(self.marker)
    }
}

/// Structure-aware strategy for scientific prose.
#[derive(Debug, Clone)]
pub struct ContextAwareStrategy {
    config: ChunkingConfig,
}

impl ContextAwareStrategy {
    pub fn new(config: ChunkingConfig) -> KbResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    fn split_units(&self, text: &str, regions: &[Range<usize>]) -> Vec<Unit> {
        let mut cuts: BTreeMap<usize, Boundary> = BTreeMap::new();

        let mut heading_lines: Vec<Range<usize>> = Vec::new();
        if self.config.section_awareness {
            let mut line_start = 0;
            for line in text.split('\n') {
                let line_range = line_start..line_start + line.len();
                if heading_line(line).is_some() && !overlaps_region(regions, &line_range) {
                    cuts.insert(line_range.start, Boundary::Heading);
                    cuts.insert(line_range.end, Boundary::Heading);
                    heading_lines.push(line_range.clone());
                }
                line_start = line_range.end + 1;
            }
        }

        for (index, _) in text.match_indices("\n\n") {
            if !inside_region(regions, index) {
                cuts.entry(index + 2).or_insert(Boundary::Paragraph);
            }
        }

        // "2. Methods" must stay one unit
        for position in sentence_starts(text, regions) {
            if !inside_region(&heading_lines, position) {
                cuts.entry(position).or_insert(Boundary::Sentence);
            }
        }
        cuts.insert(text.len(), Boundary::End);

        let mut units = Vec::new();
        let mut previous = 0;
        for (&cut, &boundary) in &cuts {
            if cut > previous {
                if let Some(unit) = self.make_unit(text, previous..cut, boundary) {
                    if unit.words > self.config.max_chunk_size {
                        self.force_split(text, unit, regions, &mut units);
                    } else {
                        units.push(unit);
                    }
                }
            }
            previous = cut;
        }
        units
    }

    fn make_unit(&self, text: &str, range: Range<usize>, boundary: Boundary) -> Option<Unit> {
        let slice = &text[range.clone()];
        let start = range.start + (slice.len() - slice.trim_start().len());
        let end = range.start + slice.trim_end().len();
        if start >= end {
            return None;
        }

        let body = &text[start..end];
        let at_line_start = start == 0 || text[..start].ends_with('\n');
        let at_line_end = end == text.len() || text[end..].starts_with('\n');

        let heading = if self.config.section_awareness && at_line_start && at_line_end {
            heading_line(body)
        } else {
            None
        };
        let marker = if self.config.section_awareness && heading.is_none() && at_line_start {
            heading_prefix(body)
        } else {
            None
        };

        Some(Unit {
            start,
            end,
            words: body.split_whitespace().count(),
            heading,
            marker,
            starts_sentence: !body.starts_with(char::is_lowercase),
            ends_sentence: heading.is_some()
                || matches!(boundary, Boundary::Paragraph | Boundary::Heading)
                || ends_sentence(body),
        })
    }

    /// Cut an oversized unit into pieces of roughly `chunk_size` words.
    fn force_split(&self, text: &str, unit: Unit, regions: &[Range<usize>], units: &mut Vec<Unit>) {
        let spans: Vec<Range<usize>> = word_spans(&text[unit.start..unit.end])
            .into_iter()
            .map(|span| span.start + unit.start..span.end + unit.start)
            .collect();

        let mut pieces: Vec<Range<usize>> = Vec::new();
        let mut piece_start = 0;
        for i in 0..spans.len().saturating_sub(1) {
            let gap = spans[i].end..spans[i + 1].start;
            if i + 1 - piece_start >= self.config.chunk_size && !overlaps_region(regions, &gap) {
                pieces.push(piece_start..i + 1);
                piece_start = i + 1;
            }
        }
        pieces.push(piece_start..spans.len());

        let last = pieces.len() - 1;
        for (index, piece) in pieces.into_iter().enumerate() {
            units.push(Unit {
                start: spans[piece.start].start,
                end: spans[piece.end - 1].end,
                words: piece.len(),
                heading: None,
                marker: if index == 0 { unit.marker } else { None },
                starts_sentence: index == 0 && unit.starts_sentence,
                ends_sentence: index == last && unit.ends_sentence,
            });
        }
    }

    /// Group units into chunks, returning index ranges into `units`.
    fn pack(&self, units: &[Unit]) -> Vec<Range<usize>> {
        let mut groups = Vec::new();
        let mut start = 0;
        let mut words = 0;

        for (i, unit) in units.iter().enumerate() {
            let only_headings = units[start..i].iter().all(|u| u.heading.is_some());
            let opens_section = unit.opens_section().is_some();
            let overflows = words + unit.words > self.config.chunk_size;

            if i > start && !only_headings && (opens_section || overflows) {
                groups.push(start..i);
                start = if opens_section {
                    i
                } else {
                    self.overlap_start(units, start, i)
                };
                words = units[start..i].iter().map(|u| u.words).sum();
            }
            words += unit.words;
        }
        if start < units.len() {
            groups.push(start..units.len());
        }
        groups
    }

    /// First unit of the overlap carried from the group `start..end` into
    /// the group that continues with `units[end]`.
    fn overlap_start(&self, units: &[Unit], start: usize, end: usize) -> usize {
        let mut first = end;
        let mut carried = 0;
        while first > start + 1 {
            let previous = &units[first - 1];
            if previous.heading.is_some() || carried + previous.words > self.config.chunk_overlap {
                break;
            }
            first -= 1;
            carried += previous.words;
        }

        while first < end && carried + units[end].words > self.config.chunk_size {
            carried -= units[first].words;
            first += 1;
        }
        first
    }

    fn build_chunk(
        &self,
        text: &str,
        units: &[Unit],
        sections: &[Option<SectionType>],
        group: Range<usize>,
        regions: &[Range<usize>],
    ) -> Chunk {
        let first = &units[group.start];
        let last = &units[group.end - 1];
        let span = first.start..last.end;
        let body = &text[span.clone()];

        let mut confidence = 1.0;
        if !first.starts_sentence {
            confidence *= OPEN_BOUNDARY_PENALTY;
        }
        if !last.ends_sentence {
            confidence *= OPEN_BOUNDARY_PENALTY;
        }
        if has_truncated_equation(body) {
            confidence *= TRUNCATED_EQUATION_PENALTY;
        }

        Chunk {
            text: body.to_string(),
            tags: StructuralTags {
                has_equations: Some(overlaps_region(regions, &span) || detect_equations(body)),
                has_citations: Some(detect_citations(body)),
                section_type: if self.config.section_awareness {
                    sections[group.start]
                } else {
                    None
                },
            },
            confidence,
        }
    }
}

impl ChunkingStrategy for ContextAwareStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ContextAware
    }

    fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    fn chunk(&self, text: &str) -> Vec<Chunk> {
        let text = normalize_whitespace(text);
        if text.is_empty() {
            return Vec::new();
        }

        let regions = find_equation_regions(&text);
        let units = self.split_units(&text, &regions);
        if units.is_empty() {
            return Vec::new();
        }

        let mut current = None;
        let sections: Vec<Option<SectionType>> = units
            .iter()
            .map(|unit| {
                if let Some(section) = unit.opens_section() {
                    current = Some(section);
                }
                current
            })
            .collect();

        let total_words: usize = units.iter().map(|u| u.words).sum();
        if total_words < self.config.min_chunk_size {
            let mut chunk = self.build_chunk(&text, &units, &sections, 0..units.len(), &regions);
            chunk.confidence = chunk.confidence.min(SHORT_TEXT_CONFIDENCE);
            return vec![chunk];
        }

        self.pack(&units)
            .into_iter()
            .map(|group| self.build_chunk(&text, &units, &sections, group, &regions))
            .collect()
    }
}

//! Pattern detection shared by the chunking strategies: equation regions,
//! citations, sentence ends and section headings.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

use crate::types::SectionType;

/// LaTeX environments treated as display equations.
const EQUATION_ENVIRONMENTS: &[&str] = &[
    "equation", "align", "eqnarray", "gather", "multline", "flalign", "alignat",
];

/// Abbreviations whose trailing period does not end a sentence.
const ABBREVIATIONS: &[&str] = &[
    "dr.", "prof.", "al.", "i.e.", "e.g.", "vs.", "cf.", "fig.", "figs.", "eq.", "eqs.", "ref.",
    "refs.", "sec.", "secs.", "ch.", "vol.", "no.", "pp.", "eds.", "approx.", "resp.", "etc.",
    "tab.", "mr.", "mrs.", "ms.", "st.", "phys.", "rev.", "lett.",
];

/// Symbols that, in numbers, suggest mathematical content without delimiters.
const MATH_SYMBOLS: &[char] = &[
    '≡', '≈', '∝', '∫', '∂', '∇', '∑', '∏', '√', '±', '≤', '≥', 'α', 'β', 'γ', 'δ', 'θ', 'λ', 'μ',
    'π', 'σ', 'φ', 'ψ', 'ω', 'ħ',
];

static DELIMITED_EQUATIONS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let mut patterns = vec![
        r"(?s)\$\$.+?\$\$".to_string(),
        r"(?s)\\\[.+?\\\]".to_string(),
        r"(?s)\\\(.+?\\\)".to_string(),
    ];
    patterns.extend(EQUATION_ENVIRONMENTS.iter().map(|env| {
        format!(r"(?s)\\begin\{{{env}\*?\}}.*?\\end\{{{env}\*?\}}")
    }));
    patterns
        .iter()
        .map(|pattern| Regex::new(pattern).expect("equation pattern is valid"))
        .collect()
});

static INLINE_EQUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$[^$]+?\$").expect("inline equation pattern is valid"));

static CITATIONS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // [12], [3, 7], [4-9]
        r"\[\d+(?:\s*[,\u{2013}-]\s*\d+)*\]",
        // [Smith et al., 2020]
        r"\[[A-Z][\w\s.,&'-]*\d{4}[a-z]?\]",
        // (Author, Year), (Author and Other 2019)
        r"\([A-Z][\w\s.,&'-]*,?\s\d{4}[a-z]?\)",
        // Author et al.
        r"\b\w+\s+et\s+al\.",
        r"\\cite[pt]?\*?\{",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("citation pattern is valid"))
    .collect()
});

static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[.!?]+["'\u{201D}\u{2019})\]]*\s+"#).expect("sentence pattern is valid")
});

const SECTION_KEYWORDS: &str = r"abstract|introduction|background|methods?|methodology|materials and methods|experimental(?: setup| details| methods)?|procedures?|results?(?: and discussion)?|findings|discussion|analysis|conclusions?|concluding remarks|summary(?: and outlook)?|outlook|references|bibliography";

static HEADING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^(?:(?:\d+(?:\.\d+)*|[ivxlc]+)[.)]?\s+)?({SECTION_KEYWORDS})\s*[:.]?$"
    ))
    .expect("heading pattern is valid")
});

static HEADING_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^(?:(?:\d+(?:\.\d+)*|[ivxlc]+)[.)]?\s+)?({SECTION_KEYWORDS})\s*[:.\u{{2014}}-]\s+\S"
    ))
    .expect("heading prefix pattern is valid")
});

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+").expect("word pattern is valid"));

/// Byte ranges of delimited equations, sorted and merged.
///
/// Display forms (`$$..$$`, `\[..\]`, `\(..\)` and equation environments) are
/// found first; inline `$..$` pairs are only searched for outside of them.
pub fn find_equation_regions(text: &str) -> Vec<Range<usize>> {
    let mut regions: Vec<Range<usize>> = DELIMITED_EQUATIONS
        .iter()
        .flat_map(|pattern| pattern.find_iter(text).map(|m| m.range()))
        .collect();
    regions = merge_ranges(regions);

    // Blank out display regions and escaped dollars so inline matching
    // cannot pair a delimiter inside them with one outside.
    let mut masked = text.as_bytes().to_vec();
    for region in &regions {
        masked[region.clone()].fill(b' ');
    }
    for (index, _) in text.match_indices("\\$") {
        masked[index..index + 2].fill(b' ');
    }
    let masked = String::from_utf8_lossy(&masked);

    regions.extend(
        INLINE_EQUATION
            .find_iter(&masked)
            .filter(|m| !m.as_str().contains("\n\n"))
            .map(|m| m.range()),
    );
    merge_ranges(regions)
}

fn merge_ranges(mut ranges: Vec<Range<usize>>) -> Vec<Range<usize>> {
    ranges.sort_by_key(|range| (range.start, range.end));
    let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start < last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }
    merged
}

/// Whether byte offset `position` falls strictly inside one of `regions`.
pub(crate) fn inside_region(regions: &[Range<usize>], position: usize) -> bool {
    regions
        .iter()
        .any(|region| region.start < position && position < region.end)
}

/// Whether `range` shares at least one byte with one of `regions`.
pub(crate) fn overlaps_region(regions: &[Range<usize>], range: &Range<usize>) -> bool {
    regions
        .iter()
        .any(|region| region.start < range.end && range.start < region.end)
}

/// Detect mathematical content: delimiters, or several math symbols.
pub fn detect_equations(text: &str) -> bool {
    if !find_equation_regions(text).is_empty() {
        return true;
    }
    if ["$$", "\\begin{", "\\[", "\\("]
        .iter()
        .any(|delimiter| text.contains(delimiter))
    {
        return true;
    }

    let symbol_count = MATH_SYMBOLS
        .iter()
        .filter(|symbol| text.contains(**symbol))
        .count();
    symbol_count >= 3
}

/// Detect citation markers such as `[12]`, `(Author, 2020)` or `\cite{..}`.
pub fn detect_citations(text: &str) -> bool {
    CITATIONS.iter().any(|pattern| pattern.is_match(text))
}

/// Whether `text` contains an equation that was cut off by a chunk boundary.
pub(crate) fn has_truncated_equation(text: &str) -> bool {
    let unescaped_dollars = text.matches('$').count() - text.matches("\\$").count();
    unescaped_dollars % 2 != 0
        || text.matches("\\begin{").count() != text.matches("\\end{").count()
        || text.matches("\\[").count() != text.matches("\\]").count()
}

/// Byte offsets where a new sentence starts, ignoring abbreviations and
/// positions inside `protected` regions.
pub(crate) fn sentence_starts(text: &str, protected: &[Range<usize>]) -> Vec<usize> {
    SENTENCE_END
        .find_iter(text)
        .filter(|m| !inside_region(protected, m.start()))
        .filter(|m| !ends_with_abbreviation(&text[..m.start()], m.as_str()))
        .map(|m| m.end())
        .collect()
}

fn ends_with_abbreviation(before: &str, terminator: &str) -> bool {
    if !terminator.starts_with('.') || terminator.trim_end().len() > 1 {
        return false;
    }
    let last_word = before
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or_default()
        .trim_start_matches(['(', '[', '"', '\'']);

    // Single-letter initials ("J. Smith")
    let mut chars = last_word.chars();
    if let (Some(first), None) = (chars.next(), chars.next()) {
        if first.is_alphabetic() {
            return true;
        }
    }

    let candidate = format!("{}.", last_word.to_lowercase());
    ABBREVIATIONS.contains(&candidate.as_str())
}

/// Section named by a line that consists only of a heading, e.g. `2. Methods`.
pub(crate) fn heading_line(line: &str) -> Option<SectionType> {
    let line = line.trim();
    if line.is_empty() || line.len() > 60 {
        return None;
    }
    let captures = HEADING_LINE.captures(line)?;
    SectionType::from_heading_keyword(&captures[1].to_lowercase())
}

/// Section named at the start of a paragraph, e.g. `Abstract: We study ...`.
pub(crate) fn heading_prefix(text: &str) -> Option<SectionType> {
    let captures = HEADING_PREFIX.captures(text.trim_start())?;
    SectionType::from_heading_keyword(&captures[1].to_lowercase())
}

/// Byte ranges of whitespace-delimited words.
pub(crate) fn word_spans(text: &str) -> Vec<Range<usize>> {
    WORD.find_iter(text).map(|m| m.range()).collect()
}

/// Whether the text ends like a finished sentence.
pub(crate) fn ends_sentence(text: &str) -> bool {
    let trimmed = text
        .trim_end()
        .trim_end_matches(['"', '\'', ')', ']', '\u{201D}', '\u{2019}']);
    trimmed.ends_with(['.', '!', '?'])
        || trimmed.ends_with("$$")
        || trimmed.ends_with("\\]")
        || (trimmed.ends_with('}') && trimmed.contains("\\end{"))
}

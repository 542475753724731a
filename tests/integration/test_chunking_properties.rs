//! Properties every registered chunking strategy must satisfy.

use litkb::{ChunkingConfig, SectionType, available_strategies, create_strategy};
use std::collections::HashSet;

use crate::common::numbered_sentences;

const PAPER: &str = r"Abstract
We study heat flow in thin films [3].

1. Introduction
Heat transport in films has been studied by Smith et al. since the early work (Jones, 1998). The standard model is
\begin{equation}
  q = -k \nabla T
\end{equation}
which holds for large samples. Small samples behave differently.

2. Methods
We solve
\begin{align}
  \partial_t T &= \alpha \nabla^2 T \\
  T(0) &= T_0
\end{align}
numerically. The grid spacing is $h = 0.1$ throughout.

3. Results
Conductivity drops by half in the thinnest films.

References
[1] A. Smith, Thin films, 2001.";

fn words(text: &str) -> HashSet<&str> {
    text.split_whitespace().collect()
}

#[test]
fn test_every_strategy_is_deterministic_and_covers_input() {
    let text = numbered_sentences(40).join(" ");
    let config = ChunkingConfig::new(20, 5).unwrap();

    for name in available_strategies() {
        let strategy = create_strategy(name, config).unwrap();
        let first = strategy.chunk(&text);
        let second = strategy.chunk(&text);
        assert_eq!(first, second, "{name} is not deterministic");
        assert!(first.len() > 1, "{name} produced a single chunk");

        let covered: HashSet<&str> = first.iter().flat_map(|c| c.text.split_whitespace()).collect();
        for word in words(&text) {
            assert!(covered.contains(word), "{name} lost word {word:?}");
        }
        assert!(first.iter().all(|chunk| !chunk.text.trim().is_empty()));
    }
}

#[test]
fn test_blank_input_yields_no_chunks() {
    for name in available_strategies() {
        let strategy = create_strategy(name, ChunkingConfig::default()).unwrap();
        assert!(strategy.chunk("").is_empty());
        assert!(strategy.chunk(" \n\t ").is_empty());
    }
}

#[test]
fn test_context_aware_overlap_repeats_whole_sentences() {
    let text = numbered_sentences(12).join(" ");
    let strategy = create_strategy("context_aware", ChunkingConfig::new(20, 8).unwrap()).unwrap();
    let chunks = strategy.chunk(&text);

    assert!(chunks[0].text.starts_with("Sentence number 0 "));
    assert!(chunks[1].text.starts_with("Sentence number 1 "));
    for pair in chunks.windows(2) {
        let first_sentence_of_next = pair[1]
            .text
            .split_inclusive('.')
            .next()
            .unwrap();
        assert!(pair[0].text.ends_with(first_sentence_of_next));
    }
}

#[test]
fn test_equation_environments_are_never_split() {
    let strategy = create_strategy("context_aware", ChunkingConfig::new(10, 2).unwrap()).unwrap();
    let chunks = strategy.chunk(PAPER);
    assert!(chunks.len() > 3);

    for chunk in &chunks {
        for env in ["equation", "align"] {
            let opens = chunk.text.matches(&format!("\\begin{{{env}}}")).count();
            let closes = chunk.text.matches(&format!("\\end{{{env}}}")).count();
            assert_eq!(opens, closes, "split {env} environment in {:?}", chunk.text);
        }
        if chunk.text.contains("\\begin{") {
            assert_eq!(chunk.tags.has_equations, Some(true));
        }
    }
}

#[test]
fn test_sections_and_citations_are_tagged() {
    let strategy = create_strategy("context_aware", ChunkingConfig::new(10, 2).unwrap()).unwrap();
    let chunks = strategy.chunk(PAPER);

    let section_of = |needle: &str| {
        chunks
            .iter()
            .find(|chunk| chunk.text.contains(needle))
            .and_then(|chunk| chunk.tags.section_type)
    };
    assert_eq!(section_of("heat flow"), Some(SectionType::Abstract));
    assert_eq!(section_of("grid spacing"), Some(SectionType::Methods));
    assert_eq!(section_of("Conductivity drops"), Some(SectionType::Results));
    assert_eq!(section_of("Thin films, 2001"), Some(SectionType::References));

    let cited = chunks
        .iter()
        .find(|chunk| chunk.text.contains("(Jones, 1998)"))
        .unwrap();
    assert_eq!(cited.tags.has_citations, Some(true));
}

#[test]
fn test_simple_strategy_leaves_tags_unset() {
    let strategy = create_strategy("simple", ChunkingConfig::new(10, 2).unwrap()).unwrap();
    for chunk in strategy.chunk(PAPER) {
        assert_eq!(chunk.tags.has_equations, None);
        assert_eq!(chunk.tags.section_type, None);
    }
}

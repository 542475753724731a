//! Ranking, filtering and context-augmented queries through the knowledge base.

use anyhow::Result;
use litkb::{Document, SearchFilter, SectionType};

use crate::common::{physics_documents, small_kb};

fn mixed_documents() -> Vec<Document> {
    vec![
        Document::new(
            "Energy levels of hydrogen are discrete. Energy levels shift in a field.",
            "lit/hydrogen.pdf",
            "literature",
        ),
        Document::new(
            "Energy levels follow from $E_n = -13.6/n^2$ in electron volts.",
            "lit/bohr.pdf",
            "literature",
        ),
        Document::new(
            "My notes on energy levels, following Bohr (Bohr, 1913).",
            "mine/notes.md",
            "user-work",
        ),
        Document::new("Energy levels again and again.", "mine/draft.md", "draft"),
    ]
}

#[test]
fn test_top_k_returns_everything_once_when_k_exceeds_store() -> Result<()> {
    let mut kb = small_kb();
    kb.add_documents(&mixed_documents())?;

    let results = kb.search("energy levels", 100)?;
    assert_eq!(results.len(), kb.len());

    let mut ids: Vec<u32> = results.iter().map(|r| r.segment().id().value()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), kb.len());

    assert!(results.windows(2).all(|w| w[0].score() >= w[1].score()));
    assert!(results.iter().all(|r| (-1.0..=1.0).contains(&r.score())));
    Ok(())
}

#[test]
fn test_filter_is_applied_before_top_k() -> Result<()> {
    let mut kb = small_kb();
    kb.add_documents(&mixed_documents())?;

    let request = kb
        .request("energy levels")
        .with_top_k(1)
        .with_filter(SearchFilter::equations());
    let results = kb.search_request(&request)?;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].segment().source_path().to_str(), Some("lit/bohr.pdf"));

    let request = kb
        .request("energy levels")
        .with_top_k(2)
        .with_filter(SearchFilter::new().with_labels(["user-work", "draft"]));
    let results = kb.search_request(&request)?;
    assert_eq!(results.len(), 2);
    assert!(
        results
            .iter()
            .all(|r| ["user-work", "draft"].contains(&r.segment().source_label()))
    );

    let citations = SearchFilter::for_context_type("citations")?;
    let results = kb.search_request(&kb.request("energy").with_filter(citations))?;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].citation_label(), "[user-work] notes.md");
    Ok(())
}

#[test]
fn test_filter_without_matches_is_empty_not_error() -> Result<()> {
    let mut kb = small_kb();
    kb.add_documents(&mixed_documents())?;

    let request = kb
        .request("energy levels")
        .with_filter(SearchFilter::new().with_sections([SectionType::References]));
    assert!(kb.search_request(&request)?.is_empty());
    Ok(())
}

#[test]
fn test_identical_segments_tie_by_insertion_order() -> Result<()> {
    let mut kb = small_kb();
    kb.add_documents(&[
        Document::new("Spin waves in magnets.", "a.pdf", "literature"),
        Document::new("Spin waves in magnets.", "b.pdf", "literature"),
        Document::new("Spin waves in magnets.", "c.pdf", "literature"),
    ])?;

    let results = kb.search("spin waves", 3)?;
    let paths: Vec<_> = results
        .iter()
        .map(|r| r.segment().source_path().to_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(paths, ["a.pdf", "b.pdf", "c.pdf"]);
    Ok(())
}

#[test]
fn test_context_biases_the_query() -> Result<()> {
    let mut kb = small_kb();
    kb.add_documents(&physics_documents())?;

    let plain = kb.search("what does it describe", 1)?;
    let biased = kb.search_with_context(
        "what does it describe",
        "We were talking about classical mechanics and Newton's laws",
        1,
    )?;
    assert_eq!(biased[0].segment().source_path().to_str(), Some("papers/newton.pdf"));
    assert!(!plain.is_empty());
    Ok(())
}

#[test]
fn test_min_similarity_drops_weak_matches() -> Result<()> {
    let mut kb = small_kb();
    kb.add_documents(&mixed_documents())?;

    let request = kb
        .request("hydrogen")
        .with_filter(SearchFilter::new().with_min_similarity(0.2));
    let results = kb.search_request(&request)?;
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.score() >= 0.2));
    assert_eq!(
        results[0].segment().source_path().to_str(),
        Some("lit/hydrogen.pdf")
    );
    Ok(())
}

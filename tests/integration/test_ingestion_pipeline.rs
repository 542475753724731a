//! End-to-end ingestion: chunk, embed, append, query.

use anyhow::Result;
use litkb::{Document, KnowledgeBase, KnowledgeBaseError, KnowledgeBaseState, SkipReason};
use std::path::Path;
use std::sync::Arc;

use crate::common::{FailingModel, numbered_sentences, physics_documents, profile, small_kb};

#[test]
fn test_equation_stays_whole_and_ranks_first() -> Result<()> {
    let mut kb = small_kb();
    let summary = kb.add_documents(&physics_documents())?;
    assert_eq!(summary.documents_processed, 2);
    assert_eq!(summary.documents_skipped, 0);

    let schrodinger = kb.document_segments("papers/schrodinger.pdf");
    let with_equation: Vec<_> = schrodinger
        .iter()
        .filter(|segment| segment.text().contains("$$"))
        .collect();
    assert_eq!(with_equation.len(), 1, "equation must live in exactly one segment");
    assert!(
        with_equation[0]
            .text()
            .contains(r"$$i\hbar\partial_t\psi = H\psi$$")
    );
    assert!(with_equation[0].tags().has_equations());

    let top = kb.search("quantum evolution equation", 1)?;
    assert_eq!(top.len(), 1);
    assert_eq!(
        top[0].segment().source_path(),
        Path::new("papers/schrodinger.pdf")
    );

    let all = kb.search("quantum evolution equation", 10)?;
    let best_newton = all
        .iter()
        .filter(|r| r.segment().source_path() == Path::new("papers/newton.pdf"))
        .map(|r| r.score())
        .fold(f32::NEG_INFINITY, f32::max);
    assert!(top[0].score() > best_newton);
    Ok(())
}

#[test]
fn test_ids_follow_document_then_chunk_order() -> Result<()> {
    let mut kb = small_kb();
    kb.add_documents(&physics_documents())?;

    let long_text = numbered_sentences(30).join(" ");
    kb.add_documents(&[
        Document::new(long_text, "notes/long.txt", "user-work"),
        Document::new("A closing remark about entropy.", "notes/short.txt", "draft"),
    ])?;

    let segments = kb.store().segments();
    for (expected, segment) in segments.iter().enumerate() {
        assert_eq!(segment.id().value() as usize, expected);
    }

    let long = kb.document_segments("notes/long.txt");
    assert!(long.len() > 1);
    for (index, segment) in long.iter().enumerate() {
        assert_eq!(segment.position().index as usize, index);
        assert_eq!(segment.position().total as usize, long.len());
    }

    let paths: Vec<_> = kb
        .list_documents(None)
        .into_iter()
        .map(|doc| doc.source_path)
        .collect();
    assert_eq!(
        paths,
        vec![
            Path::new("papers/schrodinger.pdf").to_path_buf(),
            Path::new("papers/newton.pdf").to_path_buf(),
            Path::new("notes/long.txt").to_path_buf(),
            Path::new("notes/short.txt").to_path_buf(),
        ]
    );
    Ok(())
}

#[test]
fn test_bad_documents_are_skipped_not_fatal() -> Result<()> {
    let mut kb = small_kb();
    let mut documents = physics_documents();
    documents.insert(1, Document::new("", "papers/empty.pdf", "literature"));
    documents.push(Document::failed("papers/scanned.pdf", "literature"));

    let summary = kb.add_documents(&documents)?;
    assert_eq!(summary.documents_processed, 2);
    assert_eq!(summary.documents_skipped, 2);
    assert_eq!(summary.skipped[0].reason, SkipReason::EmptyText);
    assert_eq!(summary.skipped[1].reason, SkipReason::ExtractionFailed);
    assert_eq!(summary.segments_added, kb.len());
    Ok(())
}

#[test]
fn test_model_failure_is_propagated_and_store_untouched() {
    let mut kb = KnowledgeBase::with_strategy(
        profile(litkb::StrategyKind::Simple, 20, 5),
        Arc::new(FailingModel),
    )
    .expect("knowledge base");

    let err = kb.add_documents(&physics_documents()).unwrap_err();
    assert!(matches!(err, KnowledgeBaseError::Model { .. }));
    assert_eq!(err.status_code(), "MODEL_ERROR");
    assert_eq!(kb.state(), KnowledgeBaseState::Empty);
    assert_eq!(kb.store().next_id().value(), 0);
}

#[test]
fn test_clear_restarts_ids() -> Result<()> {
    let mut kb = small_kb();
    kb.add_documents(&physics_documents())?;
    assert_eq!(kb.state(), KnowledgeBaseState::Populated);

    kb.clear();
    assert!(kb.is_empty());
    assert!(kb.search("anything", 5)?.is_empty());

    kb.add_documents(&physics_documents()[1..])?;
    assert_eq!(kb.store().segments()[0].id().value(), 0);
    Ok(())
}

#[test]
fn test_statistics_serialize_for_reporting() -> Result<()> {
    let mut kb = small_kb();
    kb.add_documents(&physics_documents())?;

    let stats = kb.get_statistics();
    assert_eq!(stats.store.total_segments, kb.len());
    assert_eq!(stats.store.dimension, Some(384));
    assert_eq!(stats.store.documents, 2);
    assert!(stats.store.equation_segments >= 1);

    let json = serde_json::to_value(&stats)?;
    assert_eq!(json["chunking_strategy"], "context_aware");
    assert_eq!(json["embedding_model"], "hashing-bow-384");
    assert_eq!(json["state"], "Populated");

    let summary = kb.source_summary();
    assert_eq!(summary["literature"].documents, 2);
    Ok(())
}

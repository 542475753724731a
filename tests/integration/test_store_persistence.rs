//! Saving and loading knowledge bases, including damaged and foreign files.

use anyhow::Result;
use litkb::{
    Document, HashingEmbedder, KnowledgeBase, KnowledgeBaseError, Settings, StrategyKind,
    VectorDimension,
};
use std::fs;
use std::sync::Arc;

use crate::common::{RenamedModel, physics_documents, profile, small_kb, temp_dir};

#[test]
fn test_round_trip_preserves_search_results() -> Result<()> {
    let dir = temp_dir();
    let path = dir.path().join("kb").join("store.lkb");

    let mut kb = small_kb();
    kb.add_documents(&physics_documents())?;
    kb.save_to_file(&path)?;

    let mut restored = small_kb();
    let report = restored.load_from_file(&path)?;
    assert_eq!(report.segments, kb.len());
    assert_eq!(report.stored_model_id.as_deref(), Some("hashing-bow-384"));
    assert!(!report.model_mismatch);
    assert_eq!(report.profile, profile(StrategyKind::ContextAware, 20, 5));

    assert_eq!(restored.store().segments(), kb.store().segments());
    assert_eq!(
        restored.search("quantum evolution", 5)?,
        kb.search("quantum evolution", 5)?
    );

    // New ids continue after the restored ones
    restored.add_documents(&[Document::new("Fresh notes on entropy.", "new.md", "draft")])?;
    let last = restored.store().segments().last().unwrap();
    assert_eq!(last.id().value() as usize, kb.len());
    Ok(())
}

#[test]
fn test_empty_store_round_trips() -> Result<()> {
    let dir = temp_dir();
    let path = dir.path().join("empty.lkb");

    small_kb().save_to_file(&path)?;
    let mut kb = small_kb();
    let report = kb.load_from_file(&path)?;
    assert_eq!(report.segments, 0);
    assert_eq!(report.stored_model_id, None);
    assert!(kb.is_empty());
    Ok(())
}

#[test]
fn test_corrupt_files_are_rejected_without_losing_state() -> Result<()> {
    let dir = temp_dir();
    let good = dir.path().join("good.lkb");

    let mut source = small_kb();
    source.add_documents(&physics_documents())?;
    source.save_to_file(&good)?;
    let bytes = fs::read(&good)?;

    let mut future = bytes.clone();
    future[4..8].copy_from_slice(&99u32.to_le_bytes());

    let mut unversioned = bytes.clone();
    unversioned[4..8].copy_from_slice(&0u32.to_le_bytes());

    let mut flipped = bytes.clone();
    let last = flipped.len() - 1;
    flipped[last] ^= 0xff;

    let truncated = bytes[..bytes.len() / 2].to_vec();

    let cases: Vec<(&str, Vec<u8>)> = vec![
        ("future.lkb", future),
        ("unversioned.lkb", unversioned),
        ("flipped.lkb", flipped),
        ("truncated.lkb", truncated),
        ("json.lkb", br#"{"segments": []}"#.to_vec()),
        ("empty-file.lkb", Vec::new()),
    ];

    let mut kb = small_kb();
    kb.add_documents(&[Document::new("Keep me around.", "keep.md", "draft")])?;
    let before = kb.store().segments().to_vec();

    for (name, content) in cases {
        let path = dir.path().join(name);
        fs::write(&path, content)?;

        let err = kb.load_from_file(&path).unwrap_err();
        assert!(
            matches!(err, KnowledgeBaseError::CorruptStore { .. }),
            "{name}: unexpected error {err}"
        );
        assert_eq!(err.status_code(), "CORRUPT_STORE");
        assert_eq!(kb.store().segments(), before.as_slice(), "{name} altered state");
    }
    Ok(())
}

#[test]
fn test_missing_file_is_reported() {
    let dir = temp_dir();
    let mut kb = small_kb();
    let err = kb.load_from_file(dir.path().join("absent.lkb")).unwrap_err();
    assert!(matches!(err, KnowledgeBaseError::StoreNotFound { .. }));
}

#[test]
fn test_foreign_model_loads_with_warning() -> Result<()> {
    let dir = temp_dir();
    let path = dir.path().join("store.lkb");

    let mut kb = small_kb();
    kb.add_documents(&physics_documents())?;
    kb.save_to_file(&path)?;

    let mut other = KnowledgeBase::with_strategy(
        profile(StrategyKind::ContextAware, 20, 5),
        Arc::new(RenamedModel::new("other-model")),
    )?;
    let report = other.load_from_file(&path)?;
    assert!(report.model_mismatch);
    assert_eq!(report.stored_model_id.as_deref(), Some("hashing-bow-384"));

    // Same dimension, so the vectors stay searchable
    assert!(!other.search("quantum", 1)?.is_empty());

    // Mixing models in one store is refused
    let err = other
        .add_documents(&[Document::new("More text here.", "more.md", "draft")])
        .unwrap_err();
    assert!(matches!(err, KnowledgeBaseError::ModelMismatch { .. }));
    assert_eq!(other.len(), kb.len());
    Ok(())
}

#[test]
fn test_dimension_mismatch_on_query_after_foreign_load() -> Result<()> {
    let dir = temp_dir();
    let path = dir.path().join("store.lkb");

    let mut kb = small_kb();
    kb.add_documents(&physics_documents())?;
    kb.save_to_file(&path)?;

    let small_model = Arc::new(HashingEmbedder::new(VectorDimension::new(32)?));
    let mut other = KnowledgeBase::with_strategy(profile(StrategyKind::Simple, 20, 5), small_model)?;
    other.load_from_file(&path)?;

    let err = other.search("quantum", 1).unwrap_err();
    assert!(matches!(
        err,
        KnowledgeBaseError::DimensionMismatch { expected: 384, actual: 32 }
    ));
    Ok(())
}

#[test]
fn test_pinned_dimension_refuses_foreign_store() -> Result<()> {
    let dir = temp_dir();
    let path = dir.path().join("store.lkb");

    let mut kb = small_kb();
    kb.add_documents(&physics_documents())?;
    kb.save_to_file(&path)?;

    let mut settings = Settings::default();
    settings.embedding.pin_dimension = true;
    let mut pinned = KnowledgeBase::new(
        &settings,
        Arc::new(HashingEmbedder::new(VectorDimension::new(64)?)),
    )?;
    pinned.add_documents(&[Document::new("Existing content.", "x.md", "draft")])?;

    let err = pinned.load_from_file(&path).unwrap_err();
    assert!(matches!(err, KnowledgeBaseError::DimensionMismatch { .. }));
    assert_eq!(pinned.len(), 1);
    Ok(())
}

#[test]
fn test_overwrite_replaces_previous_save() -> Result<()> {
    let dir = temp_dir();
    let path = dir.path().join("store.lkb");

    let mut kb = small_kb();
    kb.add_documents(&physics_documents())?;
    kb.save_to_file(&path)?;

    kb.clear();
    kb.add_documents(&physics_documents()[..1])?;
    kb.save_to_file(&path)?;

    let mut restored = small_kb();
    restored.load_from_file(&path)?;
    assert_eq!(restored.list_documents(None).len(), 1);

    let leftovers = fs::read_dir(dir.path())?.count();
    assert_eq!(leftovers, 1, "temporary files must not be left behind");
    Ok(())
}

#[test]
fn test_loaded_profile_survives_the_next_save() -> Result<()> {
    let dir = temp_dir();
    let path = dir.path().join("store.lkb");
    let stored = profile(StrategyKind::Simple, 40, 8);

    let mut source = KnowledgeBase::with_strategy(stored, Arc::new(HashingEmbedder::default()))?;
    source.add_documents(&physics_documents())?;
    source.save_to_file(&path)?;

    let mut kb = small_kb();
    kb.load_from_file(&path)?;
    assert_eq!(kb.get_statistics().profile, stored);

    kb.add_documents(&[Document::new("Fresh notes on entropy.", "new.md", "draft")])?;
    kb.save_to_file(&path)?;

    let mut restored = small_kb();
    let report = restored.load_from_file(&path)?;
    assert_eq!(report.profile, stored);
    assert_eq!(restored.store().segments(), kb.store().segments());
    Ok(())
}

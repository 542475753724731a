//! Knowledge base driven by a real fastembed model.

use anyhow::Result;
use litkb::config::EmbeddingSettings;
use litkb::{Document, EmbeddingModel, FastEmbedModel, KnowledgeBase, Settings};
use std::sync::Arc;

/// Get a unique cache directory for each test to avoid conflicts
fn get_test_cache_dir(test_name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "litkb_test_fastembed_{}_{}",
        test_name,
        std::process::id()
    ))
}

#[test]
#[ignore = "Downloads 86MB model - run with --ignored to test"]
fn test_semantic_ranking_with_minilm() -> Result<()> {
    let settings = EmbeddingSettings {
        cache_dir: Some(get_test_cache_dir("ranking")),
        ..EmbeddingSettings::default()
    };
    let model = Arc::new(FastEmbedModel::from_settings(&settings)?);
    assert_eq!(model.dimension().get(), 384);

    let mut kb = KnowledgeBase::new(&Settings::default(), model)?;
    kb.add_documents(&[
        Document::new(
            "Photosynthesis converts light energy into chemical energy in plants.",
            "bio.pdf",
            "literature",
        ),
        Document::new(
            "The stock market fell sharply after the interest rate announcement.",
            "finance.pdf",
            "literature",
        ),
    ])?;

    let results = kb.search("How do plants make energy from sunlight?", 2)?;
    assert_eq!(results[0].segment().source_path().to_str(), Some("bio.pdf"));
    assert!(results[0].score() > results[1].score());
    Ok(())
}

//! Retrieval Integration Tests
//!
//! Ingest-then-search flows through `AppState`, including persistence of the
//! TF-IDF vocabulary across process restarts (simulated by re-initializing
//! state over the same data directory).

use ops_copilot::{AppConfig, AppState};
use ops_copilot_retrieval::{load_text_documents, ChunkingOptions, IngestOptions};

fn config_for(dir: &tempfile::TempDir) -> AppConfig {
    AppConfig {
        data_dir: dir.path().join("data"),
        raw_docs_dir: dir.path().join("raw"),
        ..AppConfig::default()
    }
}

fn write_sources(dir: &tempfile::TempDir) {
    let raw = dir.path().join("raw");
    std::fs::create_dir_all(&raw).unwrap();
    std::fs::write(
        raw.join("Finance_Guide.md"),
        "Refunds are issued within five business days of approval. \
         Disputed invoices go to the finance desk.",
    )
    .unwrap();
    std::fs::write(
        raw.join("Menu_Guide.md"),
        "Menu items can be paused when out of stock. \
         Paused items are hidden from customers.",
    )
    .unwrap();
}

#[tokio::test]
async fn ingest_from_directory_then_search() {
    let dir = tempfile::tempdir().unwrap();
    write_sources(&dir);
    let config = config_for(&dir);
    let state = AppState::initialize(config.clone()).unwrap();

    let documents = load_text_documents(&config.raw_docs_dir).unwrap();
    assert_eq!(documents.len(), 2);

    let summary = state
        .retrieval
        .ingest(&documents, &IngestOptions::default())
        .await
        .unwrap();
    assert_eq!(summary.documents, 2);
    assert!(summary.chunks >= 2);

    let passages = state.retrieval.search("refund policy", 4).await.unwrap();
    assert!(!passages.is_empty());
    assert!(passages.len() <= 4);

    // Passages are ordered ascending by distance.
    for pair in passages.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }

    // Citation metadata is present on every passage.
    for passage in &passages {
        assert!(passage.metadata.contains_key("filename"));
        assert!(passage.metadata.contains_key("page"));
        assert!(passage.metadata.contains_key("title"));
    }
}

#[tokio::test]
async fn search_survives_state_reinitialization() {
    let dir = tempfile::tempdir().unwrap();
    write_sources(&dir);
    let config = config_for(&dir);

    {
        let state = AppState::initialize(config.clone()).unwrap();
        let documents = load_text_documents(&config.raw_docs_dir).unwrap();
        state
            .retrieval
            .ingest(&documents, &IngestOptions::default())
            .await
            .unwrap();
    }

    // Fresh handles over the same data dir: vocabulary and index must be
    // rebuilt lazily from the store.
    let state = AppState::initialize(config).unwrap();
    let passages = state
        .retrieval
        .search("pause an out of stock item", 2)
        .await
        .unwrap();
    assert!(!passages.is_empty());
}

#[tokio::test]
async fn custom_chunking_options_apply() {
    let dir = tempfile::tempdir().unwrap();
    write_sources(&dir);
    let config = config_for(&dir);
    let state = AppState::initialize(config.clone()).unwrap();

    let documents = load_text_documents(&config.raw_docs_dir).unwrap();
    let options = IngestOptions {
        chunking: ChunkingOptions {
            chunk_size: 40,
            overlap: 10,
            ..ChunkingOptions::default()
        },
        rebuild: false,
    };
    let summary = state.retrieval.ingest(&documents, &options).await.unwrap();

    // Small windows over two documents produce several chunks each.
    assert!(summary.chunks > 4, "got {} chunks", summary.chunks);
}

#[tokio::test]
async fn rebuild_replaces_previous_corpus() {
    let dir = tempfile::tempdir().unwrap();
    write_sources(&dir);
    let config = config_for(&dir);
    let state = AppState::initialize(config.clone()).unwrap();

    let documents = load_text_documents(&config.raw_docs_dir).unwrap();
    state
        .retrieval
        .ingest(&documents, &IngestOptions::default())
        .await
        .unwrap();
    let count_before = state.retrieval.chunk_count().unwrap();

    // Rebuild with only one of the documents.
    let one = vec![documents[0].clone()];
    let options = IngestOptions {
        rebuild: true,
        ..IngestOptions::default()
    };
    state.retrieval.ingest(&one, &options).await.unwrap();

    assert!(state.retrieval.chunk_count().unwrap() < count_before);
}

//! Integration Tests Module
//!
//! End-to-end tests for the agent pipeline over real retrieval (TF-IDF +
//! HNSW + SQLite in a temp dir) with the synthesizer in deterministic
//! fallback mode. No network calls are made.

// Full pipeline runs across both branches
mod pipeline_test;

// Ingest-then-search retrieval flows through AppState
mod retrieval_test;

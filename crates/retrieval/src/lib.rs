//! Ops Copilot Retrieval
//!
//! The retrieval boundary for the Ops Copilot pipeline: document chunking,
//! local TF-IDF embeddings behind a pluggable provider trait, an HNSW vector
//! index, and the SQLite chunk store that is the source of truth for both.

pub mod chunker;
pub mod client;
pub mod embedding_provider;
pub mod embedding_service;
pub mod embedding_tfidf;
pub mod error;
pub mod hnsw_index;
pub mod store;

// Re-export main types
pub use chunker::{
    chunk_document, load_text_documents, split_text, ChunkingOptions, DocChunk, SourceDocument,
    DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP, DEFAULT_PAGE_SIZE,
};
pub use client::{IngestOptions, IngestSummary, Passage, RetrievalClient};
pub use embedding_provider::{EmbeddingError, EmbeddingProvider, EmbeddingResult};
pub use embedding_service::{cosine_similarity, EmbeddingService};
pub use embedding_tfidf::TfIdfEmbeddingProvider;
pub use error::{RetrievalError, RetrievalResult};
pub use hnsw_index::VectorIndex;
pub use store::{ChunkStore, StoredChunk};

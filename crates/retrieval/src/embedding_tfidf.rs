//! TF-IDF Embedding Provider Adapter
//!
//! Wraps [`EmbeddingService`] in the [`EmbeddingProvider`] trait so it can be
//! used interchangeably with remote embedding backends.
//!
//! * Pure adapter — delegates every call without changing any TF-IDF math or
//!   thread-safety guarantees.
//! * Shared ownership — holds an `Arc<EmbeddingService>` so the same service
//!   instance can be used by the trait and by vocabulary management.
//! * Sync-to-async bridge — `EmbeddingService` uses `std::sync::Mutex`; every
//!   lock acquisition is scoped tightly, never held across an await point.

use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

use crate::embedding_provider::{EmbeddingError, EmbeddingProvider, EmbeddingResult};
use crate::embedding_service::EmbeddingService;

/// Adapter that exposes [`EmbeddingService`] through the [`EmbeddingProvider`]
/// async trait.
///
/// Vocabulary management (`build_vocabulary`, `export_vocabulary`,
/// `import_vocabulary`, `is_ready`) is not part of the generic trait; those
/// are inherent methods reachable via a concrete reference or `as_any`
/// downcast.
pub struct TfIdfEmbeddingProvider {
    service: Arc<EmbeddingService>,
}

impl TfIdfEmbeddingProvider {
    /// Create a new adapter wrapping a shared `EmbeddingService`.
    pub fn new(service: Arc<EmbeddingService>) -> Self {
        Self { service }
    }

    /// Returns a reference to the underlying `EmbeddingService`.
    pub fn inner(&self) -> &EmbeddingService {
        &self.service
    }

    /// Build (or rebuild) the vocabulary from a corpus of chunk texts.
    pub fn build_vocabulary(&self, corpus: &[&str]) {
        self.service.build_vocabulary(corpus);
    }

    /// Export the current vocabulary as a JSON string, or `None` if no
    /// vocabulary has been built yet.
    pub fn export_vocabulary(&self) -> Option<String> {
        self.service.export_vocabulary()
    }

    /// Import a vocabulary from a JSON string, replacing any existing one.
    pub fn import_vocabulary(&self, json: &str) -> Result<(), String> {
        self.service.import_vocabulary(json)
    }

    /// Check whether the vocabulary has been initialised.
    pub fn is_ready(&self) -> bool {
        self.service.is_ready()
    }
}

#[async_trait]
impl EmbeddingProvider for TfIdfEmbeddingProvider {
    async fn embed_documents(&self, documents: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        // embed_batch acquires a std::sync::Mutex internally; the lock is
        // scoped within the synchronous call.
        Ok(self.service.embed_batch(documents))
    }

    async fn embed_query(&self, query: &str) -> EmbeddingResult<Vec<f32>> {
        Ok(self.service.embed_text(query))
    }

    fn dimension(&self) -> usize {
        self.service.dimension()
    }

    async fn health_check(&self) -> EmbeddingResult<()> {
        if self.service.is_ready() {
            Ok(())
        } else {
            Err(EmbeddingError::ProviderUnavailable {
                message: "TF-IDF vocabulary has not been built yet".to_string(),
            })
        }
    }

    fn is_local(&self) -> bool {
        true
    }

    fn max_batch_size(&self) -> usize {
        1000
    }

    fn display_name(&self) -> &str {
        "TF-IDF (Local)"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

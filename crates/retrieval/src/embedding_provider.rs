//! Embedding Provider Abstraction Layer
//!
//! Defines the async `EmbeddingProvider` trait and supporting types for
//! pluggable embedding backends. Embedding is a distinct responsibility from
//! answer synthesis, so it gets its own trait rather than extending
//! `LlmProvider`; the trait is object-safe (`Send + Sync`) for use across
//! Tokio tasks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during embedding operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EmbeddingError {
    /// The provider is not reachable or not initialised.
    ProviderUnavailable { message: String },

    /// A network or connection error occurred.
    NetworkError { message: String },

    /// The provider returned an unexpected or unparseable response.
    ParseError { message: String },

    /// Configuration is invalid or incomplete.
    InvalidConfig { message: String },

    /// Any other error.
    Other { message: String },
}

impl fmt::Display for EmbeddingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderUnavailable { message } => {
                write!(f, "provider unavailable: {}", message)
            }
            Self::NetworkError { message } => write!(f, "network error: {}", message),
            Self::ParseError { message } => write!(f, "parse error: {}", message),
            Self::InvalidConfig { message } => write!(f, "invalid config: {}", message),
            Self::Other { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for EmbeddingError {}

impl EmbeddingError {
    /// Whether this error is transient and the operation could be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EmbeddingError::NetworkError { .. } | EmbeddingError::ProviderUnavailable { .. }
        )
    }
}

/// Convenience alias for embedding operation results.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

// ---------------------------------------------------------------------------
// Embedding provider trait
// ---------------------------------------------------------------------------

/// Async trait for embedding providers.
///
/// Implementations produce dense vector representations of text. All vectors
/// returned from one provider instance share the same dimensionality.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of document texts into dense vectors, one per input.
    async fn embed_documents(&self, documents: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>>;

    /// Embed a single query text into a dense vector.
    ///
    /// The default implementation delegates to `embed_documents` with a
    /// single-element slice.
    async fn embed_query(&self, query: &str) -> EmbeddingResult<Vec<f32>> {
        let results = self.embed_documents(&[query]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Other {
                message: "embed_documents returned empty results for single query".to_string(),
            })
    }

    /// Returns the dimensionality of the embedding vectors produced.
    ///
    /// For TF-IDF this returns 0 until the vocabulary is built.
    fn dimension(&self) -> usize;

    /// Check if the provider is healthy and ready to embed.
    async fn health_check(&self) -> EmbeddingResult<()>;

    /// Returns whether this provider runs locally without network calls.
    fn is_local(&self) -> bool;

    /// Returns the maximum number of texts that can be embedded in a single
    /// batch request.
    fn max_batch_size(&self) -> usize;

    /// Returns a human-readable name for this provider instance.
    fn display_name(&self) -> &str;

    /// Returns `self` as `&dyn Any` to allow downcasting to concrete types.
    ///
    /// This enables accessing provider-specific methods (e.g. TF-IDF
    /// vocabulary management) through a `dyn EmbeddingProvider` reference.
    fn as_any(&self) -> &dyn Any;
}

//! LLM Provider Trait
//!
//! Defines the common interface for answer synthesis backends.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{LlmError, LlmRequestOptions, LlmResponse, LlmResult, ProviderConfig};
use ops_copilot_core::streaming::AnswerStreamEvent;

/// Trait that all synthesis backends must implement.
///
/// Provides a unified interface for:
/// - Single-shot completions (`complete`)
/// - Streaming completions (`stream_complete`)
/// - Health checking
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Get the configuration for this provider.
    fn config(&self) -> &ProviderConfig;

    /// Send a system + user prompt pair and get a complete response.
    async fn complete(
        &self,
        system: &str,
        user: &str,
        options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse>;

    /// Stream a completion via a channel.
    ///
    /// Events are sent in generation order. A dropped receiver is treated as
    /// cancellation: the provider stops reading the response body and returns
    /// with whatever it accumulated so far.
    ///
    /// # Returns
    /// Final complete response after streaming.
    async fn stream_complete(
        &self,
        system: &str,
        user: &str,
        options: LlmRequestOptions,
        tx: mpsc::Sender<AnswerStreamEvent>,
    ) -> LlmResult<LlmResponse>;

    /// Check if the provider is healthy and reachable.
    ///
    /// For API providers this validates the API key.
    async fn health_check(&self) -> LlmResult<()>;
}

/// Helper function to create an error for a missing API key.
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

/// Helper function to map HTTP error status codes to `LlmError`.
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", provider),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
            retry_after: None,
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}

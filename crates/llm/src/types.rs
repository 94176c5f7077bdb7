//! LLM Types
//!
//! Core types for answer synthesis backend interactions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors that can occur when calling a synthesis backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LlmError {
    /// Authentication failed (invalid or missing API key).
    AuthenticationFailed { message: String },

    /// The requested model was not found or is not available.
    ModelNotFound { model: String },

    /// Rate limit exceeded.
    RateLimited {
        message: String,
        retry_after: Option<u32>,
    },

    /// The request was rejected as malformed.
    InvalidRequest { message: String },

    /// A network or connection error occurred.
    NetworkError { message: String },

    /// The backend returned an unexpected or unparseable response.
    ParseError { message: String },

    /// The backend returned an HTTP error.
    ServerError {
        message: String,
        status: Option<u16>,
    },

    /// Any other error.
    Other { message: String },
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthenticationFailed { message } => {
                write!(f, "authentication failed: {}", message)
            }
            Self::ModelNotFound { model } => write!(f, "model not found: {}", model),
            Self::RateLimited { message, .. } => write!(f, "rate limited: {}", message),
            Self::InvalidRequest { message } => write!(f, "invalid request: {}", message),
            Self::NetworkError { message } => write!(f, "network error: {}", message),
            Self::ParseError { message } => write!(f, "parse error: {}", message),
            Self::ServerError { message, status } => {
                if let Some(code) = status {
                    write!(f, "server error (HTTP {}): {}", code, message)
                } else {
                    write!(f, "server error: {}", message)
                }
            }
            Self::Other { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    /// Whether this error is transient and the request could be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::NetworkError { .. }
                | LlmError::RateLimited { .. }
                | LlmError::ServerError { .. }
        )
    }
}

/// Convenience alias for synthesis backend results.
pub type LlmResult<T> = Result<T, LlmError>;

/// Configuration for an LLM provider instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key for the backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL override (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Model name to use.
    pub model: String,
    /// Maximum tokens to generate.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    768
}

fn default_temperature() -> f32 {
    0.2
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: "openai/gpt-oss-20b".to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Per-request options for provider behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmRequestOptions {
    /// Optional temperature override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_override: Option<f32>,
    /// Optional max-tokens override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens_override: Option<u32>,
}

/// Why the backend stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of the completion.
    EndTurn,
    /// The max-tokens budget was exhausted.
    MaxTokens,
    /// Anything else the backend reported.
    Other,
}

impl From<&str> for StopReason {
    fn from(raw: &str) -> Self {
        match raw {
            "stop" | "end_turn" => StopReason::EndTurn,
            "length" | "max_tokens" => StopReason::MaxTokens,
            _ => StopReason::Other,
        }
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageStats {
    /// Number of input/prompt tokens.
    pub input_tokens: u32,
    /// Number of output/completion tokens.
    pub output_tokens: u32,
}

/// A complete response from a synthesis backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Generated text, if any.
    pub content: Option<String>,
    /// Why generation stopped.
    pub stop_reason: StopReason,
    /// Token usage for the request.
    pub usage: UsageStats,
    /// Model that produced the response.
    pub model: String,
}

//! Unified Stream Event Types
//!
//! Backend-agnostic event types and adapter trait for processing incremental
//! answer synthesis output. These types are shared across the LLM crate
//! (provider implementations) and the main crate (synthesizer, CLI display).

use serde::{Deserialize, Serialize};

/// Unified streaming event emitted while an answer is being synthesized.
///
/// Fragments arrive in generation order; concatenating every `TextDelta`
/// content reconstructs the full answer. Consumers may stop receiving at any
/// point; producers treat a closed channel as cancellation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerStreamEvent {
    /// Text content delta from the synthesizer backend.
    TextDelta { content: String },

    /// Token usage information reported by the backend.
    Usage {
        input_tokens: u32,
        output_tokens: u32,
    },

    /// Error during streaming. The stream ends after this event.
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },

    /// Stream complete.
    Complete {
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_reason: Option<String>,
    },
}

/// Errors that can occur during stream adaptation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AdapterError {
    /// Invalid format that couldn't be parsed.
    InvalidFormat(String),
    /// JSON/data parsing error.
    ParseError(String),
}

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterError::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            AdapterError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for AdapterError {}

/// Trait for adapting backend-specific stream formats to unified events.
///
/// Implementations are fed one raw line at a time and may produce zero, one,
/// or multiple events per line.
pub trait StreamAdapter: Send + Sync {
    /// Returns the backend name for logging and identification.
    fn backend_name(&self) -> &'static str;

    /// Adapt a raw stream line/chunk to unified events.
    fn adapt(&mut self, input: &str) -> Result<Vec<AnswerStreamEvent>, AdapterError>;

    /// Reset adapter state for a new stream.
    fn reset(&mut self) {}
}

/// Concatenate the text deltas of a finished event sequence back into the
/// full answer text.
pub fn collect_text(events: &[AnswerStreamEvent]) -> String {
    let mut out = String::new();
    for event in events {
        if let AnswerStreamEvent::TextDelta { content } = event {
            out.push_str(content);
        }
    }
    out
}

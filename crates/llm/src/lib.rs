//! Ops Copilot LLM
//!
//! Provides a unified interface for answer synthesis backends. The only
//! shipped implementation targets Groq's OpenAI-compatible chat completions
//! API; the `LlmProvider` trait keeps the door open for others.
//!
//! Also includes the SSE streaming adapter and the HTTP client factory.

pub mod groq;
pub mod http_client;
pub mod provider;
pub mod streaming_adapters;
pub mod types;

// Re-export main types
pub use groq::GroqProvider;
pub use http_client::build_http_client;
pub use provider::LlmProvider;
pub use streaming_adapters::ChatCompletionsAdapter;
pub use types::*;

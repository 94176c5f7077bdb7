//! Streaming Adapters
//!
//! Backend-specific SSE adapters that convert raw stream lines into the
//! unified `AnswerStreamEvent` representation.

pub mod chat_completions;

pub use chat_completions::ChatCompletionsAdapter;

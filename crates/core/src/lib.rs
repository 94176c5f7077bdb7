//! Ops Copilot Core
//!
//! Shared types for the Ops Copilot workspace: the unified answer stream
//! events consumed by both the LLM crate (producers) and the main crate
//! (synthesizer, CLI display), plus the stream adapter trait.

pub mod streaming;

pub use streaming::{collect_text, AdapterError, AnswerStreamEvent, StreamAdapter};

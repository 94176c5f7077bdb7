//! Ops Copilot - Backend Library
//!
//! Retrieval-augmented question answering and action proposals for
//! operations staff. This crate hosts:
//! - The agent orchestration pipeline (router, action extractor, critic)
//! - The answer synthesis service over the LLM boundary
//! - Application configuration and shared state wiring

pub mod config;
pub mod services;
pub mod state;
pub mod utils;

// Re-export commonly used items
pub use config::AppConfig;
pub use services::agent::{
    ActionKind, ActionProposal, AgentPipeline, AgentRequest, AnswerStyle, FinalState, Intent,
    Outcome,
};
pub use services::synthesis::Synthesizer;
pub use state::AppState;
pub use utils::error::{AppError, AppResult};

//! Agent Orchestration
//!
//! The query pipeline: router, action extractor, grounding critic, and the
//! state machine that sequences them into a single request-scoped run.

pub mod action;
pub mod critic;
pub mod pipeline;
pub mod router;
pub mod state;

pub use action::{confirmation_answer, ActionExtractor};
pub use critic::GroundingCritic;
pub use pipeline::{AgentPipeline, Retriever};
pub use state::{
    ActionKind, ActionProposal, AgentRequest, AnswerStyle, FinalState, Intent, Outcome,
};

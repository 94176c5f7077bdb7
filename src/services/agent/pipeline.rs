//! Pipeline Orchestrator
//!
//! The two-branch state machine at the heart of the copilot:
//!
//! ```text
//! START → Router → Retriever → Compose → Critic → END   (knowledge)
//! START → Router → Action → END                          (action)
//! ```
//!
//! The router is the sole branch point and branch selection is a pure
//! function of the intent. There are no cycles and no retry edges; each run
//! exclusively owns its state and appends one trace line per node, so the
//! log doubles as the audit trail of the run.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use ops_copilot_retrieval::{Passage, RetrievalClient};

use super::action::{confirmation_answer, ActionExtractor};
use super::critic::GroundingCritic;
use super::router;
use super::state::{AgentRequest, FinalState, Intent, Outcome};
use crate::services::synthesis::Synthesizer;
use crate::utils::error::AppResult;

/// Retrieval boundary as seen by the pipeline.
///
/// The pipeline trusts the collaborator's ranking order (ascending distance,
/// descending relevance) and never reranks or filters.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return up to `top_k` passages for `query`, ascending by distance.
    async fn retrieve(&self, query: &str, top_k: usize) -> AppResult<Vec<Passage>>;
}

#[async_trait]
impl Retriever for RetrievalClient {
    async fn retrieve(&self, query: &str, top_k: usize) -> AppResult<Vec<Passage>> {
        Ok(self.search(query, top_k).await?)
    }
}

/// The request-scoped orchestrator.
///
/// Holds shared handles to the collaborators by reference; per-run state
/// lives entirely inside `run`.
pub struct AgentPipeline {
    retriever: Arc<dyn Retriever>,
    synthesizer: Arc<Synthesizer>,
    extractor: ActionExtractor,
    critic: GroundingCritic,
}

impl AgentPipeline {
    /// Wire a pipeline over its two external collaborators.
    pub fn new(retriever: Arc<dyn Retriever>, synthesizer: Arc<Synthesizer>) -> Self {
        Self {
            retriever,
            synthesizer,
            extractor: ActionExtractor::new(),
            critic: GroundingCritic::new(),
        }
    }

    /// Execute one request through the state machine.
    ///
    /// Every step is total except retrieval-store I/O, which is the only
    /// error path; synthesis and extraction degrade instead of failing.
    pub async fn run(&self, request: AgentRequest) -> AppResult<FinalState> {
        let mut log: Vec<String> = Vec::new();

        let intent = router::route(&request.query);
        log.push(format!("Router → {}", intent));
        debug!(query = %request.query, %intent, "Routed query");

        match intent {
            Intent::Knowledge => {
                let contexts = self
                    .retriever
                    .retrieve(&request.query, request.top_k)
                    .await?;
                log.push("Retriever → Compose".to_string());

                let answer = self
                    .synthesizer
                    .answer(&request.query, &contexts, request.style, request.temperature)
                    .await;
                log.push("Compose → Critic".to_string());

                let grounded = self.critic.check_grounded(&answer);
                log.push(format!("Critic → END (grounded={})", grounded));

                Ok(FinalState {
                    query: request.query,
                    intent,
                    answer,
                    log,
                    outcome: Outcome::Knowledge { contexts, grounded },
                })
            }
            Intent::Action => {
                let proposed_action = self.extractor.extract(&request.query);
                log.push(format!("Action → END (proposed={})", proposed_action.kind));

                let answer = confirmation_answer(proposed_action.kind);

                Ok(FinalState {
                    query: request.query,
                    intent,
                    answer,
                    log,
                    outcome: Outcome::Action { proposed_action },
                })
            }
        }
    }
}

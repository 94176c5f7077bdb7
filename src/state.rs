//! Application State
//!
//! The dependency-injection container wired once at process start. Expensive
//! shared handles (chunk store, embedding service, vector index, HTTP
//! client) live behind `Arc` here and are passed into the pipeline by
//! reference — no ambient globals.

use std::sync::Arc;

use ops_copilot_llm::{GroqProvider, LlmProvider, ProviderConfig};
use ops_copilot_retrieval::{
    ChunkStore, EmbeddingProvider, EmbeddingService, RetrievalClient, TfIdfEmbeddingProvider,
};
use tracing::info;

use crate::config::AppConfig;
use crate::services::agent::pipeline::{AgentPipeline, Retriever};
use crate::services::synthesis::Synthesizer;
use crate::utils::error::AppResult;

/// Shared application state.
pub struct AppState {
    pub config: AppConfig,
    pub retrieval: Arc<RetrievalClient>,
    pub synthesizer: Arc<Synthesizer>,
    pub pipeline: Arc<AgentPipeline>,
}

impl AppState {
    /// Construct every shared handle and wire the pipeline.
    pub fn initialize(config: AppConfig) -> AppResult<Self> {
        let store = ChunkStore::open(&config.db_path())?;

        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(TfIdfEmbeddingProvider::new(
            Arc::new(EmbeddingService::new()),
        ));
        let retrieval = Arc::new(RetrievalClient::new(store, embedder));

        let provider: Option<Arc<dyn LlmProvider>> = match &config.groq_api_key {
            Some(key) => {
                let provider_config = ProviderConfig {
                    api_key: Some(key.clone()),
                    base_url: config.groq_base_url.clone(),
                    model: config.groq_model.clone(),
                    ..ProviderConfig::default()
                };
                Some(Arc::new(GroqProvider::new(provider_config)) as Arc<dyn LlmProvider>)
            }
            None => {
                info!("No GROQ_API_KEY configured; synthesis runs in fallback mode");
                None
            }
        };
        let synthesizer = Arc::new(Synthesizer::new(provider));

        let pipeline = Arc::new(AgentPipeline::new(
            Arc::clone(&retrieval) as Arc<dyn Retriever>,
            Arc::clone(&synthesizer),
        ));

        Ok(Self {
            config,
            retrieval,
            synthesizer,
            pipeline,
        })
    }
}

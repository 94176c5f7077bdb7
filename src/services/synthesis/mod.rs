//! Answer Synthesis
//!
//! Composes cited answers from retrieved passages via the configured LLM
//! provider. This boundary is total from the pipeline's point of view: an
//! unconfigured backend yields a fixed fallback string, and a failed call
//! yields a fallback embedding the failure reason — never an error.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

use ops_copilot_core::streaming::AnswerStreamEvent;
use ops_copilot_llm::{LlmProvider, LlmRequestOptions};
use ops_copilot_retrieval::Passage;

use crate::services::agent::state::{AnswerStyle, MAX_TEMPERATURE, MIN_TEMPERATURE};

/// Fallback answer when no backend is configured.
pub const DISABLED_FALLBACK: &str =
    "[LLM disabled] Provide GROQ_API_KEY in .env. Proceed with retrieved sources below.";

/// Instructions sent with every synthesis request.
const SYSTEM_PROMPT: &str = "You are an operations copilot for finance, menu, onboarding, and platform workflows. \
Use ONLY the provided context to answer. If the context is insufficient, say you are unsure and list what is missing. \
Write in clear, professional, natural English for an operations audience. Prefer concise but complete explanations. \
Formatting requirements:\n\
- Start with a one-sentence executive summary.\n\
- Then provide a numbered step-by-step procedure.\n\
- Add short 'Notes' for edge cases, validation, or policies if relevant.\n\
- Cite sources inline using [filename pX] exactly where claims are supported.\n\
Do NOT reveal chain-of-thought; return only the final answer.";

/// Streaming channel capacity. Small and bounded: the producer naturally
/// throttles against a slow consumer.
const STREAM_CHANNEL_CAPACITY: usize = 32;

/// Answer composition boundary over an optional LLM provider.
pub struct Synthesizer {
    provider: Option<Arc<dyn LlmProvider>>,
}

impl Synthesizer {
    /// Create a synthesizer. `None` means fallback mode: every request
    /// yields the fixed disabled-backend string.
    pub fn new(provider: Option<Arc<dyn LlmProvider>>) -> Self {
        Self { provider }
    }

    /// Whether a backend is configured.
    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// Synthesize a cited answer for `query` over `contexts`.
    ///
    /// Total: returns a fallback string instead of erroring when the backend
    /// is unconfigured or the call fails.
    pub async fn answer(
        &self,
        query: &str,
        contexts: &[Passage],
        style: AnswerStyle,
        temperature: f32,
    ) -> String {
        let Some(provider) = &self.provider else {
            return DISABLED_FALLBACK.to_string();
        };

        let options = LlmRequestOptions {
            temperature_override: Some(temperature.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)),
            max_tokens_override: None,
        };

        match provider
            .complete(&system_message(style), &build_user_prompt(query, contexts), options)
            .await
        {
            Ok(response) => response.content.unwrap_or_default().trim().to_string(),
            Err(e) => {
                warn!("Synthesis call failed: {}", e);
                error_fallback(&e.to_string())
            }
        }
    }

    /// Stream an answer as ordered text fragments.
    ///
    /// The receiver may be dropped at any point; the producer treats that as
    /// cancellation. In fallback mode the placeholder arrives as a single
    /// fragment followed by a completion event.
    pub fn stream_answer(
        &self,
        query: &str,
        contexts: &[Passage],
        style: AnswerStyle,
        temperature: f32,
    ) -> mpsc::Receiver<AnswerStreamEvent> {
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);

        let provider = self.provider.clone();
        let system = system_message(style);
        let user = build_user_prompt(query, contexts);
        let options = LlmRequestOptions {
            temperature_override: Some(temperature.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)),
            max_tokens_override: None,
        };

        tokio::spawn(async move {
            let Some(provider) = provider else {
                let _ = tx
                    .send(AnswerStreamEvent::TextDelta {
                        content: DISABLED_FALLBACK.to_string(),
                    })
                    .await;
                let _ = tx
                    .send(AnswerStreamEvent::Complete { stop_reason: None })
                    .await;
                return;
            };

            if let Err(e) = provider
                .stream_complete(&system, &user, options, tx.clone())
                .await
            {
                warn!("Streaming synthesis failed: {}", e);
                let _ = tx
                    .send(AnswerStreamEvent::TextDelta {
                        content: error_fallback(&e.to_string()),
                    })
                    .await;
                let _ = tx
                    .send(AnswerStreamEvent::Complete { stop_reason: None })
                    .await;
            }
        });

        rx
    }
}

/// Fallback string embedding the failure reason.
fn error_fallback(reason: &str) -> String {
    format!("[LLM error] {}. Proceed with retrieved sources below.", reason)
}

/// Render retrieved passages into the context block fed to the backend.
fn format_context_block(contexts: &[Passage]) -> String {
    let chunks: Vec<String> = contexts
        .iter()
        .map(|c| {
            let src = c
                .metadata
                .get("filename")
                .or_else(|| c.metadata.get("source"))
                .map(|s| s.as_str())
                .unwrap_or("");
            let page = c.metadata.get("page").map(|s| s.as_str()).unwrap_or("?");
            format!("Source: {} p{}\n{}", src, page, c.document)
        })
        .collect();
    chunks.join("\n\n---\n\n")
}

/// Build the user prompt with context block and question.
fn build_user_prompt(query: &str, contexts: &[Passage]) -> String {
    format!(
        "Context:\n{}\n\nQuestion: {}\nAnswer:",
        format_context_block(contexts),
        query
    )
}

/// System prompt with the style-specific verbosity suffix.
fn system_message(style: AnswerStyle) -> String {
    let suffix = match style {
        AnswerStyle::Concise => {
            " Focus on brevity. Use at most 6-8 bullets in the procedure."
        }
        AnswerStyle::Detailed => {
            " Provide rich, detailed steps and short rationale where helpful."
        }
    };
    format!("{}{}", SYSTEM_PROMPT, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ops_copilot_llm::{
        LlmError, LlmResponse, LlmResult, ProviderConfig, StopReason, UsageStats,
    };
    use std::collections::HashMap;

    /// Backend double: either answers with canned text or always fails.
    struct MockProvider {
        config: ProviderConfig,
        response_text: Option<String>,
    }

    impl MockProvider {
        fn answering(text: &str) -> Self {
            Self {
                config: ProviderConfig::default(),
                response_text: Some(text.to_string()),
            }
        }

        fn failing() -> Self {
            Self {
                config: ProviderConfig::default(),
                response_text: None,
            }
        }
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn model(&self) -> &str {
            &self.config.model
        }

        fn config(&self) -> &ProviderConfig {
            &self.config
        }

        async fn complete(
            &self,
            _system: &str,
            _user: &str,
            _options: LlmRequestOptions,
        ) -> LlmResult<LlmResponse> {
            match &self.response_text {
                Some(text) => Ok(LlmResponse {
                    content: Some(text.clone()),
                    stop_reason: StopReason::EndTurn,
                    usage: UsageStats::default(),
                    model: self.config.model.clone(),
                }),
                None => Err(LlmError::NetworkError {
                    message: "connection refused".to_string(),
                }),
            }
        }

        async fn stream_complete(
            &self,
            _system: &str,
            _user: &str,
            _options: LlmRequestOptions,
            tx: mpsc::Sender<AnswerStreamEvent>,
        ) -> LlmResult<LlmResponse> {
            match &self.response_text {
                Some(text) => {
                    for piece in text.split_inclusive(' ') {
                        let _ = tx
                            .send(AnswerStreamEvent::TextDelta {
                                content: piece.to_string(),
                            })
                            .await;
                    }
                    let _ = tx
                        .send(AnswerStreamEvent::Complete {
                            stop_reason: Some("stop".to_string()),
                        })
                        .await;
                    Ok(LlmResponse {
                        content: Some(text.clone()),
                        stop_reason: StopReason::EndTurn,
                        usage: UsageStats::default(),
                        model: self.config.model.clone(),
                    })
                }
                None => Err(LlmError::NetworkError {
                    message: "connection refused".to_string(),
                }),
            }
        }

        async fn health_check(&self) -> LlmResult<()> {
            Ok(())
        }
    }

    fn passage(filename: &str, page: &str, text: &str) -> Passage {
        let mut metadata = HashMap::new();
        metadata.insert("filename".to_string(), filename.to_string());
        metadata.insert("page".to_string(), page.to_string());
        Passage {
            document: text.to_string(),
            metadata,
            distance: 0.1,
        }
    }

    #[tokio::test]
    async fn unconfigured_backend_yields_fixed_fallback() {
        let synthesizer = Synthesizer::new(None);
        let answer = synthesizer
            .answer("q", &[], AnswerStyle::Detailed, 0.2)
            .await;
        assert_eq!(answer, DISABLED_FALLBACK);
    }

    #[tokio::test]
    async fn failing_backend_yields_error_fallback() {
        let synthesizer = Synthesizer::new(Some(Arc::new(MockProvider::failing())));
        let answer = synthesizer
            .answer("q", &[], AnswerStyle::Detailed, 0.2)
            .await;
        assert!(answer.starts_with("[LLM error]"));
        assert!(answer.ends_with("Proceed with retrieved sources below."));
    }

    #[tokio::test]
    async fn configured_backend_answer_passes_through() {
        let synthesizer = Synthesizer::new(Some(Arc::new(MockProvider::answering(
            "Refunds take five days [Finance_Guide p3].",
        ))));
        let answer = synthesizer
            .answer("refunds?", &[], AnswerStyle::Concise, 0.2)
            .await;
        assert_eq!(answer, "Refunds take five days [Finance_Guide p3].");
    }

    #[tokio::test]
    async fn stream_fallback_is_single_fragment_then_complete() {
        let synthesizer = Synthesizer::new(None);
        let mut rx = synthesizer.stream_answer("q", &[], AnswerStyle::Detailed, 0.2);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            AnswerStreamEvent::TextDelta {
                content: DISABLED_FALLBACK.to_string()
            }
        );
        assert!(matches!(events[1], AnswerStreamEvent::Complete { .. }));
    }

    #[tokio::test]
    async fn stream_fragments_concatenate_to_full_answer() {
        let text = "Refunds take five days [Finance_Guide p3].";
        let synthesizer = Synthesizer::new(Some(Arc::new(MockProvider::answering(text))));
        let mut rx = synthesizer.stream_answer("refunds?", &[], AnswerStyle::Detailed, 0.2);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(ops_copilot_core::streaming::collect_text(&events), text);
        assert!(matches!(
            events.last(),
            Some(AnswerStreamEvent::Complete { .. })
        ));
    }

    #[tokio::test]
    async fn dropped_receiver_does_not_panic_producer() {
        let synthesizer = Synthesizer::new(Some(Arc::new(MockProvider::answering(
            "long answer with several fragments to send",
        ))));
        let rx = synthesizer.stream_answer("q", &[], AnswerStyle::Detailed, 0.2);
        drop(rx);
        // Give the producer task a chance to run against the closed channel.
        tokio::task::yield_now().await;
    }

    #[test]
    fn context_block_formats_sources() {
        let contexts = vec![
            passage("Finance_Guide.md", "3", "Refunds take five days."),
            passage("Menu_Guide.md", "1", "Items can be paused."),
        ];
        let block = format_context_block(&contexts);
        assert!(block.contains("Source: Finance_Guide.md p3"));
        assert!(block.contains("Source: Menu_Guide.md p1"));
        assert!(block.contains("\n\n---\n\n"));
    }

    #[test]
    fn empty_context_block_is_empty() {
        assert_eq!(format_context_block(&[]), "");
        let prompt = build_user_prompt("what is the policy", &[]);
        assert!(prompt.starts_with("Context:\n\n"));
        assert!(prompt.contains("Question: what is the policy"));
    }

    #[test]
    fn system_message_varies_by_style() {
        let concise = system_message(AnswerStyle::Concise);
        let detailed = system_message(AnswerStyle::Detailed);
        assert!(concise.contains("brevity"));
        assert!(detailed.contains("detailed steps"));
        assert!(concise.starts_with("You are an operations copilot"));
    }
}

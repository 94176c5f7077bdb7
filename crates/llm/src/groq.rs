//! Groq Provider
//!
//! Implementation of the `LlmProvider` trait for Groq's OpenAI-compatible
//! chat completions API. Supports single-shot and SSE-streamed completions.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;

use super::provider::{missing_api_key_error, parse_http_error, LlmProvider};
use super::types::{
    LlmError, LlmRequestOptions, LlmResponse, LlmResult, ProviderConfig, StopReason, UsageStats,
};
use crate::http_client::build_http_client;
use crate::streaming_adapters::ChatCompletionsAdapter;
use ops_copilot_core::streaming::{AnswerStreamEvent, StreamAdapter};

/// Default Groq chat completions endpoint.
const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default Groq models listing endpoint, used for health checks.
const GROQ_MODELS_URL: &str = "https://api.groq.com/openai/v1/models";

/// Groq provider speaking the OpenAI-compatible chat completions protocol.
pub struct GroqProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl GroqProvider {
    /// Create a new Groq provider with the given configuration.
    pub fn new(config: ProviderConfig) -> Self {
        let client = build_http_client();
        Self { config, client }
    }

    /// Get the chat completions URL.
    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(GROQ_API_URL)
    }

    /// Build the request body for the API.
    fn build_request_body(
        &self,
        system: &str,
        user: &str,
        stream: bool,
        options: &LlmRequestOptions,
    ) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": options
                .max_tokens_override
                .unwrap_or(self.config.max_tokens),
            "temperature": options
                .temperature_override
                .unwrap_or(self.config.temperature),
            "stream": stream,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        if stream {
            body["stream_options"] = serde_json::json!({ "include_usage": true });
        }

        body
    }

    /// Parse a non-streaming response.
    fn parse_response(&self, response: &GroqResponse) -> LlmResponse {
        let choice = response.choices.first();

        let content = choice
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.clone())
            .map(|s| s.trim().to_string());

        let stop_reason = choice
            .and_then(|c| c.finish_reason.as_deref())
            .map(StopReason::from)
            .unwrap_or(StopReason::EndTurn);

        let usage = response
            .usage
            .as_ref()
            .map(|u| UsageStats {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        LlmResponse {
            content,
            stop_reason,
            usage,
            model: response.model.clone(),
        }
    }
}

#[async_trait]
impl LlmProvider for GroqProvider {
    fn name(&self) -> &'static str {
        "groq"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error("groq"))?;

        let body = self.build_request_body(system, user, false, &options);

        let response = self
            .client
            .post(self.base_url())
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
            message: e.to_string(),
        })?;

        if status != 200 {
            return Err(parse_http_error(status, &body_text, "groq"));
        }

        let groq_response: GroqResponse =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse response: {}", e),
            })?;

        Ok(self.parse_response(&groq_response))
    }

    async fn stream_complete(
        &self,
        system: &str,
        user: &str,
        options: LlmRequestOptions,
        tx: mpsc::Sender<AnswerStreamEvent>,
    ) -> LlmResult<LlmResponse> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error("groq"))?;

        let body = self.build_request_body(system, user, true, &options);

        let response = self
            .client
            .post(self.base_url())
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;
            return Err(parse_http_error(status, &body_text, "groq"));
        }

        // Process the SSE stream line by line.
        let mut adapter = ChatCompletionsAdapter::new();
        let mut accumulated_content = String::new();
        let mut usage = UsageStats::default();
        let mut stop_reason = StopReason::EndTurn;
        let mut cancelled = false;
        let mut completed = false;

        let mut stream = response.bytes_stream();
        use futures_util::StreamExt;

        let mut buffer = String::new();

        'read: while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

            buffer.push_str(&String::from_utf8_lossy(&chunk));

            // Process complete lines
            while let Some(line_end) = buffer.find('\n') {
                let line = buffer[..line_end].to_string();
                buffer = buffer[line_end + 1..].to_string();

                if line.trim().is_empty() {
                    continue;
                }

                let events = match adapter.adapt(&line) {
                    Ok(events) => events,
                    Err(e) => {
                        tracing::warn!("Skipping unparseable SSE line: {}", e);
                        continue;
                    }
                };

                for event in events {
                    match &event {
                        AnswerStreamEvent::TextDelta { content } => {
                            accumulated_content.push_str(content);
                        }
                        AnswerStreamEvent::Usage {
                            input_tokens,
                            output_tokens,
                        } => {
                            usage.input_tokens = *input_tokens;
                            usage.output_tokens = *output_tokens;
                        }
                        AnswerStreamEvent::Complete {
                            stop_reason: Some(reason),
                        } => {
                            stop_reason = StopReason::from(reason.as_str());
                            completed = true;
                        }
                        _ => {}
                    }

                    // A dropped receiver means the caller abandoned the
                    // stream; stop reading instead of erroring.
                    if tx.send(event).await.is_err() {
                        cancelled = true;
                        break 'read;
                    }
                }
            }
        }

        // Streams that end without a finish_reason chunk still owe the
        // consumer a terminal event.
        if !cancelled && !completed {
            let _ = tx
                .send(AnswerStreamEvent::Complete {
                    stop_reason: Some("stop".to_string()),
                })
                .await;
        }

        Ok(LlmResponse {
            content: if accumulated_content.is_empty() {
                None
            } else {
                Some(accumulated_content)
            },
            stop_reason,
            usage,
            model: self.config.model.clone(),
        })
    }

    async fn health_check(&self) -> LlmResult<()> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error("groq"))?;

        let url = match &self.config.base_url {
            Some(base) => base.replace("/chat/completions", "/models"),
            None => GROQ_MODELS_URL.to_string(),
        };

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(parse_http_error(status, &body, "groq"));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GroqResponse {
    #[serde(default)]
    choices: Vec<GroqChoice>,
    #[serde(default)]
    usage: Option<GroqUsage>,
    #[serde(default)]
    model: String,
}

#[derive(Debug, Deserialize)]
struct GroqChoice {
    #[serde(default)]
    message: Option<GroqMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroqMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroqUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

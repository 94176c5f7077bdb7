//! Chat Completions SSE Stream Adapter
//!
//! Handles the OpenAI-compatible SSE format used by Groq's chat completions
//! endpoint: `data: {...}` lines carrying content deltas, a final usage
//! chunk, and a `data: [DONE]` terminator.

use ops_copilot_core::streaming::{AdapterError, AnswerStreamEvent, StreamAdapter};
use serde::Deserialize;

/// Internal event types from the chat completions SSE format.
#[derive(Debug, Deserialize)]
struct ChatCompletionsEvent {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Option<Delta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// Adapter for the OpenAI-compatible chat completions SSE format.
///
/// Stateless: every SSE line is self-contained in this format, so the
/// adapter carries no accumulation buffers.
pub struct ChatCompletionsAdapter;

impl ChatCompletionsAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ChatCompletionsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamAdapter for ChatCompletionsAdapter {
    fn backend_name(&self) -> &'static str {
        "chat_completions"
    }

    fn adapt(&mut self, input: &str) -> Result<Vec<AnswerStreamEvent>, AdapterError> {
        let trimmed = input.trim();

        // Handle SSE format: "data: {...}"
        let json_str = if let Some(rest) = trimmed.strip_prefix("data: ") {
            rest
        } else if trimmed.is_empty() || trimmed.starts_with(':') {
            // Blank keep-alive or SSE comment line
            return Ok(vec![]);
        } else {
            trimmed
        };

        if json_str.is_empty() || json_str == "[DONE]" {
            return Ok(vec![]);
        }

        let event: ChatCompletionsEvent =
            serde_json::from_str(json_str).map_err(|e| AdapterError::ParseError(e.to_string()))?;

        let mut events = vec![];

        if let Some(usage) = event.usage {
            events.push(AnswerStreamEvent::Usage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            });
        }

        for choice in event.choices {
            if let Some(finish_reason) = choice.finish_reason {
                events.push(AnswerStreamEvent::Complete {
                    stop_reason: Some(finish_reason),
                });
                continue;
            }

            if let Some(delta) = choice.delta {
                if let Some(content) = delta.content {
                    if !content.is_empty() {
                        events.push(AnswerStreamEvent::TextDelta { content });
                    }
                }
            }
        }

        Ok(events)
    }
}

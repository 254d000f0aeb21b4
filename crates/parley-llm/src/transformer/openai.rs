use parley_core::{ChatCompletionRequest, ChatCompletionResponse, ChatUsage, FinishReason, ModelInfo};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ConversionError;

/// Marker payload that ends an SSE completion stream
pub const DONE_MARKER: &str = "[DONE]";

/// One decoded SSE `data:` record
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Delta {
        content: Option<String>,
        finish_reason: Option<FinishReason>,
    },
    Done,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct WireStreamChunk {
    #[serde(default)]
    choices: Vec<WireStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct WireStreamChoice {
    #[serde(default)]
    delta: WireDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireModelList {
    #[serde(default)]
    data: Vec<ModelInfo>,
}

/// OpenAI-compatible schema transformer
/// Works with LM Studio and any server exposing `/v1/chat/completions`
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiTransformer;

impl OpenAiTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Build the JSON body for `/v1/chat/completions`
    pub fn transform_request(&self, request: &ChatCompletionRequest, model: &str, stream: bool) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m| {
                json!({
                    "role": m.role.to_string(),
                    "content": m.content,
                })
            })
            .collect();

        let mut body = json!({
            "model": model,
            "messages": messages,
            "stream": stream,
        });

        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }

        body
    }

    /// Parse a complete (non-streaming) response body
    pub fn parse_response(&self, body: &str) -> Result<ChatCompletionResponse, ConversionError> {
        let wire: WireResponse = serde_json::from_str(body)?;
        let choice = wire
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ConversionError::MissingField("choices".to_string()))?;

        let usage = wire
            .usage
            .map(|u| ChatUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: if u.total_tokens == 0 {
                    u.prompt_tokens.saturating_add(u.completion_tokens)
                } else {
                    u.total_tokens
                },
            })
            .unwrap_or_default();

        Ok(ChatCompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            model: wire.model,
            usage,
        })
    }

    /// Parse the `data` payload of one SSE record
    pub fn parse_stream_data(&self, data: &str) -> Result<StreamEvent, ConversionError> {
        let data = data.trim();
        if data == DONE_MARKER {
            return Ok(StreamEvent::Done);
        }

        let chunk: WireStreamChunk = serde_json::from_str(data)?;
        let Some(choice) = chunk.choices.into_iter().next() else {
            return Ok(StreamEvent::Delta {
                content: None,
                finish_reason: None,
            });
        };

        Ok(StreamEvent::Delta {
            content: choice.delta.content.filter(|c| !c.is_empty()),
            finish_reason: choice.finish_reason.as_deref().map(FinishReason::parse),
        })
    }

    /// Parse the body of `GET /v1/models`
    pub fn parse_models(&self, body: &str) -> Result<Vec<ModelInfo>, ConversionError> {
        let list: WireModelList = serde_json::from_str(body)?;
        Ok(list.data)
    }
}

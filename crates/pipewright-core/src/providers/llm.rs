//! Chat-completion gateway seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;
use crate::models::ai_model::AiModel;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

impl From<ChatMessage> for Value {
    fn from(message: ChatMessage) -> Self {
        serde_json::json!({ "role": message.role, "content": message.content })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatRequest {
    /// Provider-shaped messages. Caller-supplied lists are kept verbatim,
    /// so content may be a string or a list of parts.
    pub messages: Vec<Value>,
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Read the `usage` block of an OpenAI-style response, if it has one.
    pub fn from_response(raw: &Value) -> Option<Self> {
        let usage = raw.get("usage")?;
        if !usage.is_object() {
            return None;
        }
        serde_json::from_value(usage.clone()).ok()
    }
}

#[derive(Debug, Clone)]
pub struct ChatCompletion {
    /// Provider response body, returned verbatim as the step output.
    pub raw: Value,
    pub usage: Option<TokenUsage>,
}

impl ChatCompletion {
    pub fn from_raw(raw: Value) -> Self {
        let usage = TokenUsage::from_response(&raw);
        Self { raw, usage }
    }
}

#[async_trait]
pub trait LlmGateway: Send + Sync {
    async fn chat(&self, request: &ChatRequest, model: &AiModel) -> Result<ChatCompletion, EngineError>;
}

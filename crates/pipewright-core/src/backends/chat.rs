//! Templated chat-completion backend.

use serde_json::{Map, Value};

use super::config::ChatConfig;
use super::StepContext;
use crate::error::EngineError;
use crate::models::ai_model::AiModel;
use crate::models::business_context::ManualContext;
use crate::providers::llm::{ChatMessage, ChatRequest, LlmGateway};
use crate::store::AiModelStore;
use crate::usage::{UsageEvent, UsageRecorder};

#[derive(Debug, Clone, PartialEq)]
pub struct ChatPlan {
    pub config: ChatConfig,
    /// Only skill-bound prompt steps receive the run's manual.
    pub inject_manual: bool,
    /// Recorded as the usage `app_name`.
    pub app_name: String,
}

pub(crate) fn system_prompt(config: &ChatConfig, manual: Option<&ManualContext>) -> String {
    let base = config.base_system_prompt();
    match manual {
        Some(m) => format!(
            "{}\n\n=== BUSINESS MANUAL (SOP) ===\n{}\n\n=== INSTRUCTIONS ===\nFollow the manual strictly.",
            base, m.content
        ),
        None => base.to_string(),
    }
}

/// A caller-owned message list: every element an object with a string `role`.
fn passthrough_messages(input: &Map<String, Value>) -> Option<Vec<Value>> {
    let messages = input.get("messages")?.as_array()?;
    let well_formed = !messages.is_empty()
        && messages
            .iter()
            .all(|m| m.get("role").and_then(Value::as_str).is_some());
    well_formed.then(|| messages.clone())
}

pub(crate) fn build_request(
    config: &ChatConfig,
    input: &Map<String, Value>,
    manual: Option<&ManualContext>,
) -> ChatRequest {
    let temperature = config.temperature.unwrap_or(ChatConfig::DEFAULT_TEMPERATURE);

    if let Some(messages) = passthrough_messages(input) {
        return ChatRequest {
            messages,
            temperature: input
                .get("temperature")
                .and_then(Value::as_f64)
                .unwrap_or(temperature),
            max_tokens: config.max_tokens,
        };
    }

    let user_content = config
        .prompt
        .clone()
        .or_else(|| input.get("prompt").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| Value::Object(input.clone()).to_string());

    ChatRequest {
        messages: vec![
            ChatMessage::system(system_prompt(config, manual)).into(),
            ChatMessage::user(user_content).into(),
        ],
        temperature,
        max_tokens: config.max_tokens,
    }
}

async fn resolve_model(models: &AiModelStore, model_id: Option<&str>) -> Result<AiModel, EngineError> {
    if let Some(id) = model_id {
        if let Some(model) = models.get(id).await? {
            return Ok(model);
        }
        tracing::warn!(model_id = id, "Configured model not found; using the active model");
    }
    models.first_active().await?.ok_or_else(|| {
        EngineError::Configuration("No AI model configured (active or specified)".to_string())
    })
}

pub(crate) async fn execute(
    gateway: &dyn LlmGateway,
    models: &AiModelStore,
    usage: &UsageRecorder,
    plan: &ChatPlan,
    input: &Map<String, Value>,
    ctx: &StepContext<'_>,
) -> Result<Value, EngineError> {
    let model = resolve_model(models, plan.config.model_id.as_deref()).await?;
    let manual = if plan.inject_manual { ctx.manual } else { None };
    let request = build_request(&plan.config, input, manual);

    let completion = gateway.chat(&request, &model).await?;

    if let (Some(tokens), Some(user_id)) = (completion.usage, ctx.identity) {
        usage
            .record(UsageEvent {
                user_id,
                app_name: &plan.app_name,
                model_name: &model.name,
                tokens_input: tokens.prompt_tokens,
                tokens_output: tokens.completion_tokens,
                total_tokens: tokens.total_tokens,
                trace_id: Some(ctx.trace_id),
            })
            .await;
    }

    Ok(completion.raw)
}

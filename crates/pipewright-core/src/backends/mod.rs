//! Execution backends.
//!
//! Each step's component is resolved once into an [`ExecutionBackend`],
//! then executed by [`Backends`]. Every backend returns a
//! [`BackendOutput`]; problems that end the run are `Err(EngineError)`,
//! while unsupported or unknown component types produce an `{error}`
//! payload and the run carries on.

pub mod chat;
pub mod config;
pub mod http;
pub mod ocr;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};

use crate::config::{EngineConfig, OcrPolling};
use crate::error::EngineError;
use crate::models::business_context::ManualContext;
use crate::models::component::Component;
use crate::models::skill::{Skill, SkillType};
use crate::providers::{DocumentAnalysisProvider, LlmGateway};
use crate::store::AiModelStore;
use crate::usage::UsageRecorder;

pub use chat::ChatPlan;
pub use config::{layered, ChatConfig, HttpConfig, MockConfig, OcrConfig, Overlay, PythonFuncConfig};

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionBackend {
    Http(HttpConfig),
    Chat(ChatPlan),
    Ocr(OcrConfig),
    Mock(MockConfig),
    PythonFunc(PythonFuncConfig),
    /// Resolves to a soft error carrying this message.
    Unsupported(String),
}

impl ExecutionBackend {
    /// Resolve a component (and its skill, if bound) plus the step's own
    /// overrides. Layers apply skill, then component, then step.
    pub fn resolve(
        component: &Component,
        skill: Option<&Skill>,
        step_config: &Map<String, Value>,
    ) -> Result<Self, EngineError> {
        if let Some(skill) = skill {
            let layers = [&skill.configuration, &component.configuration, step_config];
            return Ok(match skill.skill_type {
                SkillType::LlmPrompt => Self::Chat(ChatPlan {
                    config: layered(&layers)?,
                    inject_manual: true,
                    app_name: skill.name.clone(),
                }),
                SkillType::ApiCall => Self::Http(layered(&layers)?),
                SkillType::PythonFunc => Self::PythonFunc(layered(&layers)?),
                SkillType::RuleEngine => {
                    Self::Unsupported(format!("Unsupported Skill Type: {}", skill.skill_type))
                }
            });
        }

        let layers = [&component.configuration, step_config];
        Ok(match component.kind() {
            Some("http") => Self::Http(layered(&layers)?),
            Some("azure_openai") => Self::Chat(ChatPlan {
                config: layered(&layers)?,
                inject_manual: false,
                app_name: component.name.clone(),
            }),
            Some("ocr_api") => Self::Ocr(layered(&layers)?),
            Some("mock") => Self::Mock(layered(&layers)?),
            other => Self::Unsupported(format!(
                "Unknown component kind: {}",
                other.unwrap_or("None")
            )),
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Chat(_) => "chat",
            Self::Ocr(_) => "ocr",
            Self::Mock(_) => "mock",
            Self::PythonFunc(_) => "python_func",
            Self::Unsupported(_) => "unsupported",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendOutput {
    pub payload: Value,
    /// Set when the payload carries an error the run does not stop for.
    pub soft_error: Option<String>,
}

impl BackendOutput {
    pub fn ok(payload: Value) -> Self {
        Self {
            payload,
            soft_error: None,
        }
    }

    pub fn soft(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            payload: json!({ "error": message }),
            soft_error: Some(message),
        }
    }
}

/// Per-run facts a backend may need.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub identity: Option<&'a str>,
    pub manual: Option<&'a ManualContext>,
    pub trace_id: &'a str,
}

fn python_placeholder(config: &PythonFuncConfig) -> Value {
    let target = match (&config.module, &config.function) {
        (Some(module), Some(function)) => format!("{}.{}", module, function),
        _ => config
            .folder_path
            .clone()
            .unwrap_or_else(|| "<unresolved>".to_string()),
    };
    json!({
        "status": "not_executed",
        "message": "PYTHON_FUNC execution is not implemented",
        "debug": format!("Would run {}", target),
    })
}

pub struct Backends {
    http: reqwest::Client,
    http_timeout: Duration,
    llm: Arc<dyn LlmGateway>,
    documents: Arc<dyn DocumentAnalysisProvider>,
    models: AiModelStore,
    usage: UsageRecorder,
    ocr_polling: OcrPolling,
}

impl Backends {
    pub fn new(
        config: &EngineConfig,
        llm: Arc<dyn LlmGateway>,
        documents: Arc<dyn DocumentAnalysisProvider>,
        models: AiModelStore,
        usage: UsageRecorder,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            http_timeout: config.http_timeout,
            llm,
            documents,
            models,
            usage,
            ocr_polling: config.ocr_polling.clone(),
        }
    }

    pub async fn execute(
        &self,
        backend: &ExecutionBackend,
        input: &Map<String, Value>,
        ctx: &StepContext<'_>,
    ) -> Result<BackendOutput, EngineError> {
        let payload = match backend {
            ExecutionBackend::Http(config) => {
                http::call(&self.http, config, self.http_timeout, input).await?
            }
            ExecutionBackend::Chat(plan) => {
                chat::execute(self.llm.as_ref(), &self.models, &self.usage, plan, input, ctx).await?
            }
            ExecutionBackend::Ocr(config) => {
                ocr::execute(&self.http, self.documents.as_ref(), config, &self.ocr_polling, input)
                    .await?
            }
            ExecutionBackend::Mock(config) => {
                config.payload.clone().unwrap_or_else(|| json!({}))
            }
            ExecutionBackend::PythonFunc(config) => python_placeholder(config),
            ExecutionBackend::Unsupported(message) => {
                return Ok(BackendOutput::soft(message.clone()));
            }
        };
        Ok(BackendOutput::ok(payload))
    }
}

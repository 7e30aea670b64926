//! Azure OpenAI chat-completions client.
//!
//! POST {endpoint}/openai/deployments/{deployment}/chat/completions?api-version={version}
//! Headers:
//!   api-key: {key}
//!   content-type: application/json

use std::time::Duration;

use async_trait::async_trait;

use crate::config::AzureOpenAiSettings;
use crate::error::EngineError;
use crate::models::ai_model::AiModel;
use crate::providers::llm::{ChatCompletion, ChatRequest, LlmGateway};

const LLM_TIMEOUT: Duration = Duration::from_secs(60);

pub struct AzureOpenAiGateway {
    client: reqwest::Client,
    settings: AzureOpenAiSettings,
}

impl AzureOpenAiGateway {
    pub fn new(settings: AzureOpenAiSettings) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(LLM_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            settings,
        }
    }

    fn credentials(&self) -> Result<(&str, &str), EngineError> {
        match (&self.settings.endpoint, &self.settings.api_key) {
            (Some(endpoint), Some(key)) => Ok((endpoint.trim_end_matches('/'), key.as_str())),
            _ => Err(EngineError::Configuration(
                "Azure OpenAI endpoint and API key must be set \
                 (AZURE_OPENAI_ENDPOINT, AZURE_OPENAI_API_KEY)"
                    .to_string(),
            )),
        }
    }
}

#[async_trait]
impl LlmGateway for AzureOpenAiGateway {
    async fn chat(&self, request: &ChatRequest, model: &AiModel) -> Result<ChatCompletion, EngineError> {
        let (endpoint, key) = self.credentials()?;
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            endpoint, model.deployment_name, model.api_version
        );

        tracing::debug!(
            deployment = %model.deployment_name,
            messages = request.messages.len(),
            "Calling Azure OpenAI"
        );

        let response = self
            .client
            .post(&url)
            .header("api-key", key)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(EngineError::backend_status(
                status.as_u16(),
                format!("Azure OpenAI returned {}: {}", status, text),
            ));
        }

        let raw = serde_json::from_str(&text).map_err(|e| {
            EngineError::backend(format!("Failed to parse Azure OpenAI response: {}", e))
        })?;
        Ok(ChatCompletion::from_raw(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::llm::ChatMessage;
    use crate::test_support::spawn_stub_server;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use chrono::Utc;
    use serde_json::json;

    fn model() -> AiModel {
        AiModel {
            id: "m1".into(),
            name: "gpt-4o".into(),
            deployment_name: "prod-4o".into(),
            api_version: "2024-02-01".into(),
            description: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn request() -> ChatRequest {
        ChatRequest {
            messages: vec![ChatMessage::system("be brief").into(), ChatMessage::user("hi").into()],
            temperature: 0.7,
            max_tokens: None,
        }
    }

    #[tokio::test]
    async fn test_chat_posts_to_deployment_url() {
        let (base, mut rx) = spawn_stub_server(|_| {
            axum::Json(json!({
                "choices": [{"message": {"role": "assistant", "content": "hello"}}],
                "usage": {"prompt_tokens": 7, "completion_tokens": 2, "total_tokens": 9}
            }))
            .into_response()
        })
        .await;

        let gateway = AzureOpenAiGateway::new(AzureOpenAiSettings {
            endpoint: Some(format!("{}/", base)),
            api_key: Some("secret".into()),
        });
        let completion = gateway.chat(&request(), &model()).await.unwrap();
        assert_eq!(completion.usage.unwrap().total_tokens, 9);
        assert_eq!(completion.raw["choices"][0]["message"]["content"], "hello");

        let req = rx.recv().await.unwrap();
        assert_eq!(req.method, "POST");
        assert_eq!(
            req.uri,
            "/openai/deployments/prod-4o/chat/completions?api-version=2024-02-01"
        );
        assert_eq!(req.header("api-key"), Some("secret"));
        let body = req.json();
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["temperature"], 0.7);
        assert!(body.get("max_tokens").is_none());
    }

    #[tokio::test]
    async fn test_non_success_status_is_backend_error() {
        let (base, _rx) = spawn_stub_server(|_| {
            (StatusCode::TOO_MANY_REQUESTS, "slow down").into_response()
        })
        .await;
        let gateway = AzureOpenAiGateway::new(AzureOpenAiSettings {
            endpoint: Some(base),
            api_key: Some("k".into()),
        });
        match gateway.chat(&request(), &model()).await {
            Err(EngineError::Backend { status, message }) => {
                assert_eq!(status, Some(429));
                assert!(message.contains("slow down"));
            }
            other => panic!("expected backend error, got {:?}", other.map(|c| c.raw)),
        }
    }

    #[tokio::test]
    async fn test_missing_credentials_is_configuration_error() {
        let gateway = AzureOpenAiGateway::new(AzureOpenAiSettings {
            endpoint: None,
            api_key: Some("k".into()),
        });
        let err = gateway.chat(&request(), &model()).await.unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }
}

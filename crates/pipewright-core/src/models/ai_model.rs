use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat-completion deployment the chat backend can target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiModel {
    pub id: String,
    /// Model family name, used for cost lookups (e.g. "gpt-4o-mini").
    pub name: String,
    pub deployment_name: String,
    pub api_version: String,
    #[serde(default)]
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAiModelInput {
    pub name: String,
    pub deployment_name: String,
    pub api_version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token usage and derived cost of one chat completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageRecord {
    pub id: String,
    pub user_id: String,
    /// Component or skill that issued the call.
    pub app_name: String,
    pub model_name: String,
    pub tokens_input: u64,
    pub tokens_output: u64,
    pub total_tokens: u64,
    pub estimated_cost: f64,
    #[serde(default)]
    pub trace_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A business context (task package) carrying an operating manual that is
/// injected into prompt skills for runs that reference it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessContext {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub manual_content: Option<String>,
    #[serde(default)]
    pub workflow_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBusinessContextInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub manual_content: Option<String>,
    #[serde(default)]
    pub workflow_id: Option<String>,
}

/// The manual resolved for a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualContext {
    /// Name of the business context, recorded per step as `used_manual`.
    pub name: String,
    pub content: String,
}

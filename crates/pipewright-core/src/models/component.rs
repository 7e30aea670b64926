use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A named, configured execution target.
///
/// `configuration.kind` selects the legacy backend (`http`, `azure_openai`,
/// `ocr_api`, `mock`) when no skill is bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input_schema: Value,
    #[serde(default)]
    pub output_schema: Value,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub configuration: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Component {
    pub fn kind(&self) -> Option<&str> {
        self.configuration.get("kind").and_then(|k| k.as_str())
    }
}

fn default_true() -> bool {
    true
}

/// Input for creating a component. An explicit `id` lets imported
/// definitions keep stable references from workflow steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateComponentInput {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input_schema: Value,
    #[serde(default)]
    pub output_schema: Value,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub configuration: Map<String, Value>,
    #[serde(default)]
    pub skill_id: Option<String>,
}

impl CreateComponentInput {
    pub fn new(name: impl Into<String>, configuration: Value) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: String::new(),
            input_schema: Value::Object(Map::new()),
            output_schema: Value::Object(Map::new()),
            tags: Vec::new(),
            active: true,
            configuration: match configuration {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            skill_id: None,
        }
    }

    pub fn with_skill(mut self, skill_id: impl Into<String>) -> Self {
        self.skill_id = Some(skill_id.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateComponentInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub input_schema: Option<Value>,
    pub output_schema: Option<Value>,
    pub tags: Option<Vec<String>>,
    pub active: Option<bool>,
    pub configuration: Option<Map<String, Value>>,
    pub skill_id: Option<String>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkillType {
    /// An LLM call driven by a prompt template.
    #[serde(alias = "llm_prompt")]
    LlmPrompt,
    /// A registered local callable (skill folder entry point).
    #[serde(alias = "python_func")]
    PythonFunc,
    /// A generic HTTP call.
    #[serde(alias = "api_call")]
    ApiCall,
    /// Reserved; not executable yet.
    #[serde(alias = "rule_engine")]
    RuleEngine,
}

impl SkillType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LlmPrompt => "LLM_PROMPT",
            Self::PythonFunc => "PYTHON_FUNC",
            Self::ApiCall => "API_CALL",
            Self::RuleEngine => "RULE_ENGINE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "LLM_PROMPT" => Some(Self::LlmPrompt),
            "PYTHON_FUNC" => Some(Self::PythonFunc),
            "API_CALL" => Some(Self::ApiCall),
            "RULE_ENGINE" => Some(Self::RuleEngine),
            _ => None,
        }
    }
}

impl std::fmt::Display for SkillType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reusable, independently cataloged capability. Unique by `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub skill_type: SkillType,
    #[serde(default)]
    pub input_schema: Value,
    #[serde(default)]
    pub output_schema: Value,
    #[serde(default)]
    pub configuration: Map<String, Value>,
    pub is_reusable: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn default_category() -> String {
    "uncategorized".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSkillInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub skill_type: SkillType,
    #[serde(default)]
    pub input_schema: Value,
    #[serde(default)]
    pub output_schema: Value,
    #[serde(default)]
    pub configuration: Map<String, Value>,
    #[serde(default = "default_true")]
    pub is_reusable: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl CreateSkillInput {
    pub fn new(name: impl Into<String>, skill_type: SkillType, configuration: Value) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            category: default_category(),
            skill_type,
            input_schema: Value::Object(Map::new()),
            output_schema: Value::Object(Map::new()),
            configuration: match configuration {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            is_reusable: true,
            is_active: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_type_accepts_both_spellings() {
        let t: SkillType = serde_json::from_str("\"LLM_PROMPT\"").unwrap();
        assert_eq!(t, SkillType::LlmPrompt);
        let t: SkillType = serde_json::from_str("\"api_call\"").unwrap();
        assert_eq!(t, SkillType::ApiCall);
        assert_eq!(serde_json::to_string(&SkillType::RuleEngine).unwrap(), "\"RULE_ENGINE\"");
        assert_eq!(SkillType::from_str("python_func"), Some(SkillType::PythonFunc));
        assert_eq!(SkillType::from_str("shell"), None);
    }
}

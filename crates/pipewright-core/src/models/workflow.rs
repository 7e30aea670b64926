//! Workflow definitions.
//!
//! A workflow can be authored as YAML (or JSON) and imported:
//!
//! ```yaml
//! name: "Invoice triage"
//! description: "OCR an invoice, classify it, notify on approval"
//! steps:
//!   - step_id: 10
//!     component_id: "ocr-reader"
//!   - step_id: 20
//!     component_id: "classifier"
//!     next_step_id: 40
//!     condition: { field: "status", operator: "==", value: "approve" }
//!   - step_id: 30
//!     component_id: "manual-review"
//!   - step_id: 40
//!     component_id: "notify"
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    pub fn new(name: String, description: String, steps: Vec<WorkflowStep>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            description,
            steps,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One node of a workflow's execution graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowStep {
    pub step_id: i64,
    pub component_id: String,
    /// Overrides applied on top of the component configuration.
    #[serde(default)]
    pub config: Map<String, Value>,
    /// Documentation only; not interpreted by the engine.
    #[serde(default)]
    pub input_mapping: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_step_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<StepCondition>,
}

impl WorkflowStep {
    pub fn new(step_id: i64, component_id: impl Into<String>) -> Self {
        Self {
            step_id,
            component_id: component_id.into(),
            config: Map::new(),
            input_mapping: Map::new(),
            next_step_id: None,
            condition: None,
        }
    }

    pub fn jump_to(mut self, next_step_id: i64) -> Self {
        self.next_step_id = Some(next_step_id);
        self
    }

    pub fn when(mut self, condition: StepCondition) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// Guard on a step's explicit edge, evaluated against the step's output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepCondition {
    pub field: String,
    #[serde(default = "default_operator")]
    pub operator: String,
    #[serde(default)]
    pub value: Value,
}

fn default_operator() -> String {
    "==".to_string()
}

impl StepCondition {
    pub fn new(field: impl Into<String>, operator: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value,
        }
    }
}

/// Input for creating a workflow (e.g. from an imported YAML file).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWorkflowInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

impl CreateWorkflowInput {
    pub fn from_yaml(yaml: &str) -> Result<Self, String> {
        serde_yaml::from_str(yaml).map_err(|e| format!("Failed to parse workflow YAML: {}", e))
    }
}

/// Partial update input.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateWorkflowInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub steps: Option<Vec<WorkflowStep>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_workflow_yaml_with_condition() {
        let yaml = r#"
name: "Triage"
steps:
  - step_id: 2
    component_id: "classifier"
    next_step_id: 9
    condition:
      field: status
      value: approve
  - step_id: 1
    component_id: "ocr"
    config:
      max_attempts: 5
"#;
        let input = CreateWorkflowInput::from_yaml(yaml).unwrap();
        assert_eq!(input.name, "Triage");
        assert_eq!(input.description, "");
        assert_eq!(input.steps.len(), 2);

        let cond = input.steps[0].condition.as_ref().unwrap();
        assert_eq!(cond.operator, "==");
        assert_eq!(cond.value, Value::String("approve".into()));
        assert_eq!(input.steps[0].next_step_id, Some(9));
        assert_eq!(input.steps[1].config["max_attempts"], 5);
    }
}

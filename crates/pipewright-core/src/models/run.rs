use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "RUNNING" => Self::Running,
            "SUCCESS" => Self::Success,
            "FAILED" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Failed,
}

/// The unmerged input pair recorded for audit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepInput {
    pub original_input: Map<String, Value>,
    pub prev_output: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepLogEntry {
    pub step_id: i64,
    pub component: String,
    pub status: StepStatus,
    pub input: StepInput,
    pub output: Value,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: f64,
    #[serde(default)]
    pub used_manual: Option<String>,
}

/// Terminal entry appended when a run fails.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailureLogEntry {
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RunLogEntry {
    Step(StepLogEntry),
    Failure(FailureLogEntry),
}

impl RunLogEntry {
    pub fn as_step(&self) -> Option<&StepLogEntry> {
        match self {
            Self::Step(s) => Some(s),
            Self::Failure(_) => None,
        }
    }
}

/// One execution instance of a workflow. Never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunExecution {
    pub id: String,
    pub workflow_id: String,
    pub status: RunStatus,
    pub input_payload: Map<String, Value>,
    pub output_payload: Option<Value>,
    pub log: Vec<RunLogEntry>,
    /// Correlates this run with the usage records it produced.
    pub trace_id: String,
    #[serde(default)]
    pub identity: Option<String>,
    #[serde(default)]
    pub business_context_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunExecution {
    pub fn pending(
        workflow_id: &str,
        input_payload: Map<String, Value>,
        identity: Option<String>,
        business_context_id: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workflow_id: workflow_id.to_string(),
            status: RunStatus::Pending,
            input_payload,
            output_payload: None,
            log: Vec::new(),
            trace_id: uuid::Uuid::new_v4().to_string(),
            identity,
            business_context_id,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.status != RunStatus::Pending {
            return Err(self.invalid_transition(RunStatus::Running));
        }
        self.status = RunStatus::Running;
        self.started_at = Utc::now();
        Ok(())
    }

    pub fn push_step(&mut self, entry: StepLogEntry) {
        self.log.push(RunLogEntry::Step(entry));
    }

    pub fn succeed(&mut self, output: Value) -> Result<(), EngineError> {
        if self.status != RunStatus::Running {
            return Err(self.invalid_transition(RunStatus::Success));
        }
        self.status = RunStatus::Success;
        self.output_payload = Some(output);
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    pub fn fail(&mut self, error: String) -> Result<(), EngineError> {
        if self.status != RunStatus::Running {
            return Err(self.invalid_transition(RunStatus::Failed));
        }
        let now = Utc::now();
        self.log.push(RunLogEntry::Failure(FailureLogEntry {
            error,
            timestamp: now,
        }));
        self.status = RunStatus::Failed;
        self.finished_at = Some(now);
        Ok(())
    }

    pub fn steps(&self) -> impl Iterator<Item = &StepLogEntry> {
        self.log.iter().filter_map(RunLogEntry::as_step)
    }

    fn invalid_transition(&self, to: RunStatus) -> EngineError {
        EngineError::Internal(format!(
            "Run {} cannot transition {} -> {}",
            self.id,
            self.status.as_str(),
            to.as_str()
        ))
    }
}

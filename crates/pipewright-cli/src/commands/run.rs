//! `pipewright run` — Execute a workflow.

use pipewright_core::models::run::{RunExecution, RunLogEntry, RunStatus};
use pipewright_core::state::AppState;
use serde_json::{Map, Value};

use super::print_json;

/// Parse `--payload`. Absent means an empty object; anything other than a
/// JSON object is rejected.
pub fn parse_payload(payload: Option<&str>) -> Result<Map<String, Value>, String> {
    let Some(raw) = payload else {
        return Ok(Map::new());
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("Payload must be a JSON object".to_string()),
        Err(e) => Err(format!("Invalid payload JSON: {}", e)),
    }
}

/// Run `workflow_id` and print the resulting RunExecution. A run that ends
/// FAILED is returned as an error so the process exits non-zero.
pub async fn execute(
    state: &AppState,
    workflow_id: &str,
    payload: Option<&str>,
    user: Option<&str>,
    context: Option<&str>,
) -> Result<RunExecution, String> {
    let input = parse_payload(payload)?;
    let run = state
        .coordinator()
        .run(
            workflow_id,
            input,
            user.map(String::from),
            context.map(String::from),
        )
        .await
        .map_err(|e| e.to_string())?;

    tracing::info!(
        run_id = %run.id,
        status = run.status.as_str(),
        steps = run.steps().count(),
        "Run finished"
    );
    print_json(&run);

    if run.status == RunStatus::Failed {
        let reason = match run.log.last() {
            Some(RunLogEntry::Failure(f)) => f.error.clone(),
            _ => "unknown error".to_string(),
        };
        return Err(format!("Run {} failed: {}", run.id, reason));
    }
    Ok(run)
}

//! `pipewright runs` — Inspect past runs.

use pipewright_core::state::AppState;

use super::print_json;

pub async fn show(state: &AppState, run_id: &str) -> Result<(), String> {
    let run = state.run_store.require(run_id).await.map_err(|e| e.to_string())?;
    print_json(&run);
    Ok(())
}

/// Runs of one workflow, or the most recent runs overall.
pub async fn list(state: &AppState, workflow_id: Option<&str>, limit: usize) -> Result<(), String> {
    let runs = match workflow_id {
        Some(id) => state.run_store.list_by_workflow(id).await,
        None => state.run_store.list(limit).await,
    }
    .map_err(|e| e.to_string())?;
    print_json(&runs);
    Ok(())
}

pub async fn usage(state: &AppState, user_id: &str) -> Result<(), String> {
    let records = state
        .usage_store
        .list_by_user(user_id)
        .await
        .map_err(|e| e.to_string())?;
    let total: f64 = records.iter().map(|r| r.estimated_cost).sum();
    print_json(&serde_json::json!({
        "user_id": user_id,
        "records": records,
        "estimated_cost": total,
    }));
    Ok(())
}

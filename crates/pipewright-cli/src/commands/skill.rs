//! `pipewright skill` — Skill folder sync and catalog listing.

use pipewright_core::skills::SyncReport;
use pipewright_core::state::AppState;

use super::print_json;

pub async fn sync(state: &AppState) -> Result<SyncReport, String> {
    let report = state.skill_registry.sync().await.map_err(|e| e.to_string())?;
    tracing::info!(
        root = %state.skill_registry.root().display(),
        registered = report.registered.len(),
        updated = report.updated.len(),
        failed = report.failed.len(),
        "Skill sync finished"
    );
    print_json(&report);
    Ok(report)
}

pub async fn list(state: &AppState, active_only: bool) -> Result<(), String> {
    let skills = if active_only {
        state.skill_store.list_active().await
    } else {
        state.skill_store.list().await
    }
    .map_err(|e| e.to_string())?;
    print_json(&skills);
    Ok(())
}

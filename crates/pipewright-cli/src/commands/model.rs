//! `pipewright model` — Register chat-completion deployments.

use pipewright_core::models::ai_model::{AiModel, CreateAiModelInput};
use pipewright_core::state::AppState;

use super::print_json;

pub async fn add(
    state: &AppState,
    name: &str,
    deployment: &str,
    api_version: &str,
    description: Option<&str>,
    active: bool,
) -> Result<AiModel, String> {
    let model = state
        .ai_model_store
        .create(CreateAiModelInput {
            name: name.to_string(),
            deployment_name: deployment.to_string(),
            api_version: api_version.to_string(),
            description: description.map(String::from),
            is_active: active,
        })
        .await
        .map_err(|e| e.to_string())?;
    println!("Registered model {} ({} / {})", model.id, model.name, model.deployment_name);
    Ok(model)
}

/// Switch a model on or off for prompt skills.
pub async fn activate(state: &AppState, id: &str, active: bool) -> Result<(), String> {
    let found = state
        .ai_model_store
        .set_active(id, active)
        .await
        .map_err(|e| e.to_string())?;
    if !found {
        return Err(format!("Model {} not found", id));
    }
    tracing::info!(model_id = id, active, "Model activation changed");
    println!("Model {} is now {}", id, if active { "active" } else { "inactive" });
    Ok(())
}

pub async fn list(state: &AppState) -> Result<(), String> {
    let models = state.ai_model_store.list().await.map_err(|e| e.to_string())?;
    print_json(&models);
    Ok(())
}

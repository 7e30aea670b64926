//! `pipewright context` — Business contexts and their manuals.

use pipewright_core::models::business_context::{BusinessContext, CreateBusinessContextInput};
use pipewright_core::state::AppState;

use super::print_json;

pub async fn add(
    state: &AppState,
    name: &str,
    department: Option<&str>,
    manual_file: Option<&str>,
    workflow_id: Option<&str>,
) -> Result<BusinessContext, String> {
    let manual_content = match manual_file {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .map_err(|e| format!("Failed to read manual {}: {}", path, e))?,
        ),
        None => None,
    };

    let context = state
        .business_context_store
        .create(CreateBusinessContextInput {
            name: name.to_string(),
            description: String::new(),
            department: department.unwrap_or_default().to_string(),
            manual_content,
            workflow_id: workflow_id.map(String::from),
        })
        .await
        .map_err(|e| e.to_string())?;
    println!("Created business context {} ({})", context.id, context.name);
    Ok(context)
}

pub async fn list(state: &AppState) -> Result<(), String> {
    let contexts = state
        .business_context_store
        .list()
        .await
        .map_err(|e| e.to_string())?;
    print_json(&contexts);
    Ok(())
}

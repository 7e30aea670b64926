//! `pipewright workflow` — Import, list and validate workflows.

use pipewright_core::engine::StepGraph;
use pipewright_core::models::workflow::{CreateWorkflowInput, Workflow};
use pipewright_core::state::AppState;

use super::{print_json, read_definition};

pub async fn import(state: &AppState, file: &str) -> Result<Workflow, String> {
    let input: CreateWorkflowInput = read_definition(file)?;
    let workflow = state
        .workflow_store
        .create(input)
        .await
        .map_err(|e| e.to_string())?;
    tracing::info!(workflow_id = %workflow.id, file, "Workflow imported");
    println!("Imported workflow {} ({} step(s))", workflow.id, workflow.steps.len());
    Ok(workflow)
}

pub async fn list(state: &AppState) -> Result<(), String> {
    let workflows = state.workflow_store.list().await.map_err(|e| e.to_string())?;
    print_json(&workflows);
    Ok(())
}

/// Check the step graph and that every referenced component exists.
/// Returns the problems found; an empty list means the workflow is runnable.
pub async fn validate(state: &AppState, id: &str) -> Result<Vec<String>, String> {
    let workflow = state
        .workflow_store
        .require(id)
        .await
        .map_err(|e| e.to_string())?;

    let mut problems: Vec<String> = StepGraph::new(&workflow.steps)
        .validate()
        .iter()
        .map(ToString::to_string)
        .collect();

    for step in &workflow.steps {
        let found = state
            .component_store
            .get(&step.component_id)
            .await
            .map_err(|e| e.to_string())?;
        if found.is_none() {
            problems.push(format!(
                "Step {} references unknown component {}",
                step.step_id, step.component_id
            ));
        }
    }

    if problems.is_empty() {
        println!("Workflow {} is valid", workflow.name);
    } else {
        for problem in &problems {
            println!("  - {}", problem);
        }
    }
    Ok(problems)
}

//! `pipewright component` — Import and list components.

use pipewright_core::models::component::{Component, CreateComponentInput, UpdateComponentInput};
use pipewright_core::state::AppState;
use serde::Deserialize;

use super::{print_json, read_definition};

/// A component file holds one definition or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum ComponentFile {
    Many(Vec<CreateComponentInput>),
    One(Box<CreateComponentInput>),
}

/// Import components. Definitions with an `id` that already exists are
/// replaced, so re-importing a file is safe.
pub async fn import(state: &AppState, file: &str) -> Result<Vec<Component>, String> {
    let inputs = match read_definition::<ComponentFile>(file)? {
        ComponentFile::Many(inputs) => inputs,
        ComponentFile::One(input) => vec![*input],
    };

    let mut imported = Vec::with_capacity(inputs.len());
    for input in inputs {
        let existing = match input.id.as_deref() {
            Some(id) => state.component_store.get(id).await.map_err(|e| e.to_string())?,
            None => None,
        };
        let component = match existing {
            Some(current) => state
                .component_store
                .update(
                    &current.id,
                    UpdateComponentInput {
                        name: Some(input.name),
                        description: Some(input.description),
                        input_schema: Some(input.input_schema),
                        output_schema: Some(input.output_schema),
                        tags: Some(input.tags),
                        active: Some(input.active),
                        configuration: Some(input.configuration),
                        skill_id: input.skill_id,
                    },
                )
                .await
                .map_err(|e| e.to_string())?,
            None => state
                .component_store
                .create(input)
                .await
                .map_err(|e| e.to_string())?,
        };
        println!("Imported component {} ({})", component.id, component.name);
        imported.push(component);
    }
    Ok(imported)
}

pub async fn list(state: &AppState) -> Result<(), String> {
    let components = state.component_store.list().await.map_err(|e| e.to_string())?;
    print_json(&components);
    Ok(())
}

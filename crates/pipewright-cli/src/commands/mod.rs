//! CLI command implementations.
//!
//! Each submodule corresponds to a top-level CLI command and reuses
//! the pipewright-core engine through `AppState`.

pub mod component;
pub mod context;
pub mod model;
pub mod run;
pub mod runs;
pub mod skill;
pub mod workflow;

use std::path::Path;
use std::sync::Arc;

use pipewright_core::state::{AppState, AppStateInner};
use pipewright_core::{Database, EngineConfig};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Open the database and wire the engine state.
pub fn open_state(db_path: &str, config: EngineConfig) -> Result<AppState, String> {
    let db = Database::open(db_path)
        .map_err(|e| format!("Failed to open database '{}': {}", db_path, e))?;
    Ok(Arc::new(AppStateInner::new(db, config)))
}

/// Initialize a shared `AppState` from environment configuration, exiting
/// the process when the database cannot be opened.
pub fn init_state(db_path: Option<&str>) -> AppState {
    let mut config = EngineConfig::from_env();
    if let Some(path) = db_path {
        config.db_path = path.to_string();
    }
    let db_path = config.db_path.clone();
    open_state(&db_path, config).unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    })
}

/// Pretty-print a serializable value to stdout.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Failed to render output: {}", e),
    }
}

/// Read a YAML (or JSON, which is valid YAML) definition file.
pub fn read_definition<T: DeserializeOwned>(file: &str) -> Result<T, String> {
    let path = Path::new(file);
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_yaml::from_str(&text).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

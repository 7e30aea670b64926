//! Pipewright Core — workflow execution engine.
//!
//! Operators compose named components (HTTP calls, chat completions, OCR,
//! local callables, mocks) into conditionally branching workflows. This
//! crate holds everything needed to run them, with no transport attached:
//!
//! - models and SQLite stores for workflows, components, skills, AI models,
//!   business contexts, runs and usage records
//! - execution backends and the provider seams they call
//! - the step dispatcher and run coordinator
//! - the skill folder registry and usage/cost recorder
//!
//! # Feature Flags
//!
//! - `axum` — Enables `IntoResponse` impl on `EngineError` for use in axum handlers.

pub mod backends;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod providers;
pub mod skills;
pub mod state;
pub mod store;
pub mod usage;

#[cfg(test)]
mod test_support;

// Convenience re-exports
pub use config::EngineConfig;
pub use db::Database;
pub use engine::RunCoordinator;
pub use error::EngineError;
pub use state::{AppState, AppStateInner};

//! Workflow execution engine.

pub mod coordinator;
pub mod dispatcher;
pub mod graph;

pub use coordinator::RunCoordinator;
pub use dispatcher::{resolve_input, StepDispatcher};
pub use graph::{evaluate_condition, stringify, GraphIssue, StepGraph};

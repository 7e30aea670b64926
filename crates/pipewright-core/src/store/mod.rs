pub mod ai_model_store;
pub mod business_context_store;
pub mod component_store;
pub mod run_store;
pub mod skill_store;
pub mod usage_store;
pub mod workflow_store;

pub use ai_model_store::AiModelStore;
pub use business_context_store::BusinessContextStore;
pub use component_store::ComponentStore;
pub use run_store::RunStore;
pub use skill_store::{SkillStore, UpsertOutcome};
pub use usage_store::UsageStore;
pub use workflow_store::WorkflowStore;

pub mod ai_model;
pub mod business_context;
pub mod component;
pub mod run;
pub mod skill;
pub mod usage;
pub mod workflow;

pub use ai_model::*;
pub use business_context::*;
pub use component::*;
pub use run::*;
pub use skill::*;
pub use usage::*;
pub use workflow::*;

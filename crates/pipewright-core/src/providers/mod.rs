//! External service seams consumed by the execution backends.

pub mod azure_openai;
pub mod azure_vision;
pub mod document;
pub mod llm;

use async_trait::async_trait;

use crate::error::EngineError;
use crate::models::business_context::ManualContext;

pub use azure_openai::AzureOpenAiGateway;
pub use azure_vision::AzureVisionReader;
pub use document::{AnalysisResult, AnalysisStatus, DocumentAnalysisProvider, OperationHandle};
pub use llm::{ChatCompletion, ChatMessage, ChatRequest, LlmGateway, TokenUsage};

/// Resolves the operating manual attached to a business context.
#[async_trait]
pub trait BusinessContextProvider: Send + Sync {
    /// Returns `None` when the context is unknown or has no manual text.
    async fn manual(&self, context_id: &str) -> Result<Option<ManualContext>, EngineError>;
}

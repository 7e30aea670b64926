//! Asynchronous document analysis (OCR) seam.
//!
//! Providers follow a submit-then-poll protocol: `submit` hands over the
//! document bytes and returns an opaque handle, `poll` reports progress for
//! that handle until it succeeds or fails.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle {
    /// Provider-specific location of the pending operation.
    pub location: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    /// Recognized text lines in reading order.
    pub lines: Vec<String>,
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisStatus {
    Running,
    Succeeded(AnalysisResult),
    Failed(Value),
}

#[async_trait]
pub trait DocumentAnalysisProvider: Send + Sync {
    async fn submit(&self, document: Vec<u8>) -> Result<OperationHandle, EngineError>;

    async fn poll(&self, handle: &OperationHandle) -> Result<AnalysisStatus, EngineError>;
}

//! Azure Computer Vision Read (v3.2) client.
//!
//! Submit:  POST {endpoint}/vision/v3.2/read/analyze  (octet-stream body)
//!          -> 202 Accepted, `Operation-Location: <result url>`
//! Poll:    GET <result url>
//!          -> {"status": "notStarted" | "running" | "succeeded" | "failed", "analyzeResult": ...}

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::AzureVisionSettings;
use crate::error::EngineError;
use crate::providers::document::{
    AnalysisResult, AnalysisStatus, DocumentAnalysisProvider, OperationHandle,
};

const VISION_TIMEOUT: Duration = Duration::from_secs(60);
const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

pub struct AzureVisionReader {
    client: reqwest::Client,
    settings: AzureVisionSettings,
}

impl AzureVisionReader {
    pub fn new(settings: AzureVisionSettings) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(VISION_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            settings,
        }
    }

    fn credentials(&self) -> Result<(&str, &str), EngineError> {
        match (&self.settings.endpoint, &self.settings.api_key) {
            (Some(endpoint), Some(key)) => Ok((endpoint.trim_end_matches('/'), key.as_str())),
            _ => Err(EngineError::Configuration(
                "Azure Vision endpoint and key must be set (AZURE_VISION_ENDPOINT, AZURE_VISION_KEY)"
                    .to_string(),
            )),
        }
    }
}

#[async_trait]
impl DocumentAnalysisProvider for AzureVisionReader {
    async fn submit(&self, document: Vec<u8>) -> Result<OperationHandle, EngineError> {
        let (endpoint, key) = self.credentials()?;
        let url = format!("{}/vision/v3.2/read/analyze", endpoint);

        let response = self
            .client
            .post(&url)
            .header(KEY_HEADER, key)
            .header("content-type", "application/octet-stream")
            .body(document)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::ACCEPTED {
            let text = response.text().await.unwrap_or_default();
            return Err(EngineError::backend_status(
                status.as_u16(),
                format!("Azure Read submit failed: {}", text),
            ));
        }

        let location = response
            .headers()
            .get("Operation-Location")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| EngineError::backend("Azure Read response has no Operation-Location header"))?;

        tracing::debug!(location, "Azure Read operation submitted");
        Ok(OperationHandle {
            location: location.to_string(),
        })
    }

    async fn poll(&self, handle: &OperationHandle) -> Result<AnalysisStatus, EngineError> {
        let (_, key) = self.credentials()?;
        let response = self
            .client
            .get(&handle.location)
            .header(KEY_HEADER, key)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(EngineError::backend_status(
                status.as_u16(),
                format!("Azure Read poll failed: {}", text),
            ));
        }
        let raw: Value = serde_json::from_str(&text)
            .map_err(|e| EngineError::backend(format!("Failed to parse Azure Read result: {}", e)))?;

        Ok(match raw.get("status").and_then(Value::as_str) {
            Some("succeeded") => AnalysisStatus::Succeeded(AnalysisResult {
                lines: read_lines(&raw),
                raw,
            }),
            Some("failed") => AnalysisStatus::Failed(raw),
            _ => AnalysisStatus::Running,
        })
    }
}

/// Flatten `analyzeResult.readResults[].lines[].text`.
fn read_lines(raw: &Value) -> Vec<String> {
    raw.pointer("/analyzeResult/readResults")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|page| page.get("lines").and_then(Value::as_array))
        .flatten()
        .filter_map(|line| line.get("text").and_then(Value::as_str))
        .map(String::from)
        .collect()
}

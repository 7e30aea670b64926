//! OCR backend: submit a document, poll until the analysis is terminal.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::{json, Map, Value};

use super::config::OcrConfig;
use crate::config::OcrPolling;
use crate::error::EngineError;
use crate::providers::document::{AnalysisResult, AnalysisStatus, DocumentAnalysisProvider};

fn document_source(input: &Map<String, Value>) -> Result<&str, EngineError> {
    ["image_path", "image_url"]
        .iter()
        .filter_map(|k| input.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .ok_or_else(|| {
            let keys: Vec<&String> = input.keys().collect();
            EngineError::Configuration(format!(
                "Input must contain 'image_path' or 'image_url'. Received input keys: {:?}",
                keys
            ))
        })
}

async fn load_document(client: &reqwest::Client, source: &str) -> Result<Vec<u8>, EngineError> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let response = client.get(source).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::backend_status(
                status.as_u16(),
                format!("Failed to download document {}", source),
            ));
        }
        return Ok(response.bytes().await?.to_vec());
    }

    let path = resolve_local(source)
        .ok_or_else(|| EngineError::BadRequest(format!("Image file not found: {}", source)))?;
    tokio::fs::read(&path).await.map_err(|e| {
        EngineError::BadRequest(format!("Failed to read {}: {}", path.display(), e))
    })
}

/// The path as given, then relative to the working directory.
fn resolve_local(source: &str) -> Option<PathBuf> {
    let direct = Path::new(source);
    if direct.exists() {
        return Some(direct.to_path_buf());
    }
    let relative = std::env::current_dir().ok()?.join(source);
    relative.exists().then_some(relative)
}

fn shape(result: AnalysisResult) -> Value {
    json!({
        "status": "success",
        "full_text": result.lines.join("\n"),
        "lines": result.lines,
        "raw_provider_payload": result.raw,
    })
}

pub(crate) async fn execute(
    client: &reqwest::Client,
    provider: &dyn DocumentAnalysisProvider,
    config: &OcrConfig,
    defaults: &OcrPolling,
    input: &Map<String, Value>,
) -> Result<Value, EngineError> {
    let source = document_source(input)?;
    let document = load_document(client, source).await?;

    let interval = config
        .poll_interval_ms
        .map(Duration::from_millis)
        .unwrap_or(defaults.interval);
    let max_attempts = config.max_attempts.unwrap_or(defaults.max_attempts);

    let handle = provider.submit(document).await?;
    for attempt in 1..=max_attempts {
        tokio::time::sleep(interval).await;
        match provider.poll(&handle).await? {
            AnalysisStatus::Running => {
                tracing::debug!(attempt, max_attempts, "Document analysis still running");
            }
            AnalysisStatus::Succeeded(result) => return Ok(shape(result)),
            AnalysisStatus::Failed(raw) => {
                return Err(EngineError::backend(format!("Document analysis failed: {}", raw)))
            }
        }
    }

    Err(EngineError::Timeout(format!(
        "Document analysis not finished after {} polls",
        max_attempts
    )))
}

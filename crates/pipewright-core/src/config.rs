//! Engine configuration, resolved from the process environment.
//!
//! Credentials are optional here: a missing Azure key only becomes an error
//! when a step actually needs that provider.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "pipewright.db";
pub const DEFAULT_SKILLS_DIR: &str = "skills";
pub const DEFAULT_MAX_STEPS: usize = 50;
pub const DEFAULT_OCR_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_OCR_MAX_ATTEMPTS: u32 = 30;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AzureOpenAiSettings {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AzureVisionSettings {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OcrPolling {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for OcrPolling {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_OCR_POLL_INTERVAL_MS),
            max_attempts: DEFAULT_OCR_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub db_path: String,
    pub skills_dir: PathBuf,
    /// Ceiling on executed steps per run (cycle guard).
    pub max_steps: usize,
    pub http_timeout: Duration,
    pub ocr_polling: OcrPolling,
    pub azure_openai: AzureOpenAiSettings,
    pub azure_vision: AzureVisionSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            skills_dir: PathBuf::from(DEFAULT_SKILLS_DIR),
            max_steps: DEFAULT_MAX_STEPS,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            ocr_polling: OcrPolling::default(),
            azure_openai: AzureOpenAiSettings {
                endpoint: None,
                api_key: None,
            },
            azure_vision: AzureVisionSettings {
                endpoint: None,
                api_key: None,
            },
        }
    }
}

impl EngineConfig {
    /// Build the configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let db_path = non_empty_var("PIPEWRIGHT_DB_PATH").unwrap_or(defaults.db_path);
        let skills_dir = non_empty_var("PIPEWRIGHT_SKILLS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.skills_dir);

        let max_steps = parsed_var("PIPEWRIGHT_MAX_STEPS").unwrap_or(defaults.max_steps);
        let http_timeout = parsed_var("PIPEWRIGHT_HTTP_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.http_timeout);

        let ocr_polling = OcrPolling {
            interval: parsed_var("PIPEWRIGHT_OCR_POLL_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.ocr_polling.interval),
            max_attempts: parsed_var("PIPEWRIGHT_OCR_MAX_ATTEMPTS")
                .unwrap_or(defaults.ocr_polling.max_attempts),
        };

        Self {
            db_path,
            skills_dir,
            max_steps,
            http_timeout,
            ocr_polling,
            azure_openai: AzureOpenAiSettings {
                endpoint: non_empty_var("AZURE_OPENAI_ENDPOINT"),
                api_key: non_empty_var("AZURE_OPENAI_API_KEY")
                    .or_else(|| non_empty_var("AZURE_OPENAI_KEY")),
            },
            azure_vision: AzureVisionSettings {
                endpoint: non_empty_var("AZURE_VISION_ENDPOINT"),
                api_key: non_empty_var("AZURE_VISION_KEY"),
            },
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = non_empty_var(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring unparsable value for {}: {:?}", key, raw);
            None
        }
    }
}

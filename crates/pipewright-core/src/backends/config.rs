//! Typed backend configurations.
//!
//! A step's configuration is assembled from up to three free-form layers
//! (skill, component, step). Each layer is parsed into the backend's config
//! type on its own, then the layers are overlaid in order: a field set in a
//! later layer replaces the earlier value, unset fields fall through.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::EngineError;

pub trait Overlay: DeserializeOwned + Default {
    const NAME: &'static str;

    fn overlay(self, over: Self) -> Self;
}

/// Parse and overlay `layers`, lowest precedence first.
pub fn layered<T: Overlay>(layers: &[&Map<String, Value>]) -> Result<T, EngineError> {
    layers.iter().try_fold(T::default(), |acc, layer| {
        let parsed: T = serde_json::from_value(Value::Object((*layer).clone())).map_err(|e| {
            EngineError::Configuration(format!("Invalid {} configuration: {}", T::NAME, e))
        })?;
        Ok(acc.overlay(parsed))
    })
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct HttpConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Overlay for HttpConfig {
    const NAME: &'static str = "http";

    fn overlay(self, over: Self) -> Self {
        let headers = match (self.headers, over.headers) {
            (Some(mut base), Some(extra)) => {
                base.extend(extra);
                Some(base)
            }
            (base, extra) => extra.or(base),
        };
        Self {
            url: over.url.or(self.url),
            method: over.method.or(self.method),
            headers,
            timeout_secs: over.timeout_secs.or(self.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ChatConfig {
    #[serde(default)]
    pub system_template: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl ChatConfig {
    pub const DEFAULT_SYSTEM_PROMPT: &'static str = "You are a helpful AI assistant.";
    pub const DEFAULT_TEMPERATURE: f64 = 0.7;

    pub fn base_system_prompt(&self) -> &str {
        self.system_template
            .as_deref()
            .or(self.system_prompt.as_deref())
            .unwrap_or(Self::DEFAULT_SYSTEM_PROMPT)
    }
}

impl Overlay for ChatConfig {
    const NAME: &'static str = "chat";

    fn overlay(self, over: Self) -> Self {
        Self {
            system_template: over.system_template.or(self.system_template),
            system_prompt: over.system_prompt.or(self.system_prompt),
            prompt: over.prompt.or(self.prompt),
            model_id: over.model_id.or(self.model_id),
            temperature: over.temperature.or(self.temperature),
            max_tokens: over.max_tokens.or(self.max_tokens),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct OcrConfig {
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl Overlay for OcrConfig {
    const NAME: &'static str = "ocr";

    fn overlay(self, over: Self) -> Self {
        Self {
            poll_interval_ms: over.poll_interval_ms.or(self.poll_interval_ms),
            max_attempts: over.max_attempts.or(self.max_attempts),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct MockConfig {
    #[serde(default)]
    pub payload: Option<Value>,
}

impl Overlay for MockConfig {
    const NAME: &'static str = "mock";

    fn overlay(self, over: Self) -> Self {
        Self {
            payload: over.payload.or(self.payload),
        }
    }
}

/// Local callable. Synced skills carry `folder_path`/`instructions`;
/// hand-registered ones name a `module` and `function`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PythonFuncConfig {
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub function: Option<String>,
    #[serde(default)]
    pub folder_path: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

impl Overlay for PythonFuncConfig {
    const NAME: &'static str = "python_func";

    fn overlay(self, over: Self) -> Self {
        Self {
            module: over.module.or(self.module),
            function: over.function.or(self.function),
            folder_path: over.folder_path.or(self.folder_path),
            instructions: over.instructions.or(self.instructions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_later_layers_win_and_unset_fields_fall_through() {
        let skill = map(json!({"system_template": "You summarize.", "temperature": 0.2}));
        let component = map(json!({"kind": "azure_openai", "model_id": "m1"}));
        let step = map(json!({"temperature": 0.0}));

        let cfg: ChatConfig = layered(&[&skill, &component, &step]).unwrap();
        assert_eq!(cfg.base_system_prompt(), "You summarize.");
        assert_eq!(cfg.model_id.as_deref(), Some("m1"));
        assert_eq!(cfg.temperature, Some(0.0));
    }

    #[test]
    fn test_http_headers_merge_per_key() {
        let component = map(json!({"url": "http://a", "headers": {"X-A": "1", "X-B": "1"}}));
        let step = map(json!({"headers": {"X-B": "2"}}));
        let cfg: HttpConfig = layered(&[&component, &step]).unwrap();
        let headers = cfg.headers.unwrap();
        assert_eq!(headers["X-A"], "1");
        assert_eq!(headers["X-B"], "2");
        assert_eq!(cfg.url.as_deref(), Some("http://a"));
    }

    #[test]
    fn test_wrong_type_is_configuration_error() {
        let bad = map(json!({"max_attempts": "many"}));
        let err = layered::<OcrConfig>(&[&bad]).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(ref m) if m.contains("ocr")));
    }

    #[test]
    fn test_default_system_prompt() {
        assert_eq!(
            ChatConfig::default().base_system_prompt(),
            "You are a helpful AI assistant."
        );
    }
}

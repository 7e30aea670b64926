//! Generic HTTP call backend.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde_json::{Map, Value};

use super::config::HttpConfig;
use crate::error::EngineError;

/// Expand `${VAR}` and `${VAR:-default}` from the process environment.
/// Unset variables without a default are left as written.
pub fn resolve_env_vars(input: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env pattern"));
    re.replace_all(input, |caps: &regex::Captures| {
        let var_expr = &caps[1];
        if let Some(idx) = var_expr.find(":-") {
            let var_name = &var_expr[..idx];
            let default_val = &var_expr[idx + 2..];
            std::env::var(var_name).unwrap_or_else(|_| default_val.to_string())
        } else {
            std::env::var(var_expr).unwrap_or_else(|_| format!("${{{}}}", var_expr))
        }
    })
    .to_string()
}

/// GET query parameters: strings as-is, other scalars and nested values as JSON text.
fn query_pairs(input: &Map<String, Value>) -> Vec<(String, String)> {
    input
        .iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), v)
        })
        .collect()
}

pub(crate) async fn call(
    client: &reqwest::Client,
    config: &HttpConfig,
    default_timeout: Duration,
    input: &Map<String, Value>,
) -> Result<Value, EngineError> {
    let url = config
        .url
        .as_deref()
        .filter(|u| !u.is_empty())
        .map(resolve_env_vars)
        .ok_or_else(|| EngineError::Configuration("Missing URL in configuration".to_string()))?;
    let method = config.method.as_deref().unwrap_or("POST").to_ascii_uppercase();
    let timeout = config
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(default_timeout);

    let mut request = match method.as_str() {
        "POST" => client.post(&url).json(input),
        "GET" => client.get(&url).query(&query_pairs(input)),
        other => {
            return Err(EngineError::Configuration(format!(
                "Unsupported method {}",
                other
            )))
        }
    };
    request = request.timeout(timeout);

    match &config.headers {
        Some(headers) => {
            for (name, value) in headers {
                request = request.header(name.as_str(), resolve_env_vars(value));
            }
        }
        None => request = request.header("Content-Type", "application/json"),
    }

    tracing::debug!(%method, %url, "HTTP backend call");
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(EngineError::backend_status(
            status.as_u16(),
            format!("{} {} returned {}: {}", method, url, status, text),
        ));
    }

    serde_json::from_str(&text).map_err(|e| {
        EngineError::backend(format!("Response from {} is not valid JSON: {}", url, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_stub_server;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use serde_json::json;

    fn input() -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("q".into(), json!("rust"));
        m.insert("n".into(), json!(3));
        m
    }

    #[test]
    fn test_resolve_env_vars() {
        std::env::set_var("PIPEWRIGHT_TEST_HTTP_HOST", "example.test");
        assert_eq!(
            resolve_env_vars("https://${PIPEWRIGHT_TEST_HTTP_HOST}/v1"),
            "https://example.test/v1"
        );
        assert_eq!(resolve_env_vars("${PIPEWRIGHT_TEST_UNSET:-fallback}"), "fallback");
        assert_eq!(resolve_env_vars("${PIPEWRIGHT_TEST_UNSET}"), "${PIPEWRIGHT_TEST_UNSET}");
        std::env::remove_var("PIPEWRIGHT_TEST_HTTP_HOST");
    }

    #[tokio::test]
    async fn test_post_sends_json_body_with_default_header() {
        let (base, mut rx) =
            spawn_stub_server(|_| axum::Json(json!({"ok": true})).into_response()).await;
        let config = HttpConfig {
            url: Some(format!("{}/hook", base)),
            ..Default::default()
        };
        let out = call(&reqwest::Client::new(), &config, Duration::from_secs(5), &input())
            .await
            .unwrap();
        assert_eq!(out, json!({"ok": true}));

        let req = rx.recv().await.unwrap();
        assert_eq!(req.method, "POST");
        assert_eq!(req.uri, "/hook");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.json(), json!({"q": "rust", "n": 3}));
    }

    #[tokio::test]
    async fn test_get_sends_query_params() {
        let (base, mut rx) =
            spawn_stub_server(|_| axum::Json(json!([1, 2])).into_response()).await;
        let config = HttpConfig {
            url: Some(format!("{}/search", base)),
            method: Some("get".into()),
            ..Default::default()
        };
        let out = call(&reqwest::Client::new(), &config, Duration::from_secs(5), &input())
            .await
            .unwrap();
        assert_eq!(out, json!([1, 2]));

        let req = rx.recv().await.unwrap();
        assert_eq!(req.method, "GET");
        assert!(req.uri.starts_with("/search?"));
        assert!(req.uri.contains("q=rust"));
        assert!(req.uri.contains("n=3"));
    }

    #[tokio::test]
    async fn test_non_success_carries_status_and_body() {
        let (base, _rx) = spawn_stub_server(|_| {
            (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response()
        })
        .await;
        let config = HttpConfig {
            url: Some(base),
            ..Default::default()
        };
        let err = call(&reqwest::Client::new(), &config, Duration::from_secs(5), &input())
            .await
            .unwrap_err();
        match err {
            EngineError::Backend { status, message } => {
                assert_eq!(status, Some(503));
                assert!(message.contains("maintenance"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_url_and_bad_method_are_configuration_errors() {
        let client = reqwest::Client::new();
        let err = call(&client, &HttpConfig::default(), Duration::from_secs(1), &input())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));

        let config = HttpConfig {
            url: Some("http://127.0.0.1:9".into()),
            method: Some("DELETE".into()),
            ..Default::default()
        };
        let err = call(&client, &config, Duration::from_secs(1), &input()).await.unwrap_err();
        assert!(matches!(err, EngineError::Configuration(ref m) if m.contains("DELETE")));
    }
}

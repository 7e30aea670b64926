//! Core error type for the Pipewright engine.
//!
//! `EngineError` is used throughout the core (stores, backends, providers,
//! the run coordinator). When the `axum` feature is enabled, it also
//! implements `IntoResponse` so it can be used directly as an axum handler
//! error type.

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Backend error{}: {message}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Backend {
        status: Option<u16>,
        message: String,
    },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Workflow exceeded maximum step limit of {0} (infinite loop detection)")]
    StepLimitExceeded(usize),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            status: None,
            message: message.into(),
        }
    }

    pub fn backend_status(status: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            status: Some(status),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Timeout(format!("HTTP request timed out: {}", e));
        }
        Self::Backend {
            status: e.status().map(|s| s.as_u16()),
            message: format!("HTTP request failed: {}", e),
        }
    }
}

// ---------------------------------------------------------------------------
// axum integration (opt-in via feature flag)
// ---------------------------------------------------------------------------

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for EngineError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::BadRequest(_) => StatusCode::BAD_REQUEST,
            EngineError::Backend { .. } => StatusCode::BAD_GATEWAY,
            EngineError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            EngineError::Database(_)
            | EngineError::Configuration(_)
            | EngineError::StepLimitExceeded(_)
            | EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

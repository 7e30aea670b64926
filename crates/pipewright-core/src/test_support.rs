//! In-process HTTP stubs for wire-level tests.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::Response;
use axum::Router;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub uri: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

type Responder = Arc<dyn Fn(&RecordedRequest) -> Response<Body> + Send + Sync>;

#[derive(Clone)]
struct StubState {
    tx: UnboundedSender<RecordedRequest>,
    responder: Responder,
}

async fn stub_handler(State(state): State<StubState>, request: Request) -> Response<Body> {
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, 4 * 1024 * 1024).await.unwrap_or_default();
    let headers = parts
        .headers
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
        .collect();
    let record = RecordedRequest {
        method: parts.method.to_string(),
        uri: parts.uri.to_string(),
        headers,
        body: bytes.to_vec(),
    };
    let response = (state.responder)(&record);
    let _ = state.tx.send(record);
    response
}

/// Serve every path with `responder`, recording each request. Returns the
/// base URL (`http://127.0.0.1:<port>`).
pub async fn spawn_stub_server<F>(responder: F) -> (String, UnboundedReceiver<RecordedRequest>)
where
    F: Fn(&RecordedRequest) -> Response<Body> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = unbounded_channel();
    let state = StubState {
        tx,
        responder: Arc::new(responder),
    };

    let app = Router::new().fallback(stub_handler).with_state(state);
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app.into_make_service()).await {
            eprintln!("stub server exited with error: {err}");
        }
    });

    (format!("http://{}", addr), rx)
}

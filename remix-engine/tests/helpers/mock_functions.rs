//! In-process stand-in for the AI functions
//!
//! Serves `POST /functions/v1/:function` on an ephemeral port, records every
//! request and answers with whatever reply was configured for the function.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// One request as received by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub function: String,
    pub api_key: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Value,
}

#[derive(Debug, Clone)]
struct MockReply {
    status: u16,
    body: String,
    delay: Duration,
}

#[derive(Clone, Default)]
struct MockState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    replies: Arc<Mutex<HashMap<String, MockReply>>>,
}

/// Running mock server; shut down on drop
pub struct MockFunctions {
    /// Functions base URL, e.g. "http://127.0.0.1:12345/functions/v1"
    pub base_url: String,
    state: MockState,
    shutdown: Option<oneshot::Sender<()>>,
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn handle(
    State(state): State<MockState>,
    Path(function): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Response {
    state.requests.lock().unwrap().push(RecordedRequest {
        function: function.clone(),
        api_key: header_value(&headers, "apikey"),
        authorization: header_value(&headers, "authorization"),
        content_type: header_value(&headers, "content-type"),
        body: serde_json::from_str(&body).unwrap_or(Value::Null),
    });

    let reply = state.replies.lock().unwrap().get(&function).cloned();
    let Some(reply) = reply else {
        return (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "application/json")],
            r#"{"error":"Unknown function"}"#.to_string(),
        )
            .into_response();
    };

    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    (
        StatusCode::from_u16(reply.status).unwrap(),
        [(header::CONTENT_TYPE, "application/json")],
        reply.body,
    )
        .into_response()
}

impl MockFunctions {
    /// Bind to 127.0.0.1:0 and start serving
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new()
            .route("/functions/v1/:function", post(handle))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            base_url: format!("http://{}/functions/v1", addr),
            state,
            shutdown: Some(tx),
        }
    }

    /// Answer `function` with `status` and a JSON body
    pub fn reply(&self, function: &str, status: u16, body: Value) {
        self.reply_raw(function, status, &body.to_string());
    }

    /// Answer `function` with `status` and a raw body
    pub fn reply_raw(&self, function: &str, status: u16, body: &str) {
        self.set(function, status, body.to_string(), Duration::ZERO);
    }

    /// Answer `function` after `delay`
    pub fn reply_delayed(&self, function: &str, status: u16, body: Value, delay: Duration) {
        self.set(function, status, body.to_string(), delay);
    }

    fn set(&self, function: &str, status: u16, body: String, delay: Duration) {
        self.state
            .replies
            .lock()
            .unwrap()
            .insert(function.to_string(), MockReply { status, body, delay });
    }

    /// Requests received for `function`, oldest first
    pub fn requests_for(&self, function: &str) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.function == function)
            .cloned()
            .collect()
    }
}

impl Drop for MockFunctions {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

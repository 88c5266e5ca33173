//! In-process DKG node for integration tests.
//!
//! Every submit route answers with the handle `<route>-1`. Results are
//! scripted per route: each poll pops the next response and the last one
//! repeats.

#![allow(dead_code)]

use axum::Router;
use axum::extract::{OriginalUri, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use dkg::ClientConfig;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// One request the node received.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub authorization: Option<String>,
    pub body: String,
}

#[derive(Default)]
struct NodeState {
    api_key: Option<String>,
    rate_limited: bool,
    results: HashMap<String, VecDeque<Value>>,
    requests: Vec<Recorded>,
    polls: HashMap<String, usize>,
}

#[derive(Clone, Default)]
pub struct MockNode {
    state: Arc<Mutex<NodeState>>,
}

impl MockNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject requests without `Authorization: Bearer <key>`.
    pub fn with_api_key(self, key: &str) -> Self {
        self.state.lock().expect("lock").api_key = Some(key.to_string());
        self
    }

    /// Answer every request with 429.
    pub fn rate_limited(self) -> Self {
        self.state.lock().expect("lock").rate_limited = true;
        self
    }

    /// Poll responses for the operation submitted on `route`.
    pub fn script(self, route: &str, responses: Vec<Value>) -> Self {
        self.state
            .lock()
            .expect("lock")
            .results
            .insert(route.to_string(), responses.into());
        self
    }

    /// Submissions received on `route`.
    pub fn requests(&self, route: &str) -> Vec<Recorded> {
        let path = format!("/{route}");
        self.state
            .lock()
            .expect("lock")
            .requests
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    /// Result polls received for the operation on `route`.
    pub fn polls(&self, route: &str) -> usize {
        self.state
            .lock()
            .expect("lock")
            .polls
            .get(route)
            .copied()
            .unwrap_or(0)
    }

    /// Bind to an ephemeral port and return the base URL.
    pub async fn spawn(self) -> String {
        let app = Router::new()
            .route("/info", get(info))
            .route("/publish", post(submit))
            .route("/update", post(submit))
            .route("/resolve", get(submit))
            .route("/entities:search", get(submit))
            .route("/assertions:search", get(submit))
            .route("/query", post(submit))
            .route("/proofs:get", post(submit))
            .route("/{route}/result/{handle}", get(result))
            .with_state(self);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        format!("http://{addr}")
    }

    fn reject(&self, headers: &HeaderMap) -> Option<Response> {
        let state = self.state.lock().expect("lock");
        if state.rate_limited {
            return Some((StatusCode::TOO_MANY_REQUESTS, "slow down").into_response());
        }
        let key = state.api_key.as_ref()?;
        let expected = format!("Bearer {key}");
        let given = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        (given != Some(expected.as_str()))
            .then(|| (StatusCode::UNAUTHORIZED, "missing token").into_response())
    }
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn info(State(node): State<MockNode>, headers: HeaderMap) -> Response {
    if let Some(rejection) = node.reject(&headers) {
        return rejection;
    }
    axum::Json(json!({"version": "6.0.1", "nodeId": "mock"})).into_response()
}

async fn submit(
    State(node): State<MockNode>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Some(rejection) = node.reject(&headers) {
        return rejection;
    }
    let route = uri.path().trim_start_matches('/').to_string();
    node.state.lock().expect("lock").requests.push(Recorded {
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        content_type: header_value(&headers, header::CONTENT_TYPE),
        authorization: header_value(&headers, header::AUTHORIZATION),
        body,
    });
    axum::Json(json!({ "handler_id": handle(&route) })).into_response()
}

async fn result(
    State(node): State<MockNode>,
    Path((route, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if let Some(rejection) = node.reject(&headers) {
        return rejection;
    }
    if id != handle(&route) {
        return (StatusCode::NOT_FOUND, "unknown handle").into_response();
    }

    let mut state = node.state.lock().expect("lock");
    *state.polls.entry(route.clone()).or_default() += 1;
    let Some(script) = state.results.get_mut(&route) else {
        return (StatusCode::NOT_FOUND, "nothing scripted").into_response();
    };
    let next = if script.len() > 1 {
        script.pop_front()
    } else {
        script.front().cloned()
    };
    match next {
        Some(body) => axum::Json(body).into_response(),
        None => (StatusCode::NOT_FOUND, "nothing scripted").into_response(),
    }
}

/// Handle issued for submissions on `route`.
pub fn handle(route: &str) -> String {
    format!("{route}-1")
}

pub fn pending() -> Value {
    json!({"status": "PENDING", "data": null})
}

pub fn completed(data: Value) -> Value {
    json!({"status": "COMPLETED", "data": data})
}

pub fn failed(message: &str) -> Value {
    json!({"status": "FAILED", "data": null, "message": message})
}

/// Client config against `url` that polls without waiting between ticks.
pub fn test_config(url: &str) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.node.url = url.to_string();
    config.polling.frequency_secs = 0;
    config.polling.max_retries = 3;
    config.search.timeout_secs = 5;
    config
}

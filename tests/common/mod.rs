//! Stub consultation backend shared by the integration tests.
//!
//! An Axum server on a random port that records every request and answers
//! with canned payloads shaped like the real backend's.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use parasara_chat::api::endpoints;

/// Maximum time any wait is allowed before the test is considered hung.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Query message that makes the stub answer with a non-JSON body.
pub const MALFORMED_TRIGGER: &str = "send me garbage";

/// Token the stub treats as expired.
pub const EXPIRED_TOKEN: &str = "expired-token";

/// One request as the stub saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: &'static str,
    pub path: &'static str,
    pub authorization: Option<String>,
    pub params: HashMap<String, String>,
    pub body: Value,
}

#[derive(Default)]
pub struct Stub {
    requests: Mutex<Vec<Recorded>>,
    /// Query messages containing any of these get a 500.
    fail_on: Mutex<Vec<String>>,
}

impl Stub {
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    /// Query messages in the order they arrived.
    pub fn query_messages(&self) -> Vec<String> {
        self.requests_to(endpoints::QUERY)
            .iter()
            .map(|r| r.body["message"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub fn fail_queries_containing(&self, needle: &str) {
        self.fail_on.lock().unwrap().push(needle.to_string());
    }

    fn record(
        &self,
        method: &'static str,
        path: &'static str,
        headers: &HeaderMap,
        params: HashMap<String, String>,
        body: Value,
    ) {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        self.requests.lock().unwrap().push(Recorded {
            method,
            path,
            authorization,
            params,
            body,
        });
    }

    fn should_fail(&self, message: &str) -> bool {
        self.fail_on
            .lock()
            .unwrap()
            .iter()
            .any(|needle| message.contains(needle.as_str()))
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Returns an error response unless a usable bearer token is present.
fn check_auth(headers: &HeaderMap) -> Option<Response> {
    match headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        None => Some(error(StatusCode::UNAUTHORIZED, "Authentication required")),
        Some(value) if value == format!("Bearer {EXPIRED_TOKEN}") => {
            Some(error(StatusCode::UNAUTHORIZED, "Token has expired"))
        }
        Some(_) => None,
    }
}

async fn start(State(stub): State<Arc<Stub>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    stub.record("POST", endpoints::START, &headers, HashMap::new(), body);
    if let Some(denied) = check_auth(&headers) {
        return denied;
    }
    Json(json!({
        "success": true,
        "conversation_id": "srv-start",
        "initial_response": "Namaste from the server"
    }))
    .into_response()
}

async fn query(State(stub): State<Arc<Stub>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let message = body["message"].as_str().unwrap_or_default().to_string();
    stub.record("POST", endpoints::QUERY, &headers, HashMap::new(), body);

    if stub.should_fail(&message) {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process query");
    }
    if message == MALFORMED_TRIGGER {
        return (StatusCode::OK, "<html>gateway hiccup</html>").into_response();
    }
    Json(json!({
        "response": format!("echo: {message}"),
        "conversation_id": "srv-conv"
    }))
    .into_response()
}

async fn history(
    State(stub): State<Arc<Stub>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let id = params.get("conversation_id").cloned().unwrap_or_default();
    stub.record("GET", endpoints::HISTORY, &headers, params, Value::Null);
    if let Some(denied) = check_auth(&headers) {
        return denied;
    }
    if id.is_empty() {
        return error(StatusCode::BAD_REQUEST, "Conversation ID is required");
    }
    Json(json!({
        "conversation_id": id,
        "messages": [
            {"id": "m1", "role": "user", "content": "When will I marry?", "timestamp": "2024-03-01T10:00:00"},
            {"id": "m2", "role": "assistant", "content": "Venus favours late 2025.", "timestamp": "2024-03-01T10:00:05"}
        ]
    }))
    .into_response()
}

async fn conversations(State(stub): State<Arc<Stub>>, headers: HeaderMap) -> Response {
    stub.record("GET", endpoints::CONVERSATIONS, &headers, HashMap::new(), Value::Null);
    if let Some(denied) = check_auth(&headers) {
        return denied;
    }
    Json(json!({
        "conversations": [
            {"id": "c2", "title": "Finance reading", "created_at": "2024-03-02T09:00:00", "last_updated": "2024-03-02T09:30:00"},
            {"id": "c1", "title": "Career reading", "created_at": "2024-03-01T10:00:00", "last_updated": "2024-03-01T10:20:00"}
        ]
    }))
    .into_response()
}

async fn load_profile(State(stub): State<Arc<Stub>>, headers: HeaderMap) -> Response {
    stub.record("GET", endpoints::PROFILE, &headers, HashMap::new(), Value::Null);
    if let Some(denied) = check_auth(&headers) {
        return denied;
    }
    Json(json!({
        "name": "Asha",
        "email": "asha@example.com",
        "birth_details": {
            "date": "1990-08-15",
            "time": "14:30",
            "place": "Mumbai, India",
            "latitude": 19.076,
            "longitude": 72.8777
        }
    }))
    .into_response()
}

async fn update_profile(
    State(stub): State<Arc<Stub>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    stub.record("PUT", endpoints::PROFILE, &headers, HashMap::new(), body);
    if let Some(denied) = check_auth(&headers) {
        return denied;
    }
    Json(json!({ "success": true, "message": "Profile updated successfully" })).into_response()
}

/// Start the stub on a random port, return (base url, stub).
pub async fn start_stub() -> (String, Arc<Stub>) {
    let stub = Arc::new(Stub::default());
    let app = Router::new()
        .route(endpoints::START, post(start))
        .route(endpoints::QUERY, post(query))
        .route(endpoints::HISTORY, get(history))
        .route(endpoints::CONVERSATIONS, get(conversations))
        .route(endpoints::PROFILE, get(load_profile).put(update_profile))
        .with_state(Arc::clone(&stub));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("http://127.0.0.1:{port}"), stub)
}

/// A base url nothing is listening on.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

//! Shared helpers for HTTP-level tests

#![allow(dead_code, clippy::unwrap_used)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use opsdesk_api::{AppState, build_router_with_state};
use opsdesk_core::Config;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Seeded state with default configuration
pub fn seeded_state() -> Arc<AppState> {
    Arc::new(AppState::new(Config::default()).unwrap())
}

/// State over empty stores
pub fn empty_state() -> Arc<AppState> {
    let mut config = Config::default();
    config.api.seed_sample_data = false;
    Arc::new(AppState::new(config).unwrap())
}

/// Router over the given state
pub fn app(state: &Arc<AppState>) -> Router {
    build_router_with_state(Arc::clone(state))
}

/// Send a GET request
pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Send a JSON POST request
pub async fn post_json(app: Router, uri: &str, body: &impl Serialize) -> Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Read the body as JSON, asserting the status first
pub async fn json_body(response: Response, status: StatusCode) -> Value {
    assert_eq!(response.status(), status);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Read the body as text
pub async fn text_body(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

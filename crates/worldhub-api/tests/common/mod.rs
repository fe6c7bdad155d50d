//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;
use worldhub_api::state::AppState;
use worldhub_membership::application::capabilities::RoleCapabilities;
use worldhub_test_support::{FixedClock, InMemoryWorldStore, fixed_now};

/// Builds application state over `store` with role-based capabilities, the
/// same wiring as `main.rs` minus PostgreSQL.
pub fn build_state(store: &Arc<InMemoryWorldStore>, system_admins: &[Uuid]) -> AppState {
    let capabilities = RoleCapabilities::new(Arc::clone(store), system_admins.iter().copied());
    AppState::new(
        store.clone(),
        Arc::new(capabilities),
        Arc::new(FixedClock(fixed_now())),
    )
}

/// Builds the full app router over `state`.
pub fn build_test_app(state: AppState) -> Router {
    worldhub_api::app(state)
}

async fn send(
    app: Router,
    method: &str,
    uri: &str,
    user_id: Option<Uuid>,
    body: Option<&serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user_id) = user_id {
        builder = builder.header("x-user-id", user_id.to_string());
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

/// Sends a request with a JSON body as `user_id`.
pub async fn send_json(
    app: Router,
    method: &str,
    uri: &str,
    user_id: Uuid,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, method, uri, Some(user_id), Some(body)).await
}

/// Sends a POST request with a JSON body as `user_id`.
pub async fn post_json(
    app: Router,
    uri: &str,
    user_id: Uuid,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, "POST", uri, Some(user_id), Some(body)).await
}

/// Sends a bodiless request as `user_id`.
pub async fn send_empty(
    app: Router,
    method: &str,
    uri: &str,
    user_id: Uuid,
) -> (StatusCode, serde_json::Value) {
    send(app, method, uri, Some(user_id), None).await
}

/// Sends a GET request, optionally as `user_id`.
pub async fn get_json(
    app: Router,
    uri: &str,
    user_id: Option<Uuid>,
) -> (StatusCode, serde_json::Value) {
    send(app, "GET", uri, user_id, None).await
}

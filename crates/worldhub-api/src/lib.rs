//! Worldhub: HTTP and WebSocket edge.

use axum::Router;

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

/// Builds the full application router over `state`.
pub fn app(state: state::AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_router())
        .with_state(state)
}

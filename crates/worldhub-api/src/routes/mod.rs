//! Route modules organized by resource.

use axum::Router;

use crate::state::AppState;

pub mod health;
pub mod invites;
pub mod keywords;
pub mod members;
pub mod worlds;
pub mod ws;

/// Every route served under `/api/v1`.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(invites::router())
        .merge(members::router())
        .merge(worlds::router())
        .merge(keywords::router())
        .merge(ws::router())
}

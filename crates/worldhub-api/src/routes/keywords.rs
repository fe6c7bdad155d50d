//! Routes for a world's keyword list.
//!
//! Every mutation holds the world's sequencer guard from the handler call
//! until its event is handed to the fan-out, so subscribers see events in
//! revision order.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;
use worldhub_core::model::WorldKeyword;
use worldhub_keywords::application::command_handlers::{
    self, KeywordMutation, KeywordOutcome, KeywordStats,
};
use worldhub_keywords::application::query_handlers::{self, KeywordList};
use worldhub_keywords::domain::commands::{
    BulkDeleteKeywords, CreateKeyword, DeleteKeyword, ImportKeywords, ImportMode, KeywordDraft,
    KeywordPosition, ReorderKeywords, UpdateKeyword,
};

use crate::error::ApiError;
use crate::extract::{ActingUser, RequestId};
use crate::state::AppState;

/// Request body for POST /worlds/{world_id}/keywords.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKeywordRequest {
    /// Grouping label; empty when absent.
    #[serde(default)]
    pub category: String,
    /// Keyword text.
    pub content: String,
    /// Defaults to enabled.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Insert position; appended when absent.
    #[serde(default)]
    pub position: Option<i32>,
}

fn enabled_by_default() -> bool {
    true
}

/// Request body for PATCH /worlds/{world_id}/keywords/{keyword_id}.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateKeywordRequest {
    /// New grouping label.
    pub category: Option<String>,
    /// New keyword text.
    pub content: Option<String>,
    /// New enabled flag.
    pub enabled: Option<bool>,
    /// New position.
    pub position: Option<i32>,
}

/// Request body for POST /worlds/{world_id}/keywords/bulk-delete.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteRequest {
    /// Keywords to delete.
    pub keyword_ids: Vec<Uuid>,
}

/// Request body for POST /worlds/{world_id}/keywords/reorder.
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    /// Target position of each keyword.
    pub items: Vec<KeywordPosition>,
}

/// Request body for POST /worlds/{world_id}/keywords/import.
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    /// Additive unless `replace` is given.
    #[serde(default)]
    pub mode: ImportMode,
    /// Keywords to import.
    pub items: Vec<KeywordDraft>,
}

/// Response body for every keyword mutation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordMutationResponse {
    /// The created or updated keyword.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<WorldKeyword>,
    /// The deleted keyword's id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_id: Option<Uuid>,
    /// Counts for bulk operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<KeywordStats>,
    /// The world's keyword revision after the mutation.
    pub revision: i64,
}

impl From<KeywordMutation> for KeywordMutationResponse {
    fn from(mutation: KeywordMutation) -> Self {
        let mut response = Self {
            item: None,
            deleted_id: None,
            stats: None,
            revision: mutation.revision,
        };
        match mutation.outcome {
            KeywordOutcome::Item(keyword) => response.item = Some(keyword),
            KeywordOutcome::Removed(id) => response.deleted_id = Some(id),
            KeywordOutcome::Stats(stats) => response.stats = Some(stats),
        }
        response
    }
}

/// Broadcasts a keyword mutation's event and shapes its response. Call
/// while still holding the world's sequencer guard.
fn finish(state: &AppState, mutation: KeywordMutation) -> Json<KeywordMutationResponse> {
    state.publish(mutation.event.as_ref());
    Json(mutation.into())
}

/// GET /worlds/{world_id}/keywords
#[instrument(skip(state))]
async fn list_keywords(
    State(state): State<AppState>,
    ActingUser(viewer_id): ActingUser,
    Path(world_id): Path<Uuid>,
) -> Result<Json<KeywordList>, ApiError> {
    let list = query_handlers::list_keywords(world_id, viewer_id, state.store.as_ref()).await?;
    Ok(Json(list))
}

/// POST /worlds/{world_id}/keywords
#[instrument(skip(state, request_id, body))]
async fn create_keyword(
    State(state): State<AppState>,
    ActingUser(actor_id): ActingUser,
    RequestId(request_id): RequestId,
    Path(world_id): Path<Uuid>,
    body: Result<Json<CreateKeywordRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<KeywordMutationResponse>), ApiError> {
    let Json(request) = body?;
    let command = CreateKeyword {
        request_id,
        world_id,
        actor_id,
        category: request.category,
        content: request.content,
        enabled: request.enabled,
        position: request.position,
    };

    let _guard = state.sequencer.acquire(world_id).await;
    let mutation = command_handlers::handle_create_keyword(
        &command,
        state.clock.as_ref(),
        state.capabilities.as_ref(),
        state.store.as_ref(),
    )
    .await?;

    Ok((StatusCode::CREATED, finish(&state, mutation)))
}

/// PATCH /worlds/{world_id}/keywords/{keyword_id}
#[instrument(skip(state, request_id, body))]
async fn update_keyword(
    State(state): State<AppState>,
    ActingUser(actor_id): ActingUser,
    RequestId(request_id): RequestId,
    Path((world_id, keyword_id)): Path<(Uuid, Uuid)>,
    body: Result<Json<UpdateKeywordRequest>, JsonRejection>,
) -> Result<Json<KeywordMutationResponse>, ApiError> {
    let Json(request) = body?;
    let command = UpdateKeyword {
        request_id,
        world_id,
        actor_id,
        keyword_id,
        category: request.category,
        content: request.content,
        enabled: request.enabled,
        position: request.position,
    };

    let _guard = state.sequencer.acquire(world_id).await;
    let mutation = command_handlers::handle_update_keyword(
        &command,
        state.clock.as_ref(),
        state.capabilities.as_ref(),
        state.store.as_ref(),
    )
    .await?;

    Ok(finish(&state, mutation))
}

/// DELETE /worlds/{world_id}/keywords/{keyword_id}
#[instrument(skip(state, request_id))]
async fn delete_keyword(
    State(state): State<AppState>,
    ActingUser(actor_id): ActingUser,
    RequestId(request_id): RequestId,
    Path((world_id, keyword_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<KeywordMutationResponse>, ApiError> {
    let command = DeleteKeyword {
        request_id,
        world_id,
        actor_id,
        keyword_id,
    };

    let _guard = state.sequencer.acquire(world_id).await;
    let mutation = command_handlers::handle_delete_keyword(
        &command,
        state.clock.as_ref(),
        state.capabilities.as_ref(),
        state.store.as_ref(),
    )
    .await?;

    Ok(finish(&state, mutation))
}

/// POST /worlds/{world_id}/keywords/bulk-delete
#[instrument(skip(state, request_id, body))]
async fn bulk_delete_keywords(
    State(state): State<AppState>,
    ActingUser(actor_id): ActingUser,
    RequestId(request_id): RequestId,
    Path(world_id): Path<Uuid>,
    body: Result<Json<BulkDeleteRequest>, JsonRejection>,
) -> Result<Json<KeywordMutationResponse>, ApiError> {
    let Json(request) = body?;
    let command = BulkDeleteKeywords {
        request_id,
        world_id,
        actor_id,
        keyword_ids: request.keyword_ids,
    };

    let _guard = state.sequencer.acquire(world_id).await;
    let mutation = command_handlers::handle_bulk_delete_keywords(
        &command,
        state.clock.as_ref(),
        state.capabilities.as_ref(),
        state.store.as_ref(),
    )
    .await?;

    Ok(finish(&state, mutation))
}

/// POST /worlds/{world_id}/keywords/reorder
#[instrument(skip(state, request_id, body))]
async fn reorder_keywords(
    State(state): State<AppState>,
    ActingUser(actor_id): ActingUser,
    RequestId(request_id): RequestId,
    Path(world_id): Path<Uuid>,
    body: Result<Json<ReorderRequest>, JsonRejection>,
) -> Result<Json<KeywordMutationResponse>, ApiError> {
    let Json(request) = body?;
    let command = ReorderKeywords {
        request_id,
        world_id,
        actor_id,
        items: request.items,
    };

    let _guard = state.sequencer.acquire(world_id).await;
    let mutation = command_handlers::handle_reorder_keywords(
        &command,
        state.clock.as_ref(),
        state.capabilities.as_ref(),
        state.store.as_ref(),
    )
    .await?;

    Ok(finish(&state, mutation))
}

/// POST /worlds/{world_id}/keywords/import
#[instrument(skip(state, request_id, body))]
async fn import_keywords(
    State(state): State<AppState>,
    ActingUser(actor_id): ActingUser,
    RequestId(request_id): RequestId,
    Path(world_id): Path<Uuid>,
    body: Result<Json<ImportRequest>, JsonRejection>,
) -> Result<Json<KeywordMutationResponse>, ApiError> {
    let Json(request) = body?;
    let command = ImportKeywords {
        request_id,
        world_id,
        actor_id,
        mode: request.mode,
        items: request.items,
    };

    let _guard = state.sequencer.acquire(world_id).await;
    let mutation = command_handlers::handle_import_keywords(
        &command,
        state.clock.as_ref(),
        state.capabilities.as_ref(),
        state.store.as_ref(),
    )
    .await?;

    Ok(finish(&state, mutation))
}

/// Returns the router for keyword routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/worlds/{world_id}/keywords",
            get(list_keywords).post(create_keyword),
        )
        .route(
            "/worlds/{world_id}/keywords/{keyword_id}",
            patch(update_keyword).delete(delete_keyword),
        )
        .route("/worlds/{world_id}/keywords/bulk-delete", post(bulk_delete_keywords))
        .route("/worlds/{world_id}/keywords/reorder", post(reorder_keywords))
        .route("/worlds/{world_id}/keywords/import", post(import_keywords))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;
    use worldhub_realtime::Connection;
    use worldhub_test_support::{
        FixedClock, InMemoryWorldStore, StaticCapabilities, fixed_now, seed_keyword, seed_world,
    };

    use super::*;

    fn post_json(uri: String, user_id: Uuid, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("x-user-id", user_id.to_string())
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    async fn json_of(response: axum::response::Response) -> Value {
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body_bytes).unwrap()
    }

    #[tokio::test]
    async fn test_create_keyword_returns_item_and_broadcasts_revision() {
        // Arrange
        let store = Arc::new(InMemoryWorldStore::new());
        let owner_id = Uuid::new_v4();
        let world = seed_world(&store, owner_id);
        let state = AppState::new(
            store,
            Arc::new(StaticCapabilities::deny_all()),
            Arc::new(FixedClock(fixed_now())),
        );
        let (connection, mut rx) = Connection::channel(8);
        state.registry().register(connection, world.id, owner_id);
        let app = router().with_state(state);

        // Act
        let response = app
            .oneshot(post_json(
                format!("/worlds/{}/keywords", world.id),
                owner_id,
                r#"{"content":"dragon","category":"creatures"}"#,
            ))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = json_of(response).await;
        assert_eq!(json["revision"], 1);
        assert_eq!(json["item"]["content"], "dragon");
        assert!(json.get("stats").is_none());
        let event: Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(event["type"], "world.keywords_changed");
        assert_eq!(event["revision"], 1);
    }

    #[tokio::test]
    async fn test_bulk_delete_reports_skipped_ids() {
        // Arrange
        let store = Arc::new(InMemoryWorldStore::new());
        let owner_id = Uuid::new_v4();
        let world = seed_world(&store, owner_id);
        let k1 = seed_keyword(&store, world.id, 0, "k1");
        let k3 = seed_keyword(&store, world.id, 1, "k3");
        let state = AppState::new(
            store,
            Arc::new(StaticCapabilities::deny_all()),
            Arc::new(FixedClock(fixed_now())),
        );
        let body = format!(
            r#"{{"keywordIds":["{}","{}","{}"]}}"#,
            k1.id,
            Uuid::new_v4(),
            k3.id
        );

        // Act
        let response = router()
            .with_state(state)
            .oneshot(post_json(
                format!("/worlds/{}/keywords/bulk-delete", world.id),
                owner_id,
                &body,
            ))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_of(response).await;
        assert_eq!(json["stats"]["deleted"], 2);
        assert_eq!(json["stats"]["skipped"], 1);
        assert_eq!(json["revision"], 1);
    }

    #[tokio::test]
    async fn test_create_keyword_by_outsider_returns_403() {
        let store = Arc::new(InMemoryWorldStore::new());
        let world = seed_world(&store, Uuid::new_v4());
        let state = AppState::new(
            store,
            Arc::new(StaticCapabilities::deny_all()),
            Arc::new(FixedClock(fixed_now())),
        );

        let response = router()
            .with_state(state)
            .oneshot(post_json(
                format!("/worlds/{}/keywords", world.id),
                Uuid::new_v4(),
                r#"{"content":"dragon"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_malformed_body_returns_400() {
        let store = Arc::new(InMemoryWorldStore::new());
        let owner_id = Uuid::new_v4();
        let world = seed_world(&store, owner_id);
        let state = AppState::new(
            store,
            Arc::new(StaticCapabilities::deny_all()),
            Arc::new(FixedClock(fixed_now())),
        );

        let response = router()
            .with_state(state)
            .oneshot(post_json(
                format!("/worlds/{}/keywords/reorder", world.id),
                owner_id,
                r#"{"items":"nope"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_of(response).await["error"], "validation_error");
    }
}

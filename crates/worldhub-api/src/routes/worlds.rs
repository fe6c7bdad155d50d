//! Routes for world settings.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::patch;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;
use worldhub_core::model::{Visibility, World};
use worldhub_membership::application::world_settings;
use worldhub_membership::domain::commands::UpdateWorldSettings;

use crate::error::ApiError;
use crate::extract::{ActingUser, RequestId};
use crate::state::AppState;

/// Request body for PATCH /worlds/{world_id}. Absent fields keep their value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorldRequest {
    /// New display name.
    pub name: Option<String>,
    /// New visibility.
    pub visibility: Option<Visibility>,
    /// Whether editors may change keywords.
    pub members_can_edit_keywords: Option<bool>,
}

/// PATCH /worlds/{world_id}
#[instrument(skip(state, request_id, body))]
async fn update_world(
    State(state): State<AppState>,
    ActingUser(actor_id): ActingUser,
    RequestId(request_id): RequestId,
    Path(world_id): Path<Uuid>,
    body: Result<Json<UpdateWorldRequest>, JsonRejection>,
) -> Result<Json<World>, ApiError> {
    let Json(request) = body?;
    let command = UpdateWorldSettings {
        request_id,
        world_id,
        actor_id,
        name: request.name,
        visibility: request.visibility,
        members_can_edit_keywords: request.members_can_edit_keywords,
    };

    let _guard = state.sequencer.acquire(world_id).await;
    let result = world_settings::handle_update_world_settings(
        &command,
        state.clock.as_ref(),
        state.capabilities.as_ref(),
        state.store.as_ref(),
    )
    .await?;
    state.publish(result.event.as_ref());
    if result.event.is_some() && result.world.visibility == Visibility::Private {
        state.evict_outsiders(world_id).await;
    }

    Ok(Json(result.world))
}

/// Returns the router for world settings.
pub fn router() -> Router<AppState> {
    Router::new().route("/worlds/{world_id}", patch(update_world))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;
    use worldhub_core::event::{KEYWORDS_CHANGED_EVENT_TYPE, WorldEvent};
    use worldhub_realtime::Connection;
    use worldhub_test_support::{
        FixedClock, InMemoryWorldStore, StaticCapabilities, fixed_now, seed_world,
    };

    use super::*;

    fn patch_request(world_id: Uuid, user_id: Uuid, body: &str) -> Request<Body> {
        Request::builder()
            .method("PATCH")
            .uri(format!("/worlds/{world_id}"))
            .header("x-user-id", user_id.to_string())
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_admin_update_returns_world_and_broadcasts() {
        // Arrange
        let store = Arc::new(InMemoryWorldStore::new());
        let owner_id = Uuid::new_v4();
        let world = seed_world(&store, owner_id);
        let state = AppState::new(
            store,
            Arc::new(StaticCapabilities::deny_all().with_world_admin(world.id, owner_id)),
            Arc::new(FixedClock(fixed_now())),
        );
        let (connection, mut rx) = Connection::channel(4);
        state.registry().register(connection, world.id, owner_id);

        // Act
        let response = router()
            .with_state(state)
            .oneshot(patch_request(
                world.id,
                owner_id,
                r#"{"visibility":"public","membersCanEditKeywords":true}"#,
            ))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(json["visibility"], "public");
        assert_eq!(json["membersCanEditKeywords"], true);
        let event: Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(event["type"], "world.updated");
    }

    #[tokio::test]
    async fn test_going_private_unsubscribes_non_members_after_the_update() {
        // Arrange
        let store = Arc::new(InMemoryWorldStore::new());
        let owner_id = Uuid::new_v4();
        let world = World {
            visibility: Visibility::Public,
            ..seed_world(&store, owner_id)
        };
        store.insert_world(world.clone());
        let state = AppState::new(
            store,
            Arc::new(StaticCapabilities::deny_all().with_world_admin(world.id, owner_id)),
            Arc::new(FixedClock(fixed_now())),
        );
        let outsider_id = Uuid::new_v4();
        let (owner_tab, mut owner_rx) = Connection::channel(4);
        let owner_tab_id = owner_tab.id();
        let (outsider_tab, mut outsider_rx) = Connection::channel(4);
        let outsider_tab_id = outsider_tab.id();
        state.registry().register(owner_tab, world.id, owner_id);
        state.registry().register(outsider_tab, world.id, outsider_id);

        // Act
        let response = router()
            .with_state(state.clone())
            .oneshot(patch_request(world.id, owner_id, r#"{"visibility":"private"}"#))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        let seen: Value = serde_json::from_str(&outsider_rx.try_recv().unwrap()).unwrap();
        assert_eq!(seen["type"], "world.updated");
        assert!(owner_rx.try_recv().is_ok());
        assert_eq!(state.registry().world_of(outsider_tab_id), None);
        assert_eq!(state.registry().world_of(owner_tab_id), Some(world.id));

        let later = WorldEvent::new(KEYWORDS_CHANGED_EVENT_TYPE, world.id, 0);
        state.publish(Some(&later));
        assert!(outsider_rx.try_recv().is_err());
        assert!(owner_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_non_admin_update_returns_403() {
        let store = Arc::new(InMemoryWorldStore::new());
        let world = seed_world(&store, Uuid::new_v4());
        let state = AppState::new(
            store,
            Arc::new(StaticCapabilities::deny_all()),
            Arc::new(FixedClock(fixed_now())),
        );

        let response = router()
            .with_state(state)
            .oneshot(patch_request(world.id, Uuid::new_v4(), r#"{"name":"Mine"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}

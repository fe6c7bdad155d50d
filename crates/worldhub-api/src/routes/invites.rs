//! Routes for invite consumption and administration.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::post};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;
use worldhub_core::model::{MemberRole, World, WorldInvite, WorldMember};
use worldhub_membership::application::invite_ledger;
use worldhub_membership::domain::commands;

use crate::error::ApiError;
use crate::extract::{ActingUser, RequestId};
use crate::state::AppState;

/// Response body for POST /invites/{slug}/accept.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptInviteResponse {
    /// The invite after consumption.
    pub invite: WorldInvite,
    /// The joined world.
    pub world: World,
    /// The caller's membership.
    pub member: WorldMember,
    /// Whether the caller was already a member.
    pub already_joined: bool,
}

/// Request body for POST /worlds/{world_id}/invites.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInviteRequest {
    /// Use cap, `0` for unlimited.
    #[serde(default)]
    pub max_use: i32,
    /// Optional expiry.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Role granted to consumers.
    #[serde(default = "default_invite_role")]
    pub role: MemberRole,
}

fn default_invite_role() -> MemberRole {
    MemberRole::Member
}

/// POST /invites/{slug}/accept
#[instrument(skip(state, request_id), fields(user_id = %user_id))]
async fn accept_invite(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    RequestId(request_id): RequestId,
    Path(slug): Path<String>,
) -> Result<Json<AcceptInviteResponse>, ApiError> {
    let command = commands::ConsumeInvite {
        request_id,
        slug,
        user_id,
    };

    // Unknown slugs fall through to the ledger, which rejects them.
    let _guard = match state.store.get_invite_by_slug(&command.slug).await? {
        Some(invite) => Some(state.sequencer.acquire(invite.world_id).await),
        None => None,
    };
    let consumption = invite_ledger::handle_consume_invite(
        &command,
        state.invite_policy,
        state.clock.as_ref(),
        state.store.as_ref(),
    )
    .await?;

    state.publish(consumption.event.as_ref());
    info!(
        world_id = %consumption.world.id,
        already_joined = consumption.already_joined,
        "invite accepted"
    );

    Ok(Json(AcceptInviteResponse {
        invite: consumption.invite,
        world: consumption.world,
        member: consumption.member,
        already_joined: consumption.already_joined,
    }))
}

/// POST /worlds/{world_id}/invites
#[instrument(skip(state, request_id, body), fields(actor_id = %actor_id))]
async fn create_invite(
    State(state): State<AppState>,
    ActingUser(actor_id): ActingUser,
    RequestId(request_id): RequestId,
    Path(world_id): Path<Uuid>,
    body: Result<Json<CreateInviteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<WorldInvite>), ApiError> {
    let Json(request) = body?;
    let command = commands::CreateInvite {
        request_id,
        world_id,
        actor_id,
        max_use: request.max_use,
        expires_at: request.expires_at,
        role: request.role,
    };

    let invite = invite_ledger::handle_create_invite(
        &command,
        state.clock.as_ref(),
        state.capabilities.as_ref(),
        state.store.as_ref(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(invite)))
}

/// POST /invites/{invite_id}/revoke
#[instrument(skip(state, request_id), fields(actor_id = %actor_id))]
async fn revoke_invite(
    State(state): State<AppState>,
    ActingUser(actor_id): ActingUser,
    RequestId(request_id): RequestId,
    Path(invite_id): Path<Uuid>,
) -> Result<Json<WorldInvite>, ApiError> {
    let command = commands::RevokeInvite {
        request_id,
        invite_id,
        actor_id,
    };

    let invite = invite_ledger::handle_revoke_invite(
        &command,
        state.capabilities.as_ref(),
        state.store.as_ref(),
    )
    .await?;

    Ok(Json(invite))
}

/// Returns the router for invites. Both invite routes share the `{invite}`
/// segment: a slug for acceptance, an id for revocation.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/invites/{invite}/accept", post(accept_invite))
        .route("/invites/{invite}/revoke", post(revoke_invite))
        .route("/worlds/{world_id}/invites", post(create_invite))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;
    use worldhub_test_support::{
        FailingWorldStore, FixedClock, InMemoryWorldStore, StaticCapabilities, fixed_now,
        seed_invite, seed_world,
    };

    use super::*;

    fn state_over(store: Arc<InMemoryWorldStore>) -> AppState {
        AppState::new(
            store,
            Arc::new(StaticCapabilities::deny_all()),
            Arc::new(FixedClock(fixed_now())),
        )
    }

    fn accept_request(slug: &str, user_id: Uuid) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/invites/{slug}/accept"))
            .header("x-user-id", user_id.to_string())
            .body(Body::empty())
            .unwrap()
    }

    async fn json_of(response: axum::response::Response) -> Value {
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body_bytes).unwrap()
    }

    #[tokio::test]
    async fn test_accept_returns_200_with_membership() {
        // Arrange
        let store = Arc::new(InMemoryWorldStore::new());
        let world = seed_world(&store, Uuid::new_v4());
        seed_invite(&store, world.id, "abc123", 1);
        let app = router().with_state(state_over(Arc::clone(&store)));
        let user_id = Uuid::new_v4();

        // Act
        let response = app.oneshot(accept_request("abc123", user_id)).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_of(response).await;
        assert_eq!(json["alreadyJoined"], false);
        assert_eq!(json["member"]["userId"], user_id.to_string());
        assert_eq!(json["invite"]["status"], "exhausted");
        assert_eq!(json["world"]["id"], world.id.to_string());
    }

    #[tokio::test]
    async fn test_accept_waits_for_the_worlds_lane_before_broadcasting() {
        // Arrange
        let store = Arc::new(InMemoryWorldStore::new());
        let owner_id = Uuid::new_v4();
        let world = seed_world(&store, owner_id);
        seed_invite(&store, world.id, "lane01", 0);
        let state = state_over(Arc::clone(&store));
        let (connection, mut rx) = worldhub_realtime::Connection::channel(4);
        state.registry().register(connection, world.id, owner_id);
        let user_id = Uuid::new_v4();
        let lane = state.sequencer.acquire(world.id).await;
        let app = router().with_state(state.clone());

        // Act
        let mut accept =
            tokio::spawn(async move { app.oneshot(accept_request("lane01", user_id)).await });
        let waited =
            tokio::time::timeout(std::time::Duration::from_millis(50), &mut accept).await;

        // Assert
        assert!(waited.is_err(), "accept finished while the lane was held");
        assert!(rx.try_recv().is_err());
        assert_eq!(store.member_count(world.id), 1);

        drop(lane);
        let response = accept.await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let event: Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(event["type"], "world.member_joined");
        assert_eq!(event["userId"], user_id.to_string());
    }

    #[tokio::test]
    async fn test_accept_unknown_slug_returns_400_invite_invalid() {
        let store = Arc::new(InMemoryWorldStore::new());
        let app = router().with_state(state_over(store));

        let response = app
            .oneshot(accept_request("missing", Uuid::new_v4()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_of(response).await["error"], "invite_invalid");
    }

    #[tokio::test]
    async fn test_accept_without_user_header_is_forbidden() {
        let store = Arc::new(InMemoryWorldStore::new());
        let app = router().with_state(state_over(store));
        let request = Request::builder()
            .method("POST")
            .uri("/invites/abc123/accept")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_accept_returns_500_when_store_fails() {
        let state = AppState::new(
            Arc::new(FailingWorldStore),
            Arc::new(StaticCapabilities::deny_all()),
            Arc::new(FixedClock(fixed_now())),
        );
        let app = router().with_state(state);

        let response = app
            .oneshot(accept_request("abc123", Uuid::new_v4()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_of(response).await["error"], "infrastructure_error");
    }

    #[tokio::test]
    async fn test_create_invite_by_non_admin_returns_403() {
        // Arrange
        let store = Arc::new(InMemoryWorldStore::new());
        let world = seed_world(&store, Uuid::new_v4());
        let app = router().with_state(state_over(store));
        let request = Request::builder()
            .method("POST")
            .uri(format!("/worlds/{}/invites", world.id))
            .header("x-user-id", Uuid::new_v4().to_string())
            .header("content-type", "application/json")
            .body(Body::from(r#"{"maxUse":5}"#))
            .unwrap();

        // Act
        let response = app.oneshot(request).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_of(response).await["error"], "permission_denied");
    }
}

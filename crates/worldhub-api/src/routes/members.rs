//! Routes for the membership roster.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;
use worldhub_core::model::WorldMember;
use worldhub_membership::application::{membership_registry, query_handlers};
use worldhub_membership::domain::commands;

use crate::error::ApiError;
use crate::extract::{ActingUser, RequestId};
use crate::state::AppState;

/// Response body for POST /worlds/{world_id}/join.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    /// The caller's membership.
    pub member: WorldMember,
    /// Whether this request created it.
    pub joined: bool,
}

/// Response body for GET /worlds/{world_id}/members.
#[derive(Debug, Serialize)]
pub struct MembersResponse {
    /// Members in join order.
    pub members: Vec<WorldMember>,
}

/// Request body for PUT /worlds/{world_id}/members/{user_id}/role.
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    /// The new role name.
    pub role: String,
}

/// POST /worlds/{world_id}/join
#[instrument(skip(state, request_id))]
async fn join_world(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    RequestId(request_id): RequestId,
    Path(world_id): Path<Uuid>,
) -> Result<Json<JoinResponse>, ApiError> {
    let _guard = state.sequencer.acquire(world_id).await;
    let result = membership_registry::handle_join_public_world(
        world_id,
        user_id,
        request_id,
        state.clock.as_ref(),
        state.store.as_ref(),
    )
    .await?;
    state.publish(result.event.as_ref());

    Ok(Json(JoinResponse {
        joined: result.event.is_some(),
        member: result.member,
    }))
}

/// POST /worlds/{world_id}/leave
#[instrument(skip(state, request_id))]
async fn leave_world(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    RequestId(request_id): RequestId,
    Path(world_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let command = commands::LeaveWorld {
        request_id,
        world_id,
        user_id,
    };

    let _guard = state.sequencer.acquire(world_id).await;
    let result =
        membership_registry::handle_leave_world(&command, state.clock.as_ref(), state.store.as_ref())
            .await?;
    state.publish_departure(world_id, user_id, result.event.as_ref());

    Ok(StatusCode::NO_CONTENT)
}

/// GET /worlds/{world_id}/members
#[instrument(skip(state))]
async fn list_members(
    State(state): State<AppState>,
    ActingUser(viewer_id): ActingUser,
    Path(world_id): Path<Uuid>,
) -> Result<Json<MembersResponse>, ApiError> {
    let members = query_handlers::list_members(world_id, viewer_id, state.store.as_ref()).await?;
    Ok(Json(MembersResponse { members }))
}

/// DELETE /worlds/{world_id}/members/{user_id}
#[instrument(skip(state, request_id))]
async fn remove_member(
    State(state): State<AppState>,
    ActingUser(actor_id): ActingUser,
    RequestId(request_id): RequestId,
    Path((world_id, target_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let command = commands::RemoveMember {
        request_id,
        world_id,
        actor_id,
        target_id,
    };

    let _guard = state.sequencer.acquire(world_id).await;
    let result = membership_registry::handle_remove_member(
        &command,
        state.clock.as_ref(),
        state.capabilities.as_ref(),
        state.store.as_ref(),
    )
    .await?;
    state.publish_departure(world_id, target_id, result.event.as_ref());

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /worlds/{world_id}/members/{user_id}/role
#[instrument(skip(state, request_id, body))]
async fn update_member_role(
    State(state): State<AppState>,
    ActingUser(actor_id): ActingUser,
    RequestId(request_id): RequestId,
    Path((world_id, target_id)): Path<(Uuid, Uuid)>,
    body: Result<Json<UpdateRoleRequest>, JsonRejection>,
) -> Result<Json<WorldMember>, ApiError> {
    let Json(request) = body?;
    let command = commands::UpdateMemberRole {
        request_id,
        world_id,
        actor_id,
        target_id,
        role: request.role,
    };

    let _guard = state.sequencer.acquire(world_id).await;
    let result = membership_registry::handle_update_member_role(
        &command,
        state.clock.as_ref(),
        state.capabilities.as_ref(),
        state.store.as_ref(),
    )
    .await?;
    state.publish(result.event.as_ref());

    Ok(Json(result.member))
}

/// POST /worlds/{world_id}/edit-notice/ack
#[instrument(skip(state, request_id))]
async fn acknowledge_edit_notice(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    RequestId(request_id): RequestId,
    Path(world_id): Path<Uuid>,
) -> Result<Json<WorldMember>, ApiError> {
    let command = commands::AcknowledgeEditNotice {
        request_id,
        world_id,
        user_id,
    };

    let member = membership_registry::handle_acknowledge_edit_notice(
        &command,
        state.clock.as_ref(),
        state.store.as_ref(),
    )
    .await?;

    Ok(Json(member))
}

/// Returns the router for the membership roster.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/worlds/{world_id}/join", post(join_world))
        .route("/worlds/{world_id}/leave", post(leave_world))
        .route("/worlds/{world_id}/members", get(list_members))
        .route("/worlds/{world_id}/members/{user_id}", delete(remove_member))
        .route("/worlds/{world_id}/members/{user_id}/role", put(update_member_role))
        .route("/worlds/{world_id}/edit-notice/ack", post(acknowledge_edit_notice))
}

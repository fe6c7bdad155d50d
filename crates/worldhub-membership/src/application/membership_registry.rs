//! Command handlers for the membership roster.
//!
//! The owner row is protected twice: handlers reject owner targets with
//! `OwnerImmutable` up front, and the store's role-update and delete
//! statements only match non-owner rows.

use tracing::{debug, info};
use uuid::Uuid;
use worldhub_core::capability::CapabilityChecker;
use worldhub_core::clock::Clock;
use worldhub_core::command::Command;
use worldhub_core::error::DomainError;
use worldhub_core::event::WorldEvent;
use worldhub_core::model::{MemberRole, Visibility, WorldMember};
use worldhub_core::repository::{MemberInsert, WorldStore};

use crate::application::{load_active_world, require_admin};
use crate::domain::commands::{
    AcknowledgeEditNotice, JoinWorld, LeaveWorld, RemoveMember, UpdateMemberRole,
};

/// Result of a roster mutation.
#[derive(Debug, Clone)]
pub struct MembershipResult {
    /// The affected row. For removals and departures, the row as it was
    /// before deletion.
    pub member: WorldMember,
    /// The event to broadcast, or `None` when nothing changed.
    pub event: Option<WorldEvent>,
}

fn owner_immutable(member: &WorldMember) -> DomainError {
    DomainError::OwnerImmutable {
        world_id: member.world_id,
        user_id: member.user_id,
    }
}

/// Handles the `JoinWorld` command. Joining twice returns the existing row
/// and no event.
///
/// # Errors
///
/// Returns `DomainError::MemberInvalid` for an owner grant and
/// `DomainError::WorldNotFound` for a missing or deleted world.
pub async fn handle_join_world(
    command: &JoinWorld,
    clock: &dyn Clock,
    store: &dyn WorldStore,
) -> Result<MembershipResult, DomainError> {
    if command.role == MemberRole::Owner {
        return Err(DomainError::MemberInvalid(
            "the owner role cannot be granted".into(),
        ));
    }
    let world = load_active_world(store, command.world_id).await?;

    let candidate = WorldMember::new(world.id, command.user_id, command.role, clock.now());
    match store.upsert_member(&candidate).await? {
        MemberInsert::Inserted(member) => {
            info!(world_id = %world.id, user_id = %member.user_id, role = %member.role, "member joined");
            let event = WorldEvent::member_joined(&member, clock.unix_seconds())
                .with_request_id(command.request_id());
            Ok(MembershipResult {
                member,
                event: Some(event),
            })
        }
        MemberInsert::AlreadyMember(member) => {
            debug!(world_id = %world.id, user_id = %member.user_id, "already a member");
            Ok(MembershipResult {
                member,
                event: None,
            })
        }
    }
}

/// Self-service join: only public worlds admit users without an invite,
/// and always as plain members.
///
/// # Errors
///
/// Returns `DomainError::Permission` for a private world, plus the errors
/// of [`handle_join_world`].
pub async fn handle_join_public_world(
    world_id: Uuid,
    user_id: Uuid,
    request_id: Option<String>,
    clock: &dyn Clock,
    store: &dyn WorldStore,
) -> Result<MembershipResult, DomainError> {
    let world = load_active_world(store, world_id).await?;
    if world.visibility != Visibility::Public {
        if let Some(member) = store.get_member(world_id, user_id).await? {
            return Ok(MembershipResult {
                member,
                event: None,
            });
        }
        return Err(DomainError::Permission(format!(
            "world {world_id} requires an invite"
        )));
    }
    let command = JoinWorld {
        request_id,
        world_id,
        user_id,
        role: MemberRole::Member,
    };
    handle_join_world(&command, clock, store).await
}

/// Handles the `LeaveWorld` command.
///
/// # Errors
///
/// Returns `DomainError::OwnerImmutable` when the owner tries to leave and
/// `DomainError::MemberInvalid` when the user is not a member.
pub async fn handle_leave_world(
    command: &LeaveWorld,
    clock: &dyn Clock,
    store: &dyn WorldStore,
) -> Result<MembershipResult, DomainError> {
    let world = load_active_world(store, command.world_id).await?;
    let member = store
        .get_member(world.id, command.user_id)
        .await?
        .ok_or_else(|| DomainError::MemberInvalid(format!("user {} is not a member", command.user_id)))?;
    if member.is_owner() {
        return Err(owner_immutable(&member));
    }
    if !store.delete_member(world.id, member.user_id).await? {
        return Err(DomainError::MemberInvalid(format!(
            "user {} is not a member",
            member.user_id
        )));
    }

    info!(world_id = %world.id, user_id = %member.user_id, "member left");
    let event = WorldEvent::member_left(world.id, member.user_id, clock.unix_seconds())
        .with_request_id(command.request_id());
    Ok(MembershipResult {
        member,
        event: Some(event),
    })
}

/// Handles the `RemoveMember` command.
///
/// # Errors
///
/// Returns `DomainError::Permission` unless the actor administers the world,
/// `DomainError::MemberInvalid` when the target has no row, and
/// `DomainError::OwnerImmutable` when the target is the owner.
pub async fn handle_remove_member(
    command: &RemoveMember,
    clock: &dyn Clock,
    capabilities: &dyn CapabilityChecker,
    store: &dyn WorldStore,
) -> Result<MembershipResult, DomainError> {
    let world = load_active_world(store, command.world_id).await?;
    require_admin(capabilities, world.id, command.actor_id).await?;
    let target = store
        .get_member(world.id, command.target_id)
        .await?
        .ok_or_else(|| {
            DomainError::MemberInvalid(format!("user {} is not a member", command.target_id))
        })?;
    if target.is_owner() {
        return Err(owner_immutable(&target));
    }
    if !store.delete_member(world.id, target.user_id).await? {
        return Err(DomainError::MemberInvalid(format!(
            "user {} is not a member",
            target.user_id
        )));
    }

    info!(world_id = %world.id, actor_id = %command.actor_id, user_id = %target.user_id, "member removed");
    let event = WorldEvent::member_removed(world.id, target.user_id, clock.unix_seconds())
        .with_request_id(command.request_id());
    Ok(MembershipResult {
        member: target,
        event: Some(event),
    })
}

/// Handles the `UpdateMemberRole` command. Setting the current role again is
/// a no-op without an event.
///
/// # Errors
///
/// Returns `DomainError::Permission` unless the actor administers the world,
/// `DomainError::MemberInvalid` when the target has no row or the role is
/// unrecognized or `owner`, and `DomainError::OwnerImmutable` when the
/// target is the owner.
pub async fn handle_update_member_role(
    command: &UpdateMemberRole,
    clock: &dyn Clock,
    capabilities: &dyn CapabilityChecker,
    store: &dyn WorldStore,
) -> Result<MembershipResult, DomainError> {
    let world = load_active_world(store, command.world_id).await?;
    require_admin(capabilities, world.id, command.actor_id).await?;
    let target = store
        .get_member(world.id, command.target_id)
        .await?
        .ok_or_else(|| {
            DomainError::MemberInvalid(format!("user {} is not a member", command.target_id))
        })?;
    if target.is_owner() {
        return Err(owner_immutable(&target));
    }
    let role: MemberRole = command
        .role
        .parse()
        .map_err(|_| DomainError::MemberInvalid(format!("unknown role: {}", command.role)))?;
    if role == MemberRole::Owner {
        return Err(DomainError::MemberInvalid(
            "ownership transfer is not supported".into(),
        ));
    }
    if role == target.role {
        debug!(world_id = %world.id, user_id = %target.user_id, %role, "role unchanged");
        return Ok(MembershipResult {
            member: target,
            event: None,
        });
    }

    let member = store
        .update_member_role(world.id, target.user_id, role)
        .await?
        .ok_or_else(|| {
            DomainError::MemberInvalid(format!("user {} is not a member", target.user_id))
        })?;
    info!(world_id = %world.id, actor_id = %command.actor_id, user_id = %member.user_id, role = %member.role, "member role updated");
    let event = WorldEvent::member_role_updated(&member, clock.unix_seconds())
        .with_request_id(command.request_id());
    Ok(MembershipResult {
        member,
        event: Some(event),
    })
}

/// Handles the `AcknowledgeEditNotice` command. Produces no event.
///
/// # Errors
///
/// Returns `DomainError::MemberInvalid` when the user is not a member.
pub async fn handle_acknowledge_edit_notice(
    command: &AcknowledgeEditNotice,
    clock: &dyn Clock,
    store: &dyn WorldStore,
) -> Result<WorldMember, DomainError> {
    let world = load_active_world(store, command.world_id).await?;
    let member = store
        .acknowledge_edit_notice(world.id, command.user_id, clock.now())
        .await?
        .ok_or_else(|| {
            DomainError::MemberInvalid(format!("user {} is not a member", command.user_id))
        })?;
    debug!(world_id = %world.id, user_id = %member.user_id, "edit notice acknowledged");
    Ok(member)
}

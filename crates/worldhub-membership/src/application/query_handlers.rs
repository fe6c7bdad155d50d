//! Query handlers for the membership context.

use std::collections::HashSet;

use uuid::Uuid;
use worldhub_core::error::DomainError;
use worldhub_core::model::{Visibility, World, WorldMember};
use worldhub_core::repository::WorldStore;

use crate::application::load_active_world;

/// Returns `user_id`'s membership row in the world, if any.
///
/// # Errors
///
/// Returns `DomainError::WorldNotFound` for a missing or deleted world.
pub async fn get_membership(
    world_id: Uuid,
    user_id: Uuid,
    store: &dyn WorldStore,
) -> Result<Option<WorldMember>, DomainError> {
    let world = load_active_world(store, world_id).await?;
    store.get_member(world.id, user_id).await
}

/// Lists the world's members in join order. Only members may read the roster.
///
/// # Errors
///
/// Returns `DomainError::Permission` when `viewer_id` is not a member and
/// `DomainError::WorldNotFound` for a missing or deleted world.
pub async fn list_members(
    world_id: Uuid,
    viewer_id: Uuid,
    store: &dyn WorldStore,
) -> Result<Vec<WorldMember>, DomainError> {
    if get_membership(world_id, viewer_id, store).await?.is_none() {
        return Err(DomainError::Permission(format!(
            "user {viewer_id} is not a member of world {world_id}"
        )));
    }
    store.list_members(world_id).await
}

/// Returns the world if `viewer_id` may receive its realtime events: any
/// member, or anyone for a public world.
///
/// # Errors
///
/// Returns `DomainError::WorldNotFound` for a missing or deleted world and
/// `DomainError::Permission` when a non-member asks for a private world.
pub async fn subscribable_world(
    world_id: Uuid,
    viewer_id: Uuid,
    store: &dyn WorldStore,
) -> Result<World, DomainError> {
    let world = load_active_world(store, world_id).await?;
    if world.visibility == Visibility::Public || store.get_member(world.id, viewer_id).await?.is_some() {
        Ok(world)
    } else {
        Err(DomainError::Permission(format!(
            "user {viewer_id} cannot subscribe to world {world_id}"
        )))
    }
}

/// Returns the users in `user_ids` that hold no membership row in the world.
///
/// # Errors
///
/// Propagates store failures.
pub async fn non_members(
    world_id: Uuid,
    user_ids: impl IntoIterator<Item = Uuid>,
    store: &dyn WorldStore,
) -> Result<HashSet<Uuid>, DomainError> {
    let mut outsiders = HashSet::new();
    for user_id in user_ids.into_iter().collect::<HashSet<_>>() {
        if store.get_member(world_id, user_id).await?.is_none() {
            outsiders.insert(user_id);
        }
    }
    Ok(outsiders)
}

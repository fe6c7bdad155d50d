//! Command and query handlers of the membership context.

pub mod capabilities;
pub mod invite_ledger;
pub mod membership_registry;
pub mod query_handlers;
pub mod world_settings;

use uuid::Uuid;
use worldhub_core::capability::CapabilityChecker;
use worldhub_core::error::DomainError;
use worldhub_core::model::World;
use worldhub_core::repository::WorldStore;

/// Loads a world, treating deleted worlds as absent.
pub(crate) async fn load_active_world(
    store: &dyn WorldStore,
    world_id: Uuid,
) -> Result<World, DomainError> {
    store
        .get_world(world_id)
        .await?
        .filter(World::is_active)
        .ok_or(DomainError::WorldNotFound(world_id))
}

/// Fails with `DomainError::Permission` unless `actor_id` administers the
/// world.
pub(crate) async fn require_admin(
    capabilities: &dyn CapabilityChecker,
    world_id: Uuid,
    actor_id: Uuid,
) -> Result<(), DomainError> {
    if capabilities.can_administer(world_id, actor_id).await? {
        Ok(())
    } else {
        Err(DomainError::Permission(format!(
            "user {actor_id} cannot administer world {world_id}"
        )))
    }
}

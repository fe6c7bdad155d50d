//! World settings handler.

use tracing::{debug, info};
use worldhub_core::capability::CapabilityChecker;
use worldhub_core::clock::Clock;
use worldhub_core::command::Command;
use worldhub_core::error::DomainError;
use worldhub_core::event::WorldEvent;
use worldhub_core::model::World;
use worldhub_core::repository::WorldStore;

use crate::application::{load_active_world, require_admin};
use crate::domain::commands::UpdateWorldSettings;

const MAX_NAME_LEN: usize = 100;

/// Result of a settings update.
#[derive(Debug, Clone)]
pub struct WorldSettingsResult {
    /// The world after the update.
    pub world: World,
    /// `world.updated`, or `None` when every field already held.
    pub event: Option<WorldEvent>,
}

/// Handles the `UpdateWorldSettings` command. The owner reference and status
/// are never touched.
///
/// # Errors
///
/// Returns `DomainError::Permission` unless the actor administers the world
/// and `DomainError::Validation` for an empty or overlong name.
pub async fn handle_update_world_settings(
    command: &UpdateWorldSettings,
    clock: &dyn Clock,
    capabilities: &dyn CapabilityChecker,
    store: &dyn WorldStore,
) -> Result<WorldSettingsResult, DomainError> {
    let current = load_active_world(store, command.world_id).await?;
    require_admin(capabilities, current.id, command.actor_id).await?;

    let mut world = current.clone();
    if let Some(name) = &command.name {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::Validation(format!(
                "world name must be 1 to {MAX_NAME_LEN} characters"
            )));
        }
        name.clone_into(&mut world.name);
    }
    if let Some(visibility) = command.visibility {
        world.visibility = visibility;
    }
    if let Some(flag) = command.members_can_edit_keywords {
        world.members_can_edit_keywords = flag;
    }

    if world == current {
        debug!(world_id = %world.id, "world settings unchanged");
        return Ok(WorldSettingsResult { world, event: None });
    }

    store.update_world(&world).await?;
    info!(
        world_id = %world.id,
        actor_id = %command.actor_id,
        visibility = %world.visibility,
        members_can_edit_keywords = world.members_can_edit_keywords,
        "world settings updated"
    );
    let event =
        WorldEvent::world_updated(&world, clock.unix_seconds()).with_request_id(command.request_id());
    Ok(WorldSettingsResult {
        world,
        event: Some(event),
    })
}

//! Test capability checker with a fixed answer set.

use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;
use worldhub_core::capability::{CapabilityChecker, SystemRole};
use worldhub_core::error::DomainError;

/// Grants world-admin capability to a fixed set of `(world, user)` pairs and
/// the system admin role to a fixed set of users.
#[derive(Debug, Default, Clone)]
pub struct StaticCapabilities {
    world_admins: HashSet<(Uuid, Uuid)>,
    system_admins: HashSet<Uuid>,
}

impl StaticCapabilities {
    /// A checker that denies everything.
    #[must_use]
    pub fn deny_all() -> Self {
        Self::default()
    }

    /// Grants world-admin on `world_id` to `user_id`.
    #[must_use]
    pub fn with_world_admin(mut self, world_id: Uuid, user_id: Uuid) -> Self {
        self.world_admins.insert((world_id, user_id));
        self
    }

    /// Grants the system admin role to `user_id`.
    #[must_use]
    pub fn with_system_admin(mut self, user_id: Uuid) -> Self {
        self.system_admins.insert(user_id);
        self
    }
}

#[async_trait]
impl CapabilityChecker for StaticCapabilities {
    async fn is_world_admin(&self, world_id: Uuid, user_id: Uuid) -> Result<bool, DomainError> {
        Ok(self.world_admins.contains(&(world_id, user_id)))
    }

    async fn has_system_role(&self, user_id: Uuid, role: SystemRole) -> Result<bool, DomainError> {
        match role {
            SystemRole::Admin => Ok(self.system_admins.contains(&user_id)),
        }
    }
}

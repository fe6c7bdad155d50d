//! Capability-check collaborator.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DomainError;

/// Installation-wide roles, independent of any world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemRole {
    /// May administer every world.
    Admin,
}

impl fmt::Display for SystemRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str("admin"),
        }
    }
}

impl FromStr for SystemRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            other => Err(DomainError::Validation(format!("unknown system role: {other}"))),
        }
    }
}

/// Answers authorization questions on behalf of the handlers.
#[async_trait]
pub trait CapabilityChecker: Send + Sync {
    /// Is `user_id` an owner or admin of `world_id`?
    async fn is_world_admin(&self, world_id: Uuid, user_id: Uuid) -> Result<bool, DomainError>;

    /// Does `user_id` hold the installation-wide `role`?
    async fn has_system_role(&self, user_id: Uuid, role: SystemRole) -> Result<bool, DomainError>;

    /// World admin or system admin.
    async fn can_administer(&self, world_id: Uuid, user_id: Uuid) -> Result<bool, DomainError> {
        if self.is_world_admin(world_id, user_id).await? {
            return Ok(true);
        }
        self.has_system_role(user_id, SystemRole::Admin).await
    }
}

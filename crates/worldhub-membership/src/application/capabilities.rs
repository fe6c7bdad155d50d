//! Capability checker backed by membership rows.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;
use worldhub_core::capability::{CapabilityChecker, SystemRole};
use worldhub_core::error::DomainError;
use worldhub_core::repository::MemberRepository;

/// Owners and admins of a world administer it; a configured set of users
/// holds the installation-wide admin role.
#[derive(Debug)]
pub struct RoleCapabilities<S: MemberRepository + ?Sized> {
    members: Arc<S>,
    system_admins: HashSet<Uuid>,
}

impl<S: MemberRepository + ?Sized> RoleCapabilities<S> {
    /// Creates a checker reading roles from `members`.
    #[must_use]
    pub fn new(members: Arc<S>, system_admins: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            members,
            system_admins: system_admins.into_iter().collect(),
        }
    }
}

#[async_trait]
impl<S: MemberRepository + ?Sized> CapabilityChecker for RoleCapabilities<S> {
    async fn is_world_admin(&self, world_id: Uuid, user_id: Uuid) -> Result<bool, DomainError> {
        Ok(self
            .members
            .get_member(world_id, user_id)
            .await?
            .is_some_and(|member| member.role.is_admin()))
    }

    async fn has_system_role(&self, user_id: Uuid, role: SystemRole) -> Result<bool, DomainError> {
        match role {
            SystemRole::Admin => Ok(self.system_admins.contains(&user_id)),
        }
    }
}

//! Commands for the membership context.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use worldhub_core::command::Command;
use worldhub_core::model::{MemberRole, Visibility};

macro_rules! impl_command {
    ($command:ty, $name:literal) => {
        impl Command for $command {
            fn command_type(&self) -> &'static str {
                $name
            }

            fn request_id(&self) -> Option<&str> {
                self.request_id.as_deref()
            }
        }
    };
}

/// Command to consume an invite by slug.
#[derive(Debug, Clone)]
pub struct ConsumeInvite {
    /// Caller-supplied request id.
    pub request_id: Option<String>,
    /// The invite's lookup token.
    pub slug: String,
    /// The consuming user.
    pub user_id: Uuid,
}

impl_command!(ConsumeInvite, "membership.consume_invite");

/// Command to mint a new invite.
#[derive(Debug, Clone)]
pub struct CreateInvite {
    /// Caller-supplied request id.
    pub request_id: Option<String>,
    /// The world the invite admits into.
    pub world_id: Uuid,
    /// The administrator creating it.
    pub actor_id: Uuid,
    /// Use cap; `0` for unlimited.
    pub max_use: i32,
    /// Optional expiry, must lie in the future.
    pub expires_at: Option<DateTime<Utc>>,
    /// Role granted to consumers; never `Owner`.
    pub role: MemberRole,
}

impl_command!(CreateInvite, "membership.create_invite");

/// Command to revoke an invite.
#[derive(Debug, Clone)]
pub struct RevokeInvite {
    /// Caller-supplied request id.
    pub request_id: Option<String>,
    /// The invite to revoke.
    pub invite_id: Uuid,
    /// The administrator revoking it.
    pub actor_id: Uuid,
}

impl_command!(RevokeInvite, "membership.revoke_invite");

/// Command to add a user to a world with a given role.
#[derive(Debug, Clone)]
pub struct JoinWorld {
    /// Caller-supplied request id.
    pub request_id: Option<String>,
    /// The world to join.
    pub world_id: Uuid,
    /// The joining user.
    pub user_id: Uuid,
    /// The role to grant; never `Owner`.
    pub role: MemberRole,
}

impl_command!(JoinWorld, "membership.join_world");

/// Command for a user to leave a world.
#[derive(Debug, Clone)]
pub struct LeaveWorld {
    /// Caller-supplied request id.
    pub request_id: Option<String>,
    /// The world to leave.
    pub world_id: Uuid,
    /// The leaving user.
    pub user_id: Uuid,
}

impl_command!(LeaveWorld, "membership.leave_world");

/// Command for an administrator to remove a member.
#[derive(Debug, Clone)]
pub struct RemoveMember {
    /// Caller-supplied request id.
    pub request_id: Option<String>,
    /// The world.
    pub world_id: Uuid,
    /// The administrator acting.
    pub actor_id: Uuid,
    /// The member to remove.
    pub target_id: Uuid,
}

impl_command!(RemoveMember, "membership.remove_member");

/// Command for an administrator to change a member's role.
#[derive(Debug, Clone)]
pub struct UpdateMemberRole {
    /// Caller-supplied request id.
    pub request_id: Option<String>,
    /// The world.
    pub world_id: Uuid,
    /// The administrator acting.
    pub actor_id: Uuid,
    /// The member whose role changes.
    pub target_id: Uuid,
    /// The requested role name, validated by the handler.
    pub role: String,
}

impl_command!(UpdateMemberRole, "membership.update_member_role");

/// Command to record that a member has seen the keyword editing notice.
#[derive(Debug, Clone)]
pub struct AcknowledgeEditNotice {
    /// Caller-supplied request id.
    pub request_id: Option<String>,
    /// The world.
    pub world_id: Uuid,
    /// The acknowledging member.
    pub user_id: Uuid,
}

impl_command!(AcknowledgeEditNotice, "membership.acknowledge_edit_notice");

/// Command to change a world's metadata.
#[derive(Debug, Clone)]
pub struct UpdateWorldSettings {
    /// Caller-supplied request id.
    pub request_id: Option<String>,
    /// The world.
    pub world_id: Uuid,
    /// The administrator acting.
    pub actor_id: Uuid,
    /// New display name.
    pub name: Option<String>,
    /// New visibility.
    pub visibility: Option<Visibility>,
    /// New keyword editing policy.
    pub members_can_edit_keywords: Option<bool>,
}

impl_command!(UpdateWorldSettings, "membership.update_world_settings");

//! Durable entities owned by the store.
//!
//! Status, role, and visibility values are closed enums. Stores persist them
//! as their `as_str` form and parse them back with `FromStr`, so an unknown
//! value is rejected at the store boundary instead of leaking into domain
//! logic.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! closed_enum {
    ($name:ident, $label:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Returns the canonical lowercase name.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(DomainError::Validation(format!(
                        concat!("unknown ", $label, ": {}"),
                        other
                    ))),
                }
            }
        }
    };
}

/// Who can discover and enter a world without an invite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Anyone may subscribe to the world's events.
    Public,
    /// Only members may subscribe.
    Private,
}

closed_enum!(Visibility, "visibility" {
    Public => "public",
    Private => "private",
});

/// Lifecycle status of a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorldStatus {
    /// The world is live.
    Active,
    /// The world was soft-deleted; it behaves as absent.
    Deleted,
}

closed_enum!(WorldStatus, "world status" {
    Active => "active",
    Deleted => "deleted",
});

/// A tenant-scoped workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct World {
    /// World identifier.
    pub id: Uuid,
    /// The creating user. Never changes in this core.
    pub owner_id: Uuid,
    /// Display name.
    pub name: String,
    /// Discoverability.
    pub visibility: Visibility,
    /// Lifecycle status.
    pub status: WorldStatus,
    /// Editing policy: whether plain members may mutate the keyword list.
    pub members_can_edit_keywords: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl World {
    /// Returns `true` unless the world has been deleted.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == WorldStatus::Active
    }
}

/// Role of a member within a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// The single creator row. Immutable.
    Owner,
    /// May manage members, invites, and settings.
    Admin,
    /// Regular participant.
    Member,
}

closed_enum!(MemberRole, "member role" {
    Owner => "owner",
    Admin => "admin",
    Member => "member",
});

impl MemberRole {
    /// Returns `true` for roles that administer the world.
    #[must_use]
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }
}

/// A user's membership row, keyed by `(world_id, user_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldMember {
    /// Owning world.
    pub world_id: Uuid,
    /// Member user.
    pub user_id: Uuid,
    /// Role within the world.
    pub role: MemberRole,
    /// When the row was created.
    pub joined_at: DateTime<Utc>,
    /// When the member acknowledged the keyword editing notice.
    pub edit_notice_acked_at: Option<DateTime<Utc>>,
}

impl WorldMember {
    /// Builds a fresh membership row.
    #[must_use]
    pub fn new(world_id: Uuid, user_id: Uuid, role: MemberRole, joined_at: DateTime<Utc>) -> Self {
        Self {
            world_id,
            user_id,
            role,
            joined_at,
            edit_notice_acked_at: None,
        }
    }

    /// Returns `true` if this is the world's owner row.
    #[must_use]
    pub fn is_owner(&self) -> bool {
        self.role == MemberRole::Owner
    }
}

/// Lifecycle status of an invite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    /// Consumable.
    Active,
    /// Withdrawn by an administrator.
    Revoked,
    /// Past its expiry.
    Expired,
    /// `used_count` reached `max_use`.
    Exhausted,
}

closed_enum!(InviteStatus, "invite status" {
    Active => "active",
    Revoked => "revoked",
    Expired => "expired",
    Exhausted => "exhausted",
});

/// A slug-addressable, count- and time-limited membership token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldInvite {
    /// Invite identifier.
    pub id: Uuid,
    /// World the invite grants access to.
    pub world_id: Uuid,
    /// Unique opaque lookup token.
    pub slug: String,
    /// Lifecycle status.
    pub status: InviteStatus,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Maximum number of uses; `0` means unlimited.
    pub max_use: i32,
    /// Number of successful consumptions.
    pub used_count: i32,
    /// Role granted to consumers.
    pub role: MemberRole,
    /// The administrator who created the invite.
    pub created_by: Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl WorldInvite {
    /// Returns `true` when the invite has no use cap.
    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        self.max_use == 0
    }

    /// Returns `true` when the expiry is set and not after `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Returns `true` while another use fits under the cap.
    #[must_use]
    pub fn has_remaining_uses(&self) -> bool {
        self.is_unlimited() || self.used_count < self.max_use
    }
}

/// One entry of a world's keyword list. Serialized as the wire-level
/// `KeywordRecord`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldKeyword {
    /// Keyword identifier.
    pub id: Uuid,
    /// Owning world.
    pub world_id: Uuid,
    /// Ordering key, ascending.
    pub position: i32,
    /// Free-form grouping label.
    pub category: String,
    /// The keyword text.
    pub content: String,
    /// Whether the keyword is active.
    pub enabled: bool,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The world does not exist or has been deleted.
    #[error("world not found: {0}")]
    WorldNotFound(Uuid),

    /// No invite has this id.
    #[error("invite not found: {0}")]
    InviteNotFound(Uuid),

    /// The keyword does not exist in the given world.
    #[error("keyword not found: {0}")]
    KeywordNotFound(Uuid),

    /// The invite cannot be consumed: unknown slug, revoked, expired, or
    /// exhausted.
    #[error("invite invalid: {0}")]
    InviteInvalid(String),

    /// The membership target is missing or the requested role is not usable.
    #[error("member invalid: {0}")]
    MemberInvalid(String),

    /// The actor lacks the capability the operation requires.
    #[error("permission denied: {0}")]
    Permission(String),

    /// The operation would delete, demote, or detach the world owner.
    #[error("owner {user_id} of world {world_id} cannot be changed")]
    OwnerImmutable {
        /// The world whose owner was targeted.
        world_id: Uuid,
        /// The owner's user identifier.
        user_id: Uuid,
    },

    /// Malformed input.
    #[error("validation error: {0}")]
    Validation(String),

    /// A no-op caused by state that already holds.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A persistence or transport failure.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

/// Stable failure categories that callers branch on instead of message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// World, invite, member, or keyword absent.
    NotFound,
    /// Actor lacks the required capability.
    Permission,
    /// Malformed input, invalid role, or an unusable invite.
    Invalid,
    /// Attempt to demote, remove, or detach the owner.
    OwnerImmutable,
    /// Idempotent no-op.
    Conflict,
    /// Store or transport failure.
    Infrastructure,
}

impl DomainError {
    /// Returns the stable category of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::WorldNotFound(_) | Self::InviteNotFound(_) | Self::KeywordNotFound(_) => {
                ErrorCategory::NotFound
            }
            Self::Permission(_) => ErrorCategory::Permission,
            Self::InviteInvalid(_) | Self::MemberInvalid(_) | Self::Validation(_) => {
                ErrorCategory::Invalid
            }
            Self::OwnerImmutable { .. } => ErrorCategory::OwnerImmutable,
            Self::Conflict(_) => ErrorCategory::Conflict,
            Self::Infrastructure(_) => ErrorCategory::Infrastructure,
        }
    }
}

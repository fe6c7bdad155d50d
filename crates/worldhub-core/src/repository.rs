//! Store abstraction.
//!
//! The persistence engine is an external collaborator. Each record family
//! gets its own repository trait; [`WorldStore`] bundles them for handlers
//! that touch several families. Implementations must make every method that
//! documents atomicity a single indivisible unit (one conditional statement
//! or one transaction).

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DomainError;
use crate::model::{InviteStatus, MemberRole, World, WorldInvite, WorldKeyword, WorldMember};

/// Repository for world records.
#[async_trait]
pub trait WorldRepository: Send + Sync {
    /// Load a world by id, including deleted ones.
    async fn get_world(&self, world_id: Uuid) -> Result<Option<World>, DomainError>;

    /// Persist the mutable fields of a world (visibility, editing policy).
    /// The owner reference is never written.
    async fn update_world(&self, world: &World) -> Result<(), DomainError>;
}

/// Outcome of inserting a membership row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberInsert {
    /// A new row was created.
    Inserted(WorldMember),
    /// A row for `(world_id, user_id)` already existed and is returned
    /// unchanged. A concurrent duplicate insert lands here too.
    AlreadyMember(WorldMember),
}

/// Repository for membership rows.
#[async_trait]
pub trait MemberRepository: Send + Sync {
    /// Load the membership row for `(world_id, user_id)`.
    async fn get_member(
        &self,
        world_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<WorldMember>, DomainError>;

    /// List a world's members ordered by join time.
    async fn list_members(&self, world_id: Uuid) -> Result<Vec<WorldMember>, DomainError>;

    /// Insert `member` unless a row for the same key exists.
    async fn upsert_member(&self, member: &WorldMember) -> Result<MemberInsert, DomainError>;

    /// Change the role of a non-owner row. Returns the updated row, or `None`
    /// when no non-owner row matched.
    async fn update_member_role(
        &self,
        world_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<Option<WorldMember>, DomainError>;

    /// Stamp the edit-notice acknowledgement. Returns `None` when no row matched.
    async fn acknowledge_edit_notice(
        &self,
        world_id: Uuid,
        user_id: Uuid,
        acked_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<Option<WorldMember>, DomainError>;

    /// Delete a non-owner row. Returns `false` when no non-owner row matched.
    async fn delete_member(&self, world_id: Uuid, user_id: Uuid) -> Result<bool, DomainError>;
}

/// Counter state after a successful conditional increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InviteUse {
    /// `used_count` after the increment.
    pub used_count: i32,
    /// Status after the increment; `Exhausted` when the cap was just reached.
    pub status: InviteStatus,
}

/// Outcome of redeeming an invite for a new member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redemption {
    /// The member row was inserted and the use counted.
    Joined {
        /// The inserted row.
        member: WorldMember,
        /// Counter state after the increment.
        invite_use: InviteUse,
    },
    /// The user already had a row; nothing was written.
    AlreadyMember(WorldMember),
    /// The invite was no longer active or had no remaining uses; nothing was
    /// written.
    Unavailable,
}

/// Repository for invites.
#[async_trait]
pub trait InviteRepository: Send + Sync {
    /// Load an invite by id.
    async fn get_invite(&self, invite_id: Uuid) -> Result<Option<WorldInvite>, DomainError>;

    /// Load an invite by its slug.
    async fn get_invite_by_slug(&self, slug: &str) -> Result<Option<WorldInvite>, DomainError>;

    /// Insert a new invite. Fails with `DomainError::Conflict` on a slug
    /// collision.
    async fn insert_invite(&self, invite: &WorldInvite) -> Result<(), DomainError>;

    /// Move an invite from `expected` to `status`. Returns `false` when the
    /// invite was not in `expected`.
    async fn update_invite_status(
        &self,
        invite_id: Uuid,
        expected: InviteStatus,
        status: InviteStatus,
    ) -> Result<bool, DomainError>;

    /// Atomically increment `used_count` if the invite is active and below
    /// its cap, flipping it to `Exhausted` when the cap is reached. Returns
    /// `None` when the guard failed.
    async fn conditional_increment_invite_use(
        &self,
        invite_id: Uuid,
    ) -> Result<Option<InviteUse>, DomainError>;

    /// Atomically insert `member` and count one use of the invite. If the
    /// member already exists or the guard of
    /// [`conditional_increment_invite_use`](Self::conditional_increment_invite_use)
    /// fails, nothing is written.
    async fn redeem_invite(
        &self,
        invite_id: Uuid,
        member: &WorldMember,
    ) -> Result<Redemption, DomainError>;
}

/// One write inside a keyword commit. Writes are scoped to the commit's
/// world: a write naming a keyword of another world affects nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordWrite {
    /// Insert a new keyword; a colliding id affects nothing.
    Insert(WorldKeyword),
    /// Overwrite category, content, enabled, position, and `updated_at`.
    Update(WorldKeyword),
    /// Delete by id.
    Delete(Uuid),
    /// Move a keyword to `position`.
    SetPosition {
        /// Keyword to move.
        keyword_id: Uuid,
        /// New ordering key.
        position: i32,
    },
    /// Delete every keyword of the world.
    Clear,
}

/// Result of a keyword commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordCommit {
    /// The world's keyword revision after the commit. Unchanged when no
    /// write affected any row.
    pub revision: i64,
    /// Rows affected by each write, index-aligned with the submitted writes.
    pub affected: Vec<u64>,
}

impl KeywordCommit {
    /// Total rows affected by the commit.
    #[must_use]
    pub fn total_affected(&self) -> u64 {
        self.affected.iter().sum()
    }
}

/// Repository for keyword records and the per-world revision counter.
#[async_trait]
pub trait KeywordRepository: Send + Sync {
    /// List a world's keywords ordered by position, then id.
    async fn list_keywords(&self, world_id: Uuid) -> Result<Vec<WorldKeyword>, DomainError>;

    /// Load one keyword of a world.
    async fn get_keyword(
        &self,
        world_id: Uuid,
        keyword_id: Uuid,
    ) -> Result<Option<WorldKeyword>, DomainError>;

    /// Current revision of the world's keyword set; `0` before any mutation.
    async fn keyword_revision(&self, world_id: Uuid) -> Result<i64, DomainError>;

    /// Apply `writes` and advance the revision by exactly one in a single
    /// transaction, provided at least one row was affected.
    async fn commit_keyword_writes(
        &self,
        world_id: Uuid,
        writes: &[KeywordWrite],
    ) -> Result<KeywordCommit, DomainError>;
}

/// The full store seam consumed by the command handlers.
pub trait WorldStore:
    WorldRepository + MemberRepository + InviteRepository + KeywordRepository
{
}

impl<T> WorldStore for T where
    T: WorldRepository + MemberRepository + InviteRepository + KeywordRepository
{
}

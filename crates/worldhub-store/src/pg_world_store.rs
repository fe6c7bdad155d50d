//! `PostgreSQL` implementation of the repository traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgExecutor, PgPool};
use tracing::debug;
use uuid::Uuid;
use worldhub_core::error::DomainError;
use worldhub_core::model::{InviteStatus, MemberRole, World, WorldInvite, WorldKeyword, WorldMember};
use worldhub_core::repository::{
    InviteRepository, InviteUse, KeywordCommit, KeywordRepository, KeywordWrite, MemberInsert,
    MemberRepository, Redemption, WorldRepository,
};

use crate::schema::{
    INVITE_COLUMNS, KEYWORD_COLUMNS, MEMBER_COLUMNS, UNIQUE_VIOLATION, WORLD_COLUMNS,
};

/// Attempts at resolving an insert that lost a race against a concurrent
/// delete of the same membership row.
const UPSERT_ATTEMPTS: usize = 3;

fn infra(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(err.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}

#[derive(Debug, FromRow)]
struct WorldRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    visibility: String,
    status: String,
    members_can_edit_keywords: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<WorldRow> for World {
    type Error = DomainError;

    fn try_from(row: WorldRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            visibility: row.visibility.parse()?,
            status: row.status.parse()?,
            members_can_edit_keywords: row.members_can_edit_keywords,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MemberRow {
    world_id: Uuid,
    user_id: Uuid,
    role: String,
    joined_at: DateTime<Utc>,
    edit_notice_acked_at: Option<DateTime<Utc>>,
}

impl TryFrom<MemberRow> for WorldMember {
    type Error = DomainError;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        Ok(Self {
            world_id: row.world_id,
            user_id: row.user_id,
            role: row.role.parse()?,
            joined_at: row.joined_at,
            edit_notice_acked_at: row.edit_notice_acked_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct InviteRow {
    id: Uuid,
    world_id: Uuid,
    slug: String,
    status: String,
    expires_at: Option<DateTime<Utc>>,
    max_use: i32,
    used_count: i32,
    role: String,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl TryFrom<InviteRow> for WorldInvite {
    type Error = DomainError;

    fn try_from(row: InviteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            world_id: row.world_id,
            slug: row.slug,
            status: row.status.parse()?,
            expires_at: row.expires_at,
            max_use: row.max_use,
            used_count: row.used_count,
            role: row.role.parse()?,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct KeywordRow {
    id: Uuid,
    world_id: Uuid,
    position: i32,
    category: String,
    content: String,
    enabled: bool,
    updated_at: DateTime<Utc>,
}

impl From<KeywordRow> for WorldKeyword {
    fn from(row: KeywordRow) -> Self {
        Self {
            id: row.id,
            world_id: row.world_id,
            position: row.position,
            category: row.category,
            content: row.content,
            enabled: row.enabled,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct InviteUseRow {
    used_count: i32,
    status: String,
}

impl TryFrom<InviteUseRow> for InviteUse {
    type Error = DomainError;

    fn try_from(row: InviteUseRow) -> Result<Self, Self::Error> {
        Ok(Self {
            used_count: row.used_count,
            status: row.status.parse()?,
        })
    }
}

/// PostgreSQL-backed world store.
#[derive(Debug, Clone)]
pub struct PgWorldStore {
    pool: PgPool,
}

impl PgWorldStore {
    /// Creates a new `PgWorldStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a world together with its owner row. World creation belongs to
    /// the provisioning tooling; this is its entry point.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Conflict` if the id is taken and
    /// `DomainError::Infrastructure` on database failure.
    pub async fn create_world(&self, world: &World) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(infra)?;
        sqlx::query(
            "INSERT INTO worlds (id, owner_id, name, visibility, status, members_can_edit_keywords, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(world.id)
        .bind(world.owner_id)
        .bind(&world.name)
        .bind(world.visibility.as_str())
        .bind(world.status.as_str())
        .bind(world.members_can_edit_keywords)
        .bind(world.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                DomainError::Conflict(format!("world {} already exists", world.id))
            } else {
                infra(err)
            }
        })?;
        sqlx::query(
            "INSERT INTO world_members (world_id, user_id, role, joined_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(world.id)
        .bind(world.owner_id)
        .bind(MemberRole::Owner.as_str())
        .bind(world.created_at)
        .execute(&mut *tx)
        .await
        .map_err(infra)?;
        tx.commit().await.map_err(infra)
    }
}

async fn fetch_member<'e, E: PgExecutor<'e>>(
    executor: E,
    world_id: Uuid,
    user_id: Uuid,
) -> Result<Option<WorldMember>, DomainError> {
    let sql = format!("SELECT {MEMBER_COLUMNS} FROM world_members WHERE world_id = $1 AND user_id = $2");
    sqlx::query_as::<_, MemberRow>(&sql)
        .bind(world_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(infra)?
        .map(WorldMember::try_from)
        .transpose()
}

async fn insert_member_if_absent<'e, E: PgExecutor<'e>>(
    executor: E,
    member: &WorldMember,
) -> Result<Option<WorldMember>, DomainError> {
    let sql = format!(
        "INSERT INTO world_members (world_id, user_id, role, joined_at, edit_notice_acked_at) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (world_id, user_id) DO NOTHING \
         RETURNING {MEMBER_COLUMNS}"
    );
    sqlx::query_as::<_, MemberRow>(&sql)
        .bind(member.world_id)
        .bind(member.user_id)
        .bind(member.role.as_str())
        .bind(member.joined_at)
        .bind(member.edit_notice_acked_at)
        .fetch_optional(executor)
        .await
        .map_err(infra)?
        .map(WorldMember::try_from)
        .transpose()
}

/// Counts one use if the invite is active and below its cap. The guard sits
/// in the `WHERE` clause, so concurrent callers serialize on the row lock
/// and re-check it against the committed count.
async fn increment_use<'e, E: PgExecutor<'e>>(
    executor: E,
    invite_id: Uuid,
) -> Result<Option<InviteUse>, DomainError> {
    sqlx::query_as::<_, InviteUseRow>(
        "UPDATE world_invites \
         SET used_count = used_count + 1, \
             status = CASE WHEN max_use > 0 AND used_count + 1 >= max_use \
                           THEN 'exhausted' ELSE status END \
         WHERE id = $1 AND status = 'active' AND (max_use = 0 OR used_count < max_use) \
         RETURNING used_count, status",
    )
    .bind(invite_id)
    .fetch_optional(executor)
    .await
    .map_err(infra)?
    .map(InviteUse::try_from)
    .transpose()
}

#[async_trait]
impl WorldRepository for PgWorldStore {
    async fn get_world(&self, world_id: Uuid) -> Result<Option<World>, DomainError> {
        let sql = format!("SELECT {WORLD_COLUMNS} FROM worlds WHERE id = $1");
        sqlx::query_as::<_, WorldRow>(&sql)
            .bind(world_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .map(World::try_from)
            .transpose()
    }

    async fn update_world(&self, world: &World) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE worlds SET name = $2, visibility = $3, status = $4, members_can_edit_keywords = $5 \
             WHERE id = $1",
        )
        .bind(world.id)
        .bind(&world.name)
        .bind(world.visibility.as_str())
        .bind(world.status.as_str())
        .bind(world.members_can_edit_keywords)
        .execute(&self.pool)
        .await
        .map_err(infra)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::WorldNotFound(world.id));
        }
        Ok(())
    }
}

#[async_trait]
impl MemberRepository for PgWorldStore {
    async fn get_member(
        &self,
        world_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<WorldMember>, DomainError> {
        fetch_member(&self.pool, world_id, user_id).await
    }

    async fn list_members(&self, world_id: Uuid) -> Result<Vec<WorldMember>, DomainError> {
        let sql = format!(
            "SELECT {MEMBER_COLUMNS} FROM world_members WHERE world_id = $1 ORDER BY joined_at, user_id"
        );
        sqlx::query_as::<_, MemberRow>(&sql)
            .bind(world_id)
            .fetch_all(&self.pool)
            .await
            .map_err(infra)?
            .into_iter()
            .map(WorldMember::try_from)
            .collect()
    }

    async fn upsert_member(&self, member: &WorldMember) -> Result<MemberInsert, DomainError> {
        for _ in 0..UPSERT_ATTEMPTS {
            if let Some(inserted) = insert_member_if_absent(&self.pool, member).await? {
                return Ok(MemberInsert::Inserted(inserted));
            }
            if let Some(existing) = fetch_member(&self.pool, member.world_id, member.user_id).await? {
                return Ok(MemberInsert::AlreadyMember(existing));
            }
            debug!(world_id = %member.world_id, user_id = %member.user_id, "membership row vanished between insert and read, retrying");
        }
        Err(DomainError::Conflict(format!(
            "membership of user {} in world {} is changing concurrently",
            member.user_id, member.world_id
        )))
    }

    async fn update_member_role(
        &self,
        world_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<Option<WorldMember>, DomainError> {
        let sql = format!(
            "UPDATE world_members SET role = $3 \
             WHERE world_id = $1 AND user_id = $2 AND role <> 'owner' \
             RETURNING {MEMBER_COLUMNS}"
        );
        sqlx::query_as::<_, MemberRow>(&sql)
            .bind(world_id)
            .bind(user_id)
            .bind(role.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .map(WorldMember::try_from)
            .transpose()
    }

    async fn acknowledge_edit_notice(
        &self,
        world_id: Uuid,
        user_id: Uuid,
        acked_at: DateTime<Utc>,
    ) -> Result<Option<WorldMember>, DomainError> {
        let sql = format!(
            "UPDATE world_members SET edit_notice_acked_at = $3 \
             WHERE world_id = $1 AND user_id = $2 \
             RETURNING {MEMBER_COLUMNS}"
        );
        sqlx::query_as::<_, MemberRow>(&sql)
            .bind(world_id)
            .bind(user_id)
            .bind(acked_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .map(WorldMember::try_from)
            .transpose()
    }

    async fn delete_member(&self, world_id: Uuid, user_id: Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query(
            "DELETE FROM world_members WHERE world_id = $1 AND user_id = $2 AND role <> 'owner'",
        )
        .bind(world_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(infra)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl InviteRepository for PgWorldStore {
    async fn get_invite(&self, invite_id: Uuid) -> Result<Option<WorldInvite>, DomainError> {
        let sql = format!("SELECT {INVITE_COLUMNS} FROM world_invites WHERE id = $1");
        sqlx::query_as::<_, InviteRow>(&sql)
            .bind(invite_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .map(WorldInvite::try_from)
            .transpose()
    }

    async fn get_invite_by_slug(&self, slug: &str) -> Result<Option<WorldInvite>, DomainError> {
        let sql = format!("SELECT {INVITE_COLUMNS} FROM world_invites WHERE slug = $1");
        sqlx::query_as::<_, InviteRow>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .map(WorldInvite::try_from)
            .transpose()
    }

    async fn insert_invite(&self, invite: &WorldInvite) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO world_invites \
             (id, world_id, slug, status, expires_at, max_use, used_count, role, created_by, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(invite.id)
        .bind(invite.world_id)
        .bind(&invite.slug)
        .bind(invite.status.as_str())
        .bind(invite.expires_at)
        .bind(invite.max_use)
        .bind(invite.used_count)
        .bind(invite.role.as_str())
        .bind(invite.created_by)
        .bind(invite.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                DomainError::Conflict(format!("invite slug {} already exists", invite.slug))
            } else {
                infra(err)
            }
        })?;
        Ok(())
    }

    async fn update_invite_status(
        &self,
        invite_id: Uuid,
        expected: InviteStatus,
        status: InviteStatus,
    ) -> Result<bool, DomainError> {
        let result =
            sqlx::query("UPDATE world_invites SET status = $3 WHERE id = $1 AND status = $2")
                .bind(invite_id)
                .bind(expected.as_str())
                .bind(status.as_str())
                .execute(&self.pool)
                .await
                .map_err(infra)?;
        Ok(result.rows_affected() > 0)
    }

    async fn conditional_increment_invite_use(
        &self,
        invite_id: Uuid,
    ) -> Result<Option<InviteUse>, DomainError> {
        increment_use(&self.pool, invite_id).await
    }

    async fn redeem_invite(
        &self,
        invite_id: Uuid,
        member: &WorldMember,
    ) -> Result<Redemption, DomainError> {
        let mut tx = self.pool.begin().await.map_err(infra)?;

        let Some(inserted) = insert_member_if_absent(&mut *tx, member).await? else {
            let existing = fetch_member(&mut *tx, member.world_id, member.user_id).await?;
            tx.rollback().await.map_err(infra)?;
            return Ok(existing.map_or(Redemption::Unavailable, Redemption::AlreadyMember));
        };

        let Some(invite_use) = increment_use(&mut *tx, invite_id).await? else {
            tx.rollback().await.map_err(infra)?;
            return Ok(Redemption::Unavailable);
        };

        tx.commit().await.map_err(infra)?;
        Ok(Redemption::Joined {
            member: inserted,
            invite_use,
        })
    }
}

#[async_trait]
impl KeywordRepository for PgWorldStore {
    async fn list_keywords(&self, world_id: Uuid) -> Result<Vec<WorldKeyword>, DomainError> {
        let sql = format!(
            "SELECT {KEYWORD_COLUMNS} FROM world_keywords WHERE world_id = $1 ORDER BY position, id"
        );
        let rows = sqlx::query_as::<_, KeywordRow>(&sql)
            .bind(world_id)
            .fetch_all(&self.pool)
            .await
            .map_err(infra)?;
        Ok(rows.into_iter().map(WorldKeyword::from).collect())
    }

    async fn get_keyword(
        &self,
        world_id: Uuid,
        keyword_id: Uuid,
    ) -> Result<Option<WorldKeyword>, DomainError> {
        let sql = format!("SELECT {KEYWORD_COLUMNS} FROM world_keywords WHERE id = $1 AND world_id = $2");
        let row = sqlx::query_as::<_, KeywordRow>(&sql)
            .bind(keyword_id)
            .bind(world_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?;
        Ok(row.map(WorldKeyword::from))
    }

    async fn keyword_revision(&self, world_id: Uuid) -> Result<i64, DomainError> {
        let revision: Option<i64> =
            sqlx::query_scalar("SELECT revision FROM world_keyword_revisions WHERE world_id = $1")
                .bind(world_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(infra)?;
        Ok(revision.unwrap_or_default())
    }

    async fn commit_keyword_writes(
        &self,
        world_id: Uuid,
        writes: &[KeywordWrite],
    ) -> Result<KeywordCommit, DomainError> {
        let mut tx = self.pool.begin().await.map_err(infra)?;

        // Locking the revision row first serializes commits of one world.
        sqlx::query(
            "INSERT INTO world_keyword_revisions (world_id, revision) VALUES ($1, 0) \
             ON CONFLICT (world_id) DO NOTHING",
        )
        .bind(world_id)
        .execute(&mut *tx)
        .await
        .map_err(infra)?;
        let mut revision: i64 = sqlx::query_scalar(
            "SELECT revision FROM world_keyword_revisions WHERE world_id = $1 FOR UPDATE",
        )
        .bind(world_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(infra)?;

        let mut affected = Vec::with_capacity(writes.len());
        for write in writes {
            let rows = match write {
                KeywordWrite::Insert(keyword) if keyword.world_id != world_id => 0,
                KeywordWrite::Insert(keyword) => sqlx::query(
                    "INSERT INTO world_keywords \
                     (id, world_id, position, category, content, enabled, updated_at) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7) ON CONFLICT (id) DO NOTHING",
                )
                .bind(keyword.id)
                .bind(world_id)
                .bind(keyword.position)
                .bind(&keyword.category)
                .bind(&keyword.content)
                .bind(keyword.enabled)
                .bind(keyword.updated_at)
                .execute(&mut *tx)
                .await
                .map_err(infra)?
                .rows_affected(),
                KeywordWrite::Update(keyword) => sqlx::query(
                    "UPDATE world_keywords \
                     SET position = $3, category = $4, content = $5, enabled = $6, updated_at = $7 \
                     WHERE id = $1 AND world_id = $2",
                )
                .bind(keyword.id)
                .bind(world_id)
                .bind(keyword.position)
                .bind(&keyword.category)
                .bind(&keyword.content)
                .bind(keyword.enabled)
                .bind(keyword.updated_at)
                .execute(&mut *tx)
                .await
                .map_err(infra)?
                .rows_affected(),
                KeywordWrite::Delete(keyword_id) => {
                    sqlx::query("DELETE FROM world_keywords WHERE id = $1 AND world_id = $2")
                        .bind(keyword_id)
                        .bind(world_id)
                        .execute(&mut *tx)
                        .await
                        .map_err(infra)?
                        .rows_affected()
                }
                KeywordWrite::SetPosition {
                    keyword_id,
                    position,
                } => sqlx::query(
                    "UPDATE world_keywords SET position = $3 WHERE id = $1 AND world_id = $2",
                )
                .bind(keyword_id)
                .bind(world_id)
                .bind(position)
                .execute(&mut *tx)
                .await
                .map_err(infra)?
                .rows_affected(),
                KeywordWrite::Clear => sqlx::query("DELETE FROM world_keywords WHERE world_id = $1")
                    .bind(world_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(infra)?
                    .rows_affected(),
            };
            affected.push(rows);
        }

        if affected.iter().any(|rows| *rows > 0) {
            revision = sqlx::query_scalar(
                "UPDATE world_keyword_revisions SET revision = revision + 1 \
                 WHERE world_id = $1 RETURNING revision",
            )
            .bind(world_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(infra)?;
            tx.commit().await.map_err(infra)?;
        } else {
            tx.rollback().await.map_err(infra)?;
        }

        Ok(KeywordCommit { revision, affected })
    }
}

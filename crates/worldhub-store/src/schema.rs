//! Store database schema.
//!
//! Table DDL lives in the workspace `migrations/` directory; this module
//! embeds it and names the column lists the queries select.

use sqlx::migrate::Migrator;

/// Embedded migrations for the world, member, invite, and keyword tables.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Columns selected for a `World`.
pub const WORLD_COLUMNS: &str =
    "id, owner_id, name, visibility, status, members_can_edit_keywords, created_at";

/// Columns selected for a `WorldMember`.
pub const MEMBER_COLUMNS: &str = "world_id, user_id, role, joined_at, edit_notice_acked_at";

/// Columns selected for a `WorldInvite`.
pub const INVITE_COLUMNS: &str =
    "id, world_id, slug, status, expires_at, max_use, used_count, role, created_by, created_at";

/// Columns selected for a `WorldKeyword`.
pub const KEYWORD_COLUMNS: &str = "id, world_id, position, category, content, enabled, updated_at";

/// SQLSTATE raised by PostgreSQL for a unique-constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";

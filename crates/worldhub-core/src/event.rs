//! Realtime event envelope.
//!
//! [`WorldEvent`] is the wire-level schema pushed to subscribed connections.
//! Events are ephemeral: built by a handler, serialized once by the fan-out,
//! and dropped. Delivery is best-effort, so clients treat `revision` gaps and
//! `forceReload` as a signal to re-fetch instead of trusting the stream.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{MemberRole, World, WorldKeyword, WorldMember};

/// Event type for a new membership row.
pub const MEMBER_JOINED_EVENT_TYPE: &str = "world.member_joined";

/// Event type for a member leaving on their own.
pub const MEMBER_LEFT_EVENT_TYPE: &str = "world.member_left";

/// Event type for a member removed by an administrator.
pub const MEMBER_REMOVED_EVENT_TYPE: &str = "world.member_removed";

/// Event type for a role change.
pub const MEMBER_ROLE_UPDATED_EVENT_TYPE: &str = "world.member_role_updated";

/// Event type for any keyword-list mutation.
pub const KEYWORDS_CHANGED_EVENT_TYPE: &str = "world.keywords_changed";

/// Event type for a world metadata change.
pub const WORLD_UPDATED_EVENT_TYPE: &str = "world.updated";

/// Which keyword mutation produced a `world.keywords_changed` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordOperation {
    /// A single keyword was created.
    Created,
    /// A single keyword was updated.
    Updated,
    /// One or more keywords were deleted.
    Deleted,
    /// Positions were rewritten.
    Reordered,
    /// A batch import ran.
    Imported,
}

impl KeywordOperation {
    /// Whether recipients must discard local state and re-fetch the full
    /// list instead of patching it.
    #[must_use]
    pub fn requires_reload(self) -> bool {
        matches!(self, Self::Reordered | Self::Imported)
    }
}

/// Payload of a keyword mutation, stamped with the committed revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordChange {
    /// The mutation kind.
    pub operation: KeywordOperation,
    /// Revision committed with the mutation.
    pub revision: i64,
    /// Commit time in unix milliseconds.
    pub version: i64,
    /// Ids touched by the mutation.
    pub keyword_ids: Vec<Uuid>,
    /// Full records for created/updated keywords.
    pub keywords: Vec<WorldKeyword>,
    /// Ids removed by the mutation.
    pub deleted_ids: Vec<Uuid>,
}

/// Wire envelope pushed to every connection subscribed to `world_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldEvent {
    /// Event type name.
    #[serde(rename = "type")]
    pub event_type: String,
    /// The world the event belongs to.
    pub world_id: Uuid,
    /// Emission time, unix seconds.
    pub timestamp: i64,
    /// Request id of the mutation that produced the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Keywords touched by a keyword mutation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword_ids: Option<Vec<Uuid>>,
    /// Which keyword mutation happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<KeywordOperation>,
    /// Rows created or changed by the mutation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<WorldKeyword>>,
    /// Ids removed by a delete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_ids: Option<Vec<Uuid>>,
    /// Commit time of a keyword mutation in unix milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    /// Revision committed with a keyword mutation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<i64>,
    /// Clients should refetch instead of patching local state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_reload: Option<bool>,
    /// Member a membership event is about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    /// That member's role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<MemberRole>,
    /// World row after a settings change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world: Option<World>,
}

impl WorldEvent {
    /// Creates a bare envelope with every optional field absent.
    #[must_use]
    pub fn new(event_type: &str, world_id: Uuid, timestamp: i64) -> Self {
        Self {
            event_type: event_type.to_owned(),
            world_id,
            timestamp,
            request_id: None,
            keyword_ids: None,
            operation: None,
            keywords: None,
            deleted_ids: None,
            version: None,
            revision: None,
            force_reload: None,
            user_id: None,
            role: None,
            world: None,
        }
    }

    /// Attaches the originating request id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: Option<&str>) -> Self {
        self.request_id = request_id.map(str::to_owned);
        self
    }

    /// `world.member_joined` for a freshly inserted row.
    #[must_use]
    pub fn member_joined(member: &WorldMember, timestamp: i64) -> Self {
        let mut event = Self::new(MEMBER_JOINED_EVENT_TYPE, member.world_id, timestamp);
        event.user_id = Some(member.user_id);
        event.role = Some(member.role);
        event
    }

    /// `world.member_left`.
    #[must_use]
    pub fn member_left(world_id: Uuid, user_id: Uuid, timestamp: i64) -> Self {
        let mut event = Self::new(MEMBER_LEFT_EVENT_TYPE, world_id, timestamp);
        event.user_id = Some(user_id);
        event
    }

    /// `world.member_removed`.
    #[must_use]
    pub fn member_removed(world_id: Uuid, user_id: Uuid, timestamp: i64) -> Self {
        let mut event = Self::new(MEMBER_REMOVED_EVENT_TYPE, world_id, timestamp);
        event.user_id = Some(user_id);
        event
    }

    /// `world.member_role_updated` carrying the new role.
    #[must_use]
    pub fn member_role_updated(member: &WorldMember, timestamp: i64) -> Self {
        let mut event = Self::new(MEMBER_ROLE_UPDATED_EVENT_TYPE, member.world_id, timestamp);
        event.user_id = Some(member.user_id);
        event.role = Some(member.role);
        event
    }

    /// `world.updated` carrying the new world record.
    #[must_use]
    pub fn world_updated(world: &World, timestamp: i64) -> Self {
        let mut event = Self::new(WORLD_UPDATED_EVENT_TYPE, world.id, timestamp);
        event.world = Some(world.clone());
        event
    }

    /// `world.keywords_changed`. Empty id and record lists are omitted from
    /// the wire; `forceReload` is set for reorder and import.
    #[must_use]
    pub fn keywords_changed(world_id: Uuid, change: KeywordChange, timestamp: i64) -> Self {
        let mut event = Self::new(KEYWORDS_CHANGED_EVENT_TYPE, world_id, timestamp);
        event.operation = Some(change.operation);
        event.revision = Some(change.revision);
        event.version = Some(change.version);
        event.keyword_ids = non_empty(change.keyword_ids);
        event.keywords = non_empty(change.keywords);
        event.deleted_ids = non_empty(change.deleted_ids);
        if change.operation.requires_reload() {
            event.force_reload = Some(true);
        }
        event
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() { None } else { Some(items) }
}

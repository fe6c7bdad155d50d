//! Command handlers for the keyword context.
//!
//! Each handler validates input, turns the command into a batch of
//! [`KeywordWrite`]s, and commits the batch in one store call. The store bumps
//! the world's revision once per commit when any row changed, so bulk
//! operations advance it exactly once and a commit that touched nothing
//! leaves it alone and produces no event.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;
use worldhub_core::capability::{CapabilityChecker, SystemRole};
use worldhub_core::clock::Clock;
use worldhub_core::command::Command;
use worldhub_core::error::DomainError;
use worldhub_core::event::{KeywordChange, KeywordOperation, WorldEvent};
use worldhub_core::model::{World, WorldKeyword};
use worldhub_core::repository::{KeywordCommit, KeywordWrite, WorldStore};

use crate::domain::commands::{
    BulkDeleteKeywords, CreateKeyword, DeleteKeyword, ImportKeywords, ImportMode, KeywordDraft,
    ReorderKeywords, UpdateKeyword,
};
use crate::domain::validation::{check_batch, normalize_category, normalize_content};

/// Row counts reported by bulk operations.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordStats {
    /// Keywords inserted.
    pub created: usize,
    /// Keywords changed in place (including moved by a reorder).
    pub updated: usize,
    /// Keywords deleted.
    pub deleted: usize,
    /// Entries that did not apply: foreign or missing ids, duplicates, and
    /// invalid import drafts.
    pub skipped: usize,
}

/// What a keyword command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordOutcome {
    /// A single keyword as stored after the mutation.
    Item(WorldKeyword),
    /// A single keyword was deleted.
    Removed(Uuid),
    /// A bulk operation ran.
    Stats(KeywordStats),
}

/// Result of a keyword command.
#[derive(Debug, Clone)]
pub struct KeywordMutation {
    /// The outcome.
    pub outcome: KeywordOutcome,
    /// The world's keyword revision after the command.
    pub revision: i64,
    /// `world.keywords_changed` stamped with `revision`, or `None` when no
    /// row changed.
    pub event: Option<WorldEvent>,
}

/// Loads the world and checks that `actor_id` may edit its keywords: owners,
/// admins, and system admins always; plain members only when the world's
/// editing policy allows it.
async fn authorize_editor(
    world_id: Uuid,
    actor_id: Uuid,
    capabilities: &dyn CapabilityChecker,
    store: &dyn WorldStore,
) -> Result<World, DomainError> {
    let world = store
        .get_world(world_id)
        .await?
        .filter(World::is_active)
        .ok_or(DomainError::WorldNotFound(world_id))?;
    let member_may_edit = store
        .get_member(world.id, actor_id)
        .await?
        .is_some_and(|member| member.role.is_admin() || world.members_can_edit_keywords);
    if member_may_edit || capabilities.has_system_role(actor_id, SystemRole::Admin).await? {
        Ok(world)
    } else {
        debug!(%world_id, %actor_id, "keyword edit denied");
        Err(DomainError::Permission(format!(
            "user {actor_id} cannot edit keywords of world {world_id}"
        )))
    }
}

async fn next_position(store: &dyn WorldStore, world_id: Uuid) -> Result<i32, DomainError> {
    Ok(store
        .list_keywords(world_id)
        .await?
        .iter()
        .map(|keyword| keyword.position)
        .max()
        .map_or(0, |max| max.saturating_add(1)))
}

struct Stamp<'a> {
    world_id: Uuid,
    request_id: Option<&'a str>,
    now: DateTime<Utc>,
}

impl Stamp<'_> {
    /// Builds the event for a commit, or `None` when the commit changed
    /// nothing.
    fn event(
        &self,
        commit: &KeywordCommit,
        operation: KeywordOperation,
        keyword_ids: Vec<Uuid>,
        keywords: Vec<WorldKeyword>,
        deleted_ids: Vec<Uuid>,
    ) -> Option<WorldEvent> {
        if commit.total_affected() == 0 {
            return None;
        }
        info!(
            world_id = %self.world_id,
            ?operation,
            revision = commit.revision,
            rows = commit.total_affected(),
            "keywords committed"
        );
        let change = KeywordChange {
            operation,
            revision: commit.revision,
            version: self.now.timestamp_millis(),
            keyword_ids,
            keywords,
            deleted_ids,
        };
        Some(
            WorldEvent::keywords_changed(self.world_id, change, self.now.timestamp())
                .with_request_id(self.request_id),
        )
    }
}

/// Handles the `CreateKeyword` command.
///
/// # Errors
///
/// Returns `DomainError::Permission` when the actor may not edit,
/// `DomainError::Validation` for invalid fields, and
/// `DomainError::WorldNotFound` for a missing or deleted world.
pub async fn handle_create_keyword(
    command: &CreateKeyword,
    clock: &dyn Clock,
    capabilities: &dyn CapabilityChecker,
    store: &dyn WorldStore,
) -> Result<KeywordMutation, DomainError> {
    let world = authorize_editor(command.world_id, command.actor_id, capabilities, store).await?;
    let category = normalize_category(&command.category)?;
    let content = normalize_content(&command.content)?;
    let position = match command.position {
        Some(position) => position,
        None => next_position(store, world.id).await?,
    };

    let now = clock.now();
    let keyword = WorldKeyword {
        id: Uuid::new_v4(),
        world_id: world.id,
        position,
        category,
        content,
        enabled: command.enabled,
        updated_at: now,
    };
    let commit = store
        .commit_keyword_writes(world.id, &[KeywordWrite::Insert(keyword.clone())])
        .await?;
    if commit.total_affected() == 0 {
        return Err(DomainError::Conflict(format!(
            "keyword {} already exists",
            keyword.id
        )));
    }

    let stamp = Stamp {
        world_id: world.id,
        request_id: command.request_id(),
        now,
    };
    let event = stamp.event(
        &commit,
        KeywordOperation::Created,
        vec![keyword.id],
        vec![keyword.clone()],
        Vec::new(),
    );
    Ok(KeywordMutation {
        outcome: KeywordOutcome::Item(keyword),
        revision: commit.revision,
        event,
    })
}

/// Handles the `UpdateKeyword` command. An update that changes no field is a
/// no-op without an event.
///
/// # Errors
///
/// Returns `DomainError::KeywordNotFound` when the keyword is not in the
/// world, plus the errors of [`handle_create_keyword`].
pub async fn handle_update_keyword(
    command: &UpdateKeyword,
    clock: &dyn Clock,
    capabilities: &dyn CapabilityChecker,
    store: &dyn WorldStore,
) -> Result<KeywordMutation, DomainError> {
    let world = authorize_editor(command.world_id, command.actor_id, capabilities, store).await?;
    let current = store
        .get_keyword(world.id, command.keyword_id)
        .await?
        .ok_or(DomainError::KeywordNotFound(command.keyword_id))?;

    let mut keyword = current.clone();
    if let Some(category) = &command.category {
        keyword.category = normalize_category(category)?;
    }
    if let Some(content) = &command.content {
        keyword.content = normalize_content(content)?;
    }
    if let Some(enabled) = command.enabled {
        keyword.enabled = enabled;
    }
    if let Some(position) = command.position {
        keyword.position = position;
    }
    if keyword == current {
        return Ok(KeywordMutation {
            outcome: KeywordOutcome::Item(current),
            revision: store.keyword_revision(world.id).await?,
            event: None,
        });
    }

    let now = clock.now();
    keyword.updated_at = now;
    let commit = store
        .commit_keyword_writes(world.id, &[KeywordWrite::Update(keyword.clone())])
        .await?;
    if commit.total_affected() == 0 {
        return Err(DomainError::KeywordNotFound(keyword.id));
    }

    let stamp = Stamp {
        world_id: world.id,
        request_id: command.request_id(),
        now,
    };
    let event = stamp.event(
        &commit,
        KeywordOperation::Updated,
        vec![keyword.id],
        vec![keyword.clone()],
        Vec::new(),
    );
    Ok(KeywordMutation {
        outcome: KeywordOutcome::Item(keyword),
        revision: commit.revision,
        event,
    })
}

/// Handles the `DeleteKeyword` command.
///
/// # Errors
///
/// Returns `DomainError::KeywordNotFound` when the keyword is not in the
/// world, `DomainError::Permission` when the actor may not edit.
pub async fn handle_delete_keyword(
    command: &DeleteKeyword,
    clock: &dyn Clock,
    capabilities: &dyn CapabilityChecker,
    store: &dyn WorldStore,
) -> Result<KeywordMutation, DomainError> {
    let world = authorize_editor(command.world_id, command.actor_id, capabilities, store).await?;
    let commit = store
        .commit_keyword_writes(world.id, &[KeywordWrite::Delete(command.keyword_id)])
        .await?;
    if commit.total_affected() == 0 {
        return Err(DomainError::KeywordNotFound(command.keyword_id));
    }

    let stamp = Stamp {
        world_id: world.id,
        request_id: command.request_id(),
        now: clock.now(),
    };
    let event = stamp.event(
        &commit,
        KeywordOperation::Deleted,
        Vec::new(),
        Vec::new(),
        vec![command.keyword_id],
    );
    Ok(KeywordMutation {
        outcome: KeywordOutcome::Removed(command.keyword_id),
        revision: commit.revision,
        event,
    })
}

/// Handles the `BulkDeleteKeywords` command. Duplicate, missing, and foreign
/// ids count as skipped.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an empty or oversized batch and
/// `DomainError::Permission` when the actor may not edit.
pub async fn handle_bulk_delete_keywords(
    command: &BulkDeleteKeywords,
    clock: &dyn Clock,
    capabilities: &dyn CapabilityChecker,
    store: &dyn WorldStore,
) -> Result<KeywordMutation, DomainError> {
    check_batch(command.keyword_ids.len(), false)?;
    let world = authorize_editor(command.world_id, command.actor_id, capabilities, store).await?;

    let mut seen = HashSet::new();
    let ids: Vec<Uuid> = command
        .keyword_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect();
    let writes: Vec<KeywordWrite> = ids.iter().copied().map(KeywordWrite::Delete).collect();
    let commit = store.commit_keyword_writes(world.id, &writes).await?;

    let deleted_ids: Vec<Uuid> = ids
        .iter()
        .zip(&commit.affected)
        .filter(|(_, rows)| **rows > 0)
        .map(|(id, _)| *id)
        .collect();
    let stats = KeywordStats {
        deleted: deleted_ids.len(),
        skipped: command.keyword_ids.len() - deleted_ids.len(),
        ..KeywordStats::default()
    };
    if stats.skipped > 0 {
        debug!(world_id = %world.id, skipped = stats.skipped, "bulk delete skipped ids");
    }

    let stamp = Stamp {
        world_id: world.id,
        request_id: command.request_id(),
        now: clock.now(),
    };
    let event = stamp.event(
        &commit,
        KeywordOperation::Deleted,
        Vec::new(),
        Vec::new(),
        deleted_ids,
    );
    Ok(KeywordMutation {
        outcome: KeywordOutcome::Stats(stats),
        revision: commit.revision,
        event,
    })
}

/// Handles the `ReorderKeywords` command. The resulting event asks clients
/// to reload.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an empty or oversized batch or a
/// repeated id, and `DomainError::Permission` when the actor may not edit.
pub async fn handle_reorder_keywords(
    command: &ReorderKeywords,
    clock: &dyn Clock,
    capabilities: &dyn CapabilityChecker,
    store: &dyn WorldStore,
) -> Result<KeywordMutation, DomainError> {
    check_batch(command.items.len(), false)?;
    let mut seen = HashSet::new();
    if let Some(item) = command.items.iter().find(|item| !seen.insert(item.keyword_id)) {
        return Err(DomainError::Validation(format!(
            "keyword {} appears more than once",
            item.keyword_id
        )));
    }
    let world = authorize_editor(command.world_id, command.actor_id, capabilities, store).await?;

    let writes: Vec<KeywordWrite> = command
        .items
        .iter()
        .map(|item| KeywordWrite::SetPosition {
            keyword_id: item.keyword_id,
            position: item.position,
        })
        .collect();
    let commit = store.commit_keyword_writes(world.id, &writes).await?;

    let moved: Vec<Uuid> = command
        .items
        .iter()
        .zip(&commit.affected)
        .filter(|(_, rows)| **rows > 0)
        .map(|(item, _)| item.keyword_id)
        .collect();
    let stats = KeywordStats {
        updated: moved.len(),
        skipped: command.items.len() - moved.len(),
        ..KeywordStats::default()
    };

    let stamp = Stamp {
        world_id: world.id,
        request_id: command.request_id(),
        now: clock.now(),
    };
    let event = stamp.event(
        &commit,
        KeywordOperation::Reordered,
        moved,
        Vec::new(),
        Vec::new(),
    );
    Ok(KeywordMutation {
        outcome: KeywordOutcome::Stats(stats),
        revision: commit.revision,
        event,
    })
}

/// What each import write counts as once it affects a row.
#[derive(Debug, Clone, Copy)]
enum ImportSlot {
    Cleared,
    Created(Uuid),
    Updated(Uuid),
}

struct ValidDraft {
    id: Option<Uuid>,
    category: String,
    content: String,
    enabled: bool,
    position: Option<i32>,
}

fn validate_draft(draft: &KeywordDraft) -> Option<ValidDraft> {
    Some(ValidDraft {
        id: draft.id,
        category: normalize_category(&draft.category).ok()?,
        content: normalize_content(&draft.content).ok()?,
        enabled: draft.enabled,
        position: draft.position,
    })
}

/// Handles the `ImportKeywords` command.
///
/// `Replace` clears the list and inserts the batch; `Additive` updates the
/// drafts whose id already exists in the world and inserts the rest. Drafts
/// with invalid fields, repeated ids, or ids owned by another world are
/// skipped rather than failing the import. Drafts without a position are
/// appended in batch order. An empty batch is only accepted in replace mode,
/// where it clears the list.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an oversized batch or an empty
/// additive one, and `DomainError::Permission` when the actor may not edit.
pub async fn handle_import_keywords(
    command: &ImportKeywords,
    clock: &dyn Clock,
    capabilities: &dyn CapabilityChecker,
    store: &dyn WorldStore,
) -> Result<KeywordMutation, DomainError> {
    check_batch(command.items.len(), command.mode == ImportMode::Replace)?;
    let world = authorize_editor(command.world_id, command.actor_id, capabilities, store).await?;

    let existing: HashMap<Uuid, WorldKeyword> = match command.mode {
        ImportMode::Replace => HashMap::new(),
        ImportMode::Additive => store
            .list_keywords(world.id)
            .await?
            .into_iter()
            .map(|keyword| (keyword.id, keyword))
            .collect(),
    };
    let mut next = existing
        .values()
        .map(|keyword| keyword.position)
        .max()
        .map_or(0, |max| max.saturating_add(1));

    let now = clock.now();
    let mut stats = KeywordStats::default();
    let mut seen = HashSet::new();
    let mut writes = Vec::with_capacity(command.items.len() + 1);
    let mut slots = Vec::with_capacity(command.items.len() + 1);
    if command.mode == ImportMode::Replace {
        writes.push(KeywordWrite::Clear);
        slots.push(ImportSlot::Cleared);
    }

    for draft in &command.items {
        let Some(draft) = validate_draft(draft) else {
            stats.skipped += 1;
            continue;
        };
        let id = draft.id.unwrap_or_else(Uuid::new_v4);
        if !seen.insert(id) {
            stats.skipped += 1;
            continue;
        }
        if let Some(current) = existing.get(&id) {
            writes.push(KeywordWrite::Update(WorldKeyword {
                position: draft.position.unwrap_or(current.position),
                category: draft.category,
                content: draft.content,
                enabled: draft.enabled,
                updated_at: now,
                ..current.clone()
            }));
            slots.push(ImportSlot::Updated(id));
        } else {
            let position = draft.position.unwrap_or_else(|| {
                let position = next;
                next = next.saturating_add(1);
                position
            });
            writes.push(KeywordWrite::Insert(WorldKeyword {
                id,
                world_id: world.id,
                position,
                category: draft.category,
                content: draft.content,
                enabled: draft.enabled,
                updated_at: now,
            }));
            slots.push(ImportSlot::Created(id));
        }
    }

    let commit = store.commit_keyword_writes(world.id, &writes).await?;
    let mut keyword_ids = Vec::new();
    for (slot, rows) in slots.iter().zip(&commit.affected) {
        match (*slot, *rows) {
            (ImportSlot::Cleared, rows) => {
                stats.deleted = usize::try_from(rows).unwrap_or(usize::MAX);
            }
            (ImportSlot::Created(_) | ImportSlot::Updated(_), 0) => stats.skipped += 1,
            (ImportSlot::Created(id), _) => {
                stats.created += 1;
                keyword_ids.push(id);
            }
            (ImportSlot::Updated(id), _) => {
                stats.updated += 1;
                keyword_ids.push(id);
            }
        }
    }

    let stamp = Stamp {
        world_id: world.id,
        request_id: command.request_id(),
        now,
    };
    let event = stamp.event(
        &commit,
        KeywordOperation::Imported,
        keyword_ids,
        Vec::new(),
        Vec::new(),
    );
    Ok(KeywordMutation {
        outcome: KeywordOutcome::Stats(stats),
        revision: commit.revision,
        event,
    })
}

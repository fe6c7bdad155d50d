//! Query handlers for the keyword context.

use serde::Serialize;
use uuid::Uuid;
use worldhub_core::error::DomainError;
use worldhub_core::model::{Visibility, World, WorldKeyword};
use worldhub_core::repository::WorldStore;

/// A world's keyword list with the revision it reflects. Clients re-fetch
/// this after a `forceReload` event or a revision gap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordList {
    /// Keywords ordered by position, then id.
    pub keywords: Vec<WorldKeyword>,
    /// Keyword revision read before the list.
    pub revision: i64,
}

/// Returns the keyword list of a world the viewer may read: any member, or
/// anyone for a public world.
///
/// The revision is read before the list, so a concurrent commit can only
/// make the list newer than the revision, never older. A client that then
/// receives that commit's event applies a change it already has instead of
/// missing one.
///
/// # Errors
///
/// Returns `DomainError::WorldNotFound` for a missing or deleted world and
/// `DomainError::Permission` when a non-member asks for a private world.
pub async fn list_keywords(
    world_id: Uuid,
    viewer_id: Uuid,
    store: &dyn WorldStore,
) -> Result<KeywordList, DomainError> {
    let world = store
        .get_world(world_id)
        .await?
        .filter(World::is_active)
        .ok_or(DomainError::WorldNotFound(world_id))?;
    if world.visibility != Visibility::Public && store.get_member(world.id, viewer_id).await?.is_none() {
        return Err(DomainError::Permission(format!(
            "user {viewer_id} cannot read world {world_id}"
        )));
    }

    let revision = store.keyword_revision(world.id).await?;
    let keywords = store.list_keywords(world.id).await?;
    Ok(KeywordList { keywords, revision })
}

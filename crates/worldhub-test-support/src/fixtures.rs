//! Seed helpers for the in-memory store.

use uuid::Uuid;
use worldhub_core::model::{
    InviteStatus, MemberRole, Visibility, World, WorldInvite, WorldKeyword, WorldMember,
    WorldStatus,
};

use crate::clock::fixed_now;
use crate::store::InMemoryWorldStore;

/// Inserts an active private world owned by `owner_id`, together with its
/// owner row.
pub fn seed_world(store: &InMemoryWorldStore, owner_id: Uuid) -> World {
    let world = World {
        id: Uuid::new_v4(),
        owner_id,
        name: "Test World".to_owned(),
        visibility: Visibility::Private,
        status: WorldStatus::Active,
        members_can_edit_keywords: false,
        created_at: fixed_now(),
    };
    store.insert_world(world.clone());
    store.insert_member_row(WorldMember::new(
        world.id,
        owner_id,
        MemberRole::Owner,
        fixed_now(),
    ));
    world
}

/// Inserts an active, non-expiring invite granting `member`.
pub fn seed_invite(
    store: &InMemoryWorldStore,
    world_id: Uuid,
    slug: &str,
    max_use: i32,
) -> WorldInvite {
    let invite = WorldInvite {
        id: Uuid::new_v4(),
        world_id,
        slug: slug.to_owned(),
        status: InviteStatus::Active,
        expires_at: None,
        max_use,
        used_count: 0,
        role: MemberRole::Member,
        created_by: Uuid::new_v4(),
        created_at: fixed_now(),
    };
    store.insert_invite_row(invite.clone());
    invite
}

/// Inserts an enabled keyword in the `general` category.
pub fn seed_keyword(
    store: &InMemoryWorldStore,
    world_id: Uuid,
    position: i32,
    content: &str,
) -> WorldKeyword {
    let keyword = WorldKeyword {
        id: Uuid::new_v4(),
        world_id,
        position,
        category: "general".to_owned(),
        content: content.to_owned(),
        enabled: true,
        updated_at: fixed_now(),
    };
    store.insert_keyword_row(keyword.clone());
    keyword
}

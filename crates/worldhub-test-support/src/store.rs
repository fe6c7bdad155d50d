//! Test stores: in-memory and failing `WorldStore` implementations.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use worldhub_core::error::DomainError;
use worldhub_core::model::{
    InviteStatus, MemberRole, World, WorldInvite, WorldKeyword, WorldMember,
};
use worldhub_core::repository::{
    InviteRepository, InviteUse, KeywordCommit, KeywordRepository, KeywordWrite, MemberInsert,
    MemberRepository, Redemption, WorldRepository,
};

#[derive(Debug, Default)]
struct State {
    worlds: HashMap<Uuid, World>,
    members: HashMap<(Uuid, Uuid), WorldMember>,
    invites: HashMap<Uuid, WorldInvite>,
    keywords: HashMap<Uuid, WorldKeyword>,
    revisions: HashMap<Uuid, i64>,
}

/// A store that keeps every record in one mutex-guarded map set. Each trait
/// method runs under a single lock acquisition, which gives it the same
/// all-or-nothing behavior the PostgreSQL store gets from transactions.
#[derive(Debug, Default)]
pub struct InMemoryWorldStore {
    state: Mutex<State>,
}

impl InMemoryWorldStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Inserts or replaces a world record.
    pub fn insert_world(&self, world: World) {
        self.lock().worlds.insert(world.id, world);
    }

    /// Inserts or replaces a membership row, bypassing owner guards.
    pub fn insert_member_row(&self, member: WorldMember) {
        self.lock()
            .members
            .insert((member.world_id, member.user_id), member);
    }

    /// Inserts or replaces an invite.
    pub fn insert_invite_row(&self, invite: WorldInvite) {
        self.lock().invites.insert(invite.id, invite);
    }

    /// Inserts or replaces a keyword without touching the revision.
    pub fn insert_keyword_row(&self, keyword: WorldKeyword) {
        self.lock().keywords.insert(keyword.id, keyword);
    }

    /// Number of membership rows in a world.
    #[must_use]
    pub fn member_count(&self, world_id: Uuid) -> usize {
        self.lock()
            .members
            .keys()
            .filter(|(world, _)| *world == world_id)
            .count()
    }
}

fn count_use(invite: &mut WorldInvite) -> Option<InviteUse> {
    if invite.status != InviteStatus::Active || !invite.has_remaining_uses() {
        return None;
    }
    invite.used_count += 1;
    if !invite.is_unlimited() && invite.used_count >= invite.max_use {
        invite.status = InviteStatus::Exhausted;
    }
    Some(InviteUse {
        used_count: invite.used_count,
        status: invite.status,
    })
}

#[async_trait]
impl WorldRepository for InMemoryWorldStore {
    async fn get_world(&self, world_id: Uuid) -> Result<Option<World>, DomainError> {
        Ok(self.lock().worlds.get(&world_id).cloned())
    }

    async fn update_world(&self, world: &World) -> Result<(), DomainError> {
        let mut state = self.lock();
        let stored = state
            .worlds
            .get_mut(&world.id)
            .ok_or(DomainError::WorldNotFound(world.id))?;
        stored.name.clone_from(&world.name);
        stored.visibility = world.visibility;
        stored.status = world.status;
        stored.members_can_edit_keywords = world.members_can_edit_keywords;
        Ok(())
    }
}

#[async_trait]
impl MemberRepository for InMemoryWorldStore {
    async fn get_member(
        &self,
        world_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<WorldMember>, DomainError> {
        Ok(self.lock().members.get(&(world_id, user_id)).cloned())
    }

    async fn list_members(&self, world_id: Uuid) -> Result<Vec<WorldMember>, DomainError> {
        let mut members: Vec<WorldMember> = self
            .lock()
            .members
            .values()
            .filter(|member| member.world_id == world_id)
            .cloned()
            .collect();
        members.sort_by_key(|member| (member.joined_at, member.user_id));
        Ok(members)
    }

    async fn upsert_member(&self, member: &WorldMember) -> Result<MemberInsert, DomainError> {
        let mut state = self.lock();
        let key = (member.world_id, member.user_id);
        if let Some(existing) = state.members.get(&key) {
            return Ok(MemberInsert::AlreadyMember(existing.clone()));
        }
        state.members.insert(key, member.clone());
        Ok(MemberInsert::Inserted(member.clone()))
    }

    async fn update_member_role(
        &self,
        world_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<Option<WorldMember>, DomainError> {
        let mut state = self.lock();
        Ok(state
            .members
            .get_mut(&(world_id, user_id))
            .filter(|member| !member.is_owner())
            .map(|member| {
                member.role = role;
                member.clone()
            }))
    }

    async fn acknowledge_edit_notice(
        &self,
        world_id: Uuid,
        user_id: Uuid,
        acked_at: DateTime<Utc>,
    ) -> Result<Option<WorldMember>, DomainError> {
        let mut state = self.lock();
        Ok(state.members.get_mut(&(world_id, user_id)).map(|member| {
            member.edit_notice_acked_at = Some(acked_at);
            member.clone()
        }))
    }

    async fn delete_member(&self, world_id: Uuid, user_id: Uuid) -> Result<bool, DomainError> {
        let mut state = self.lock();
        let key = (world_id, user_id);
        if !state.members.get(&key).is_some_and(|member| !member.is_owner()) {
            return Ok(false);
        }
        state.members.remove(&key);
        Ok(true)
    }
}

#[async_trait]
impl InviteRepository for InMemoryWorldStore {
    async fn get_invite(&self, invite_id: Uuid) -> Result<Option<WorldInvite>, DomainError> {
        Ok(self.lock().invites.get(&invite_id).cloned())
    }

    async fn get_invite_by_slug(&self, slug: &str) -> Result<Option<WorldInvite>, DomainError> {
        Ok(self
            .lock()
            .invites
            .values()
            .find(|invite| invite.slug == slug)
            .cloned())
    }

    async fn insert_invite(&self, invite: &WorldInvite) -> Result<(), DomainError> {
        let mut state = self.lock();
        if state.invites.values().any(|other| other.slug == invite.slug) {
            return Err(DomainError::Conflict(format!(
                "invite slug {} already exists",
                invite.slug
            )));
        }
        state.invites.insert(invite.id, invite.clone());
        Ok(())
    }

    async fn update_invite_status(
        &self,
        invite_id: Uuid,
        expected: InviteStatus,
        status: InviteStatus,
    ) -> Result<bool, DomainError> {
        let mut state = self.lock();
        match state.invites.get_mut(&invite_id) {
            Some(invite) if invite.status == expected => {
                invite.status = status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn conditional_increment_invite_use(
        &self,
        invite_id: Uuid,
    ) -> Result<Option<InviteUse>, DomainError> {
        let mut state = self.lock();
        Ok(state.invites.get_mut(&invite_id).and_then(count_use))
    }

    async fn redeem_invite(
        &self,
        invite_id: Uuid,
        member: &WorldMember,
    ) -> Result<Redemption, DomainError> {
        let mut state = self.lock();
        let key = (member.world_id, member.user_id);
        if let Some(existing) = state.members.get(&key) {
            return Ok(Redemption::AlreadyMember(existing.clone()));
        }
        let Some(invite_use) = state.invites.get_mut(&invite_id).and_then(count_use) else {
            return Ok(Redemption::Unavailable);
        };
        state.members.insert(key, member.clone());
        Ok(Redemption::Joined {
            member: member.clone(),
            invite_use,
        })
    }
}

#[async_trait]
impl KeywordRepository for InMemoryWorldStore {
    async fn list_keywords(&self, world_id: Uuid) -> Result<Vec<WorldKeyword>, DomainError> {
        let mut keywords: Vec<WorldKeyword> = self
            .lock()
            .keywords
            .values()
            .filter(|keyword| keyword.world_id == world_id)
            .cloned()
            .collect();
        keywords.sort_by_key(|keyword| (keyword.position, keyword.id));
        Ok(keywords)
    }

    async fn get_keyword(
        &self,
        world_id: Uuid,
        keyword_id: Uuid,
    ) -> Result<Option<WorldKeyword>, DomainError> {
        Ok(self
            .lock()
            .keywords
            .get(&keyword_id)
            .filter(|keyword| keyword.world_id == world_id)
            .cloned())
    }

    async fn keyword_revision(&self, world_id: Uuid) -> Result<i64, DomainError> {
        Ok(self
            .lock()
            .revisions
            .get(&world_id)
            .copied()
            .unwrap_or_default())
    }

    async fn commit_keyword_writes(
        &self,
        world_id: Uuid,
        writes: &[KeywordWrite],
    ) -> Result<KeywordCommit, DomainError> {
        let mut state = self.lock();
        let mut affected = Vec::with_capacity(writes.len());
        for write in writes {
            let rows = match write {
                KeywordWrite::Insert(keyword) => {
                    if keyword.world_id != world_id || state.keywords.contains_key(&keyword.id) {
                        0
                    } else {
                        state.keywords.insert(keyword.id, keyword.clone());
                        1
                    }
                }
                KeywordWrite::Update(keyword) => match state.keywords.get_mut(&keyword.id) {
                    Some(stored) if stored.world_id == world_id => {
                        stored.position = keyword.position;
                        stored.category.clone_from(&keyword.category);
                        stored.content.clone_from(&keyword.content);
                        stored.enabled = keyword.enabled;
                        stored.updated_at = keyword.updated_at;
                        1
                    }
                    _ => 0,
                },
                KeywordWrite::Delete(keyword_id) => {
                    let owned = state
                        .keywords
                        .get(keyword_id)
                        .is_some_and(|stored| stored.world_id == world_id);
                    if owned {
                        state.keywords.remove(keyword_id);
                        1
                    } else {
                        0
                    }
                }
                KeywordWrite::SetPosition {
                    keyword_id,
                    position,
                } => match state.keywords.get_mut(keyword_id) {
                    Some(stored) if stored.world_id == world_id => {
                        stored.position = *position;
                        1
                    }
                    _ => 0,
                },
                KeywordWrite::Clear => {
                    let before = state.keywords.len();
                    state
                        .keywords
                        .retain(|_, keyword| keyword.world_id != world_id);
                    (before - state.keywords.len()) as u64
                }
            };
            affected.push(rows);
        }

        let revision = state.revisions.entry(world_id).or_default();
        if affected.iter().any(|rows| *rows > 0) {
            *revision += 1;
        }
        Ok(KeywordCommit {
            revision: *revision,
            affected,
        })
    }
}

/// A store whose every operation fails with an infrastructure error. Useful
/// for testing error-handling paths.
#[derive(Debug)]
pub struct FailingWorldStore;

fn unavailable<T>() -> Result<T, DomainError> {
    Err(DomainError::Infrastructure("connection refused".into()))
}

#[async_trait]
impl WorldRepository for FailingWorldStore {
    async fn get_world(&self, _world_id: Uuid) -> Result<Option<World>, DomainError> {
        unavailable()
    }

    async fn update_world(&self, _world: &World) -> Result<(), DomainError> {
        unavailable()
    }
}

#[async_trait]
impl MemberRepository for FailingWorldStore {
    async fn get_member(
        &self,
        _world_id: Uuid,
        _user_id: Uuid,
    ) -> Result<Option<WorldMember>, DomainError> {
        unavailable()
    }

    async fn list_members(&self, _world_id: Uuid) -> Result<Vec<WorldMember>, DomainError> {
        unavailable()
    }

    async fn upsert_member(&self, _member: &WorldMember) -> Result<MemberInsert, DomainError> {
        unavailable()
    }

    async fn update_member_role(
        &self,
        _world_id: Uuid,
        _user_id: Uuid,
        _role: MemberRole,
    ) -> Result<Option<WorldMember>, DomainError> {
        unavailable()
    }

    async fn acknowledge_edit_notice(
        &self,
        _world_id: Uuid,
        _user_id: Uuid,
        _acked_at: DateTime<Utc>,
    ) -> Result<Option<WorldMember>, DomainError> {
        unavailable()
    }

    async fn delete_member(&self, _world_id: Uuid, _user_id: Uuid) -> Result<bool, DomainError> {
        unavailable()
    }
}

#[async_trait]
impl InviteRepository for FailingWorldStore {
    async fn get_invite(&self, _invite_id: Uuid) -> Result<Option<WorldInvite>, DomainError> {
        unavailable()
    }

    async fn get_invite_by_slug(&self, _slug: &str) -> Result<Option<WorldInvite>, DomainError> {
        unavailable()
    }

    async fn insert_invite(&self, _invite: &WorldInvite) -> Result<(), DomainError> {
        unavailable()
    }

    async fn update_invite_status(
        &self,
        _invite_id: Uuid,
        _expected: InviteStatus,
        _status: InviteStatus,
    ) -> Result<bool, DomainError> {
        unavailable()
    }

    async fn conditional_increment_invite_use(
        &self,
        _invite_id: Uuid,
    ) -> Result<Option<InviteUse>, DomainError> {
        unavailable()
    }

    async fn redeem_invite(
        &self,
        _invite_id: Uuid,
        _member: &WorldMember,
    ) -> Result<Redemption, DomainError> {
        unavailable()
    }
}

#[async_trait]
impl KeywordRepository for FailingWorldStore {
    async fn list_keywords(&self, _world_id: Uuid) -> Result<Vec<WorldKeyword>, DomainError> {
        unavailable()
    }

    async fn get_keyword(
        &self,
        _world_id: Uuid,
        _keyword_id: Uuid,
    ) -> Result<Option<WorldKeyword>, DomainError> {
        unavailable()
    }

    async fn keyword_revision(&self, _world_id: Uuid) -> Result<i64, DomainError> {
        unavailable()
    }

    async fn commit_keyword_writes(
        &self,
        _world_id: Uuid,
        _writes: &[KeywordWrite],
    ) -> Result<KeywordCommit, DomainError> {
        unavailable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{seed_invite, seed_keyword, seed_world};

    #[tokio::test]
    async fn test_redeem_flips_capped_invite_to_exhausted() {
        let store = InMemoryWorldStore::new();
        let world = seed_world(&store, Uuid::new_v4());
        let invite = seed_invite(&store, world.id, "abc123", 1);
        let member = WorldMember::new(world.id, Uuid::new_v4(), MemberRole::Member, world.created_at);

        let first = store.redeem_invite(invite.id, &member).await.unwrap();
        let other = WorldMember::new(world.id, Uuid::new_v4(), MemberRole::Member, world.created_at);
        let second = store.redeem_invite(invite.id, &other).await.unwrap();

        match first {
            Redemption::Joined { invite_use, .. } => {
                assert_eq!(invite_use.used_count, 1);
                assert_eq!(invite_use.status, InviteStatus::Exhausted);
            }
            other => panic!("expected Joined, got {other:?}"),
        }
        assert_eq!(second, Redemption::Unavailable);
        assert_eq!(store.member_count(world.id), 2);
    }

    #[tokio::test]
    async fn test_commit_without_affected_rows_keeps_revision() {
        let store = InMemoryWorldStore::new();
        let world = seed_world(&store, Uuid::new_v4());
        let keyword = seed_keyword(&store, world.id, 0, "dragon");

        let missed = store
            .commit_keyword_writes(world.id, &[KeywordWrite::Delete(Uuid::new_v4())])
            .await
            .unwrap();
        let hit = store
            .commit_keyword_writes(world.id, &[KeywordWrite::Delete(keyword.id)])
            .await
            .unwrap();

        assert_eq!(missed.revision, 0);
        assert_eq!(missed.affected, vec![0]);
        assert_eq!(hit.revision, 1);
        assert_eq!(hit.affected, vec![1]);
    }

    #[tokio::test]
    async fn test_owner_row_survives_delete_and_role_change() {
        let store = InMemoryWorldStore::new();
        let owner_id = Uuid::new_v4();
        let world = seed_world(&store, owner_id);

        assert!(!store.delete_member(world.id, owner_id).await.unwrap());
        assert!(
            store
                .update_member_role(world.id, owner_id, MemberRole::Member)
                .await
                .unwrap()
                .is_none()
        );
        let owner = store.get_member(world.id, owner_id).await.unwrap().unwrap();
        assert_eq!(owner.role, MemberRole::Owner);
    }
}

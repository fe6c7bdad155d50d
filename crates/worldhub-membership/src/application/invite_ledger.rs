//! Invite ledger: consumption and administration of invites.
//!
//! Consumption is race-safe because counting a use and inserting the member
//! row happen inside one store operation ([`InviteRepository::redeem_invite`])
//! guarded by the current count. The pre-checks below only produce precise
//! error messages; they are not what keeps `used_count <= max_use`.
//!
//! [`InviteRepository::redeem_invite`]: worldhub_core::repository::InviteRepository::redeem_invite

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::{debug, info};
use uuid::Uuid;
use worldhub_core::capability::CapabilityChecker;
use worldhub_core::clock::Clock;
use worldhub_core::command::Command;
use worldhub_core::error::DomainError;
use worldhub_core::event::WorldEvent;
use worldhub_core::model::{InviteStatus, MemberRole, World, WorldInvite, WorldMember};
use worldhub_core::repository::{InviteUse, Redemption, WorldStore};

use crate::application::{load_active_world, require_admin};
use crate::domain::commands::{ConsumeInvite, CreateInvite, RevokeInvite};
use crate::domain::policy::InviteUsePolicy;

/// Length of generated invite slugs.
const SLUG_LEN: usize = 10;

/// Attempts at finding an unused slug before giving up.
const SLUG_ATTEMPTS: usize = 3;

/// Result of consuming an invite.
#[derive(Debug, Clone)]
pub struct InviteConsumption {
    /// The invite as of the consumption.
    pub invite: WorldInvite,
    /// The world joined.
    pub world: World,
    /// The consumer's membership row.
    pub member: WorldMember,
    /// `true` when the consumer was already a member and nothing was created.
    pub already_joined: bool,
    /// `world.member_joined` for first-time joins.
    pub event: Option<WorldEvent>,
}

fn apply_use(invite: &mut WorldInvite, invite_use: InviteUse) {
    invite.used_count = invite_use.used_count;
    invite.status = invite_use.status;
}

/// Rejects invites that cannot admit anyone right now. An active invite
/// found past its expiry is flipped to `Expired` on the way out.
async fn ensure_consumable(
    invite: &WorldInvite,
    now: DateTime<Utc>,
    store: &dyn WorldStore,
) -> Result<(), DomainError> {
    if invite.status != InviteStatus::Active {
        return Err(DomainError::InviteInvalid(format!(
            "invite is {}",
            invite.status
        )));
    }
    if invite.is_expired_at(now) {
        store
            .update_invite_status(invite.id, InviteStatus::Active, InviteStatus::Expired)
            .await?;
        return Err(DomainError::InviteInvalid("invite has expired".into()));
    }
    if !invite.has_remaining_uses() {
        return Err(DomainError::InviteInvalid(
            "invite has no remaining uses".into(),
        ));
    }
    Ok(())
}

/// Handles the `ConsumeInvite` command.
///
/// A consumer who already holds a row gets `already_joined = true` and no
/// new row. Under [`InviteUsePolicy::FirstJoinOnly`] that repeat is not
/// counted and succeeds whatever the invite's state; under
/// [`InviteUsePolicy::EveryConsumption`] it is counted and therefore
/// subject to the invite still being consumable.
///
/// # Errors
///
/// Returns `DomainError::InviteInvalid` if the slug is unknown or the invite
/// is revoked, expired, or exhausted; `DomainError::WorldNotFound` if the
/// invite's world is missing or deleted; `DomainError::Infrastructure` on
/// store failure.
pub async fn handle_consume_invite(
    command: &ConsumeInvite,
    policy: InviteUsePolicy,
    clock: &dyn Clock,
    store: &dyn WorldStore,
) -> Result<InviteConsumption, DomainError> {
    let now = clock.now();
    let mut invite = store
        .get_invite_by_slug(&command.slug)
        .await?
        .ok_or_else(|| DomainError::InviteInvalid("unknown invite".into()))?;
    let world = load_active_world(store, invite.world_id).await?;

    if let Some(member) = store.get_member(world.id, command.user_id).await? {
        return consume_as_member(invite, world, member, policy, now, store).await;
    }

    ensure_consumable(&invite, now, store).await?;

    let candidate = WorldMember::new(world.id, command.user_id, invite.role, now);
    match store.redeem_invite(invite.id, &candidate).await? {
        Redemption::Joined { member, invite_use } => {
            apply_use(&mut invite, invite_use);
            info!(
                invite_id = %invite.id,
                world_id = %world.id,
                user_id = %member.user_id,
                used_count = invite.used_count,
                status = %invite.status,
                "invite consumed"
            );
            let event = WorldEvent::member_joined(&member, clock.unix_seconds())
                .with_request_id(command.request_id());
            Ok(InviteConsumption {
                invite,
                world,
                member,
                already_joined: false,
                event: Some(event),
            })
        }
        // Lost a race against another consumption by the same user.
        Redemption::AlreadyMember(member) => {
            consume_as_member(invite, world, member, policy, now, store).await
        }
        Redemption::Unavailable => {
            debug!(invite_id = %invite.id, user_id = %command.user_id, "invite ran out of uses");
            Err(DomainError::InviteInvalid(
                "invite has no remaining uses".into(),
            ))
        }
    }
}

async fn consume_as_member(
    mut invite: WorldInvite,
    world: World,
    member: WorldMember,
    policy: InviteUsePolicy,
    now: DateTime<Utc>,
    store: &dyn WorldStore,
) -> Result<InviteConsumption, DomainError> {
    if policy == InviteUsePolicy::EveryConsumption {
        ensure_consumable(&invite, now, store).await?;
        let invite_use = store
            .conditional_increment_invite_use(invite.id)
            .await?
            .ok_or_else(|| DomainError::InviteInvalid("invite has no remaining uses".into()))?;
        apply_use(&mut invite, invite_use);
    }
    debug!(invite_id = %invite.id, world_id = %world.id, user_id = %member.user_id, "invite consumed by existing member");
    Ok(InviteConsumption {
        invite,
        world,
        member,
        already_joined: true,
        event: None,
    })
}

fn generate_slug() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SLUG_LEN)
        .map(char::from)
        .collect()
}

/// Handles the `CreateInvite` command: validates the grant and persists a
/// new active invite under a random slug.
///
/// # Errors
///
/// Returns `DomainError::Permission` if the actor cannot administer the
/// world, `DomainError::MemberInvalid` for an owner grant,
/// `DomainError::Validation` for a negative cap or a past expiry,
/// `DomainError::WorldNotFound` for a missing world, and
/// `DomainError::Conflict` if no free slug was found.
pub async fn handle_create_invite(
    command: &CreateInvite,
    clock: &dyn Clock,
    capabilities: &dyn CapabilityChecker,
    store: &dyn WorldStore,
) -> Result<WorldInvite, DomainError> {
    let now = clock.now();
    let world = load_active_world(store, command.world_id).await?;
    require_admin(capabilities, world.id, command.actor_id).await?;

    if command.role == MemberRole::Owner {
        return Err(DomainError::MemberInvalid(
            "invites cannot grant the owner role".into(),
        ));
    }
    if command.max_use < 0 {
        return Err(DomainError::Validation("max_use must not be negative".into()));
    }
    if command.expires_at.is_some_and(|expires_at| expires_at <= now) {
        return Err(DomainError::Validation("expiry must be in the future".into()));
    }

    let mut last_conflict = None;
    for _ in 0..SLUG_ATTEMPTS {
        let invite = WorldInvite {
            id: Uuid::new_v4(),
            world_id: world.id,
            slug: generate_slug(),
            status: InviteStatus::Active,
            expires_at: command.expires_at,
            max_use: command.max_use,
            used_count: 0,
            role: command.role,
            created_by: command.actor_id,
            created_at: now,
        };
        match store.insert_invite(&invite).await {
            Ok(()) => {
                info!(invite_id = %invite.id, world_id = %world.id, max_use = invite.max_use, "invite created");
                return Ok(invite);
            }
            Err(err @ DomainError::Conflict(_)) => last_conflict = Some(err),
            Err(err) => return Err(err),
        }
    }
    Err(last_conflict.unwrap_or_else(|| DomainError::Conflict("no free invite slug".into())))
}

/// Handles the `RevokeInvite` command. Revoking a revoked invite is a no-op.
///
/// # Errors
///
/// Returns `DomainError::InviteNotFound` for an unknown id,
/// `DomainError::Permission` if the actor cannot administer the world, and
/// `DomainError::InviteInvalid` if the invite already expired or ran out.
pub async fn handle_revoke_invite(
    command: &RevokeInvite,
    capabilities: &dyn CapabilityChecker,
    store: &dyn WorldStore,
) -> Result<WorldInvite, DomainError> {
    let mut invite = store
        .get_invite(command.invite_id)
        .await?
        .ok_or(DomainError::InviteNotFound(command.invite_id))?;
    require_admin(capabilities, invite.world_id, command.actor_id).await?;

    if invite.status == InviteStatus::Active
        && store
            .update_invite_status(invite.id, InviteStatus::Active, InviteStatus::Revoked)
            .await?
    {
        invite.status = InviteStatus::Revoked;
        info!(invite_id = %invite.id, world_id = %invite.world_id, "invite revoked");
        return Ok(invite);
    }

    // The status may have moved since the read.
    let current = store
        .get_invite(invite.id)
        .await?
        .ok_or(DomainError::InviteNotFound(invite.id))?;
    match current.status {
        InviteStatus::Revoked => Ok(current),
        status => Err(DomainError::InviteInvalid(format!(
            "cannot revoke an invite that is {status}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use chrono::Duration;
    use worldhub_core::error::ErrorCategory;
    use worldhub_core::event::MEMBER_JOINED_EVENT_TYPE;
    use worldhub_core::model::WorldStatus;
    use worldhub_core::repository::{InviteRepository, MemberRepository, WorldRepository};
    use worldhub_test_support::{
        FailingWorldStore, FixedClock, InMemoryWorldStore, StaticCapabilities, fixed_now,
        seed_invite, seed_world,
    };

    use super::*;

    fn consume(slug: &str, user_id: Uuid) -> ConsumeInvite {
        ConsumeInvite {
            request_id: Some("req-1".into()),
            slug: slug.to_owned(),
            user_id,
        }
    }

    #[tokio::test]
    async fn test_first_consumption_creates_member_and_emits_join_event() {
        // Arrange
        let store = InMemoryWorldStore::new();
        let world = seed_world(&store, Uuid::new_v4());
        seed_invite(&store, world.id, "abc123", 5);
        let user_id = Uuid::new_v4();
        let clock = FixedClock(fixed_now());

        // Act
        let result = handle_consume_invite(
            &consume("abc123", user_id),
            InviteUsePolicy::default(),
            &clock,
            &store,
        )
        .await
        .unwrap();

        // Assert
        assert!(!result.already_joined);
        assert_eq!(result.member.user_id, user_id);
        assert_eq!(result.member.role, MemberRole::Member);
        assert_eq!(result.invite.used_count, 1);
        assert_eq!(result.invite.status, InviteStatus::Active);
        let event = result.event.unwrap();
        assert_eq!(event.event_type, MEMBER_JOINED_EVENT_TYPE);
        assert_eq!(event.user_id, Some(user_id));
        assert_eq!(event.request_id.as_deref(), Some("req-1"));
        assert_eq!(event.timestamp, fixed_now().timestamp());
    }

    #[tokio::test]
    async fn test_repeat_consumption_is_idempotent_and_not_counted() {
        // Arrange
        let store = InMemoryWorldStore::new();
        let world = seed_world(&store, Uuid::new_v4());
        let invite = seed_invite(&store, world.id, "abc123", 1);
        let user_id = Uuid::new_v4();
        let clock = FixedClock(fixed_now());
        let command = consume("abc123", user_id);

        // Act
        let first = handle_consume_invite(&command, InviteUsePolicy::default(), &clock, &store)
            .await
            .unwrap();
        let second = handle_consume_invite(&command, InviteUsePolicy::default(), &clock, &store)
            .await
            .unwrap();
        let third = handle_consume_invite(&command, InviteUsePolicy::default(), &clock, &store)
            .await
            .unwrap();

        // Assert
        assert!(!first.already_joined);
        assert!(second.already_joined);
        assert!(third.already_joined);
        assert!(second.event.is_none());
        assert_eq!(store.member_count(world.id), 2);
        let stored = store.get_invite(invite.id).await.unwrap().unwrap();
        assert_eq!(stored.used_count, 1);
        assert_eq!(stored.status, InviteStatus::Exhausted);
    }

    #[tokio::test]
    async fn test_every_consumption_policy_counts_repeats_until_cap() {
        // Arrange
        let store = InMemoryWorldStore::new();
        let world = seed_world(&store, Uuid::new_v4());
        let invite = seed_invite(&store, world.id, "abc123", 2);
        let user_id = Uuid::new_v4();
        let clock = FixedClock(fixed_now());
        let command = consume("abc123", user_id);
        let policy = InviteUsePolicy::EveryConsumption;

        // Act
        handle_consume_invite(&command, policy, &clock, &store)
            .await
            .unwrap();
        let repeat = handle_consume_invite(&command, policy, &clock, &store)
            .await
            .unwrap();
        let over_cap = handle_consume_invite(&command, policy, &clock, &store).await;

        // Assert
        assert!(repeat.already_joined);
        assert_eq!(repeat.invite.used_count, 2);
        assert_eq!(repeat.invite.status, InviteStatus::Exhausted);
        assert_eq!(
            over_cap.unwrap_err().category(),
            ErrorCategory::Invalid
        );
        assert_eq!(store.member_count(world.id), 2);
        let stored = store.get_invite(invite.id).await.unwrap().unwrap();
        assert_eq!(stored.used_count, 2);
    }

    #[tokio::test]
    async fn test_expired_invite_is_invalid_and_marked_expired() {
        // Arrange
        let store = InMemoryWorldStore::new();
        let world = seed_world(&store, Uuid::new_v4());
        let mut invite = seed_invite(&store, world.id, "late", 0);
        invite.expires_at = Some(fixed_now() - Duration::minutes(1));
        store.insert_invite_row(invite.clone());
        let clock = FixedClock(fixed_now());

        // Act
        let result = handle_consume_invite(
            &consume("late", Uuid::new_v4()),
            InviteUsePolicy::default(),
            &clock,
            &store,
        )
        .await;

        // Assert
        match result.unwrap_err() {
            DomainError::InviteInvalid(_) => {}
            other => panic!("expected InviteInvalid, got {other:?}"),
        }
        let stored = store.get_invite(invite.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InviteStatus::Expired);
        assert_eq!(stored.used_count, 0);
        assert_eq!(store.member_count(world.id), 1);
    }

    #[tokio::test]
    async fn test_revoked_and_unknown_invites_are_invalid() {
        let store = InMemoryWorldStore::new();
        let world = seed_world(&store, Uuid::new_v4());
        let mut invite = seed_invite(&store, world.id, "gone", 0);
        invite.status = InviteStatus::Revoked;
        store.insert_invite_row(invite);
        let clock = FixedClock(fixed_now());

        for slug in ["gone", "never-issued"] {
            let result = handle_consume_invite(
                &consume(slug, Uuid::new_v4()),
                InviteUsePolicy::default(),
                &clock,
                &store,
            )
            .await;
            assert!(matches!(result, Err(DomainError::InviteInvalid(_))));
        }
    }

    #[tokio::test]
    async fn test_deleted_world_fails_with_world_not_found() {
        // Arrange
        let store = InMemoryWorldStore::new();
        let mut world = seed_world(&store, Uuid::new_v4());
        seed_invite(&store, world.id, "abc123", 0);
        world.status = WorldStatus::Deleted;
        store.update_world(&world).await.unwrap();
        let clock = FixedClock(fixed_now());

        // Act
        let result = handle_consume_invite(
            &consume("abc123", Uuid::new_v4()),
            InviteUsePolicy::default(),
            &clock,
            &store,
        )
        .await;

        // Assert
        match result.unwrap_err() {
            DomainError::WorldNotFound(id) => assert_eq!(id, world.id),
            other => panic!("expected WorldNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invite_grants_its_configured_role() {
        let store = InMemoryWorldStore::new();
        let world = seed_world(&store, Uuid::new_v4());
        let mut invite = seed_invite(&store, world.id, "staff", 0);
        invite.role = MemberRole::Admin;
        store.insert_invite_row(invite);
        let user_id = Uuid::new_v4();

        let result = handle_consume_invite(
            &consume("staff", user_id),
            InviteUsePolicy::default(),
            &FixedClock(fixed_now()),
            &store,
        )
        .await
        .unwrap();

        let stored = store.get_member(world.id, user_id).await.unwrap().unwrap();
        assert_eq!(result.member.role, MemberRole::Admin);
        assert_eq!(stored.role, MemberRole::Admin);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_two_concurrent_consumers_of_single_use_invite() {
        // Arrange
        let store = Arc::new(InMemoryWorldStore::new());
        let world = seed_world(&store, Uuid::new_v4());
        let invite = seed_invite(&store, world.id, "abc123", 1);
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();

        // Act
        let tasks: Vec<_> = [u1, u2]
            .into_iter()
            .map(|user_id| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let result = handle_consume_invite(
                        &consume("abc123", user_id),
                        InviteUsePolicy::default(),
                        &FixedClock(fixed_now()),
                        store.as_ref(),
                    )
                    .await;
                    (user_id, result)
                })
            })
            .collect();
        let mut outcomes = Vec::new();
        for task in tasks {
            outcomes.push(task.await.unwrap());
        }

        // Assert
        let joined: Vec<Uuid> = outcomes
            .iter()
            .filter_map(|(user_id, result)| match result {
                Ok(consumption) if !consumption.already_joined => Some(*user_id),
                _ => None,
            })
            .collect();
        let rejected = outcomes
            .iter()
            .filter(|(_, result)| matches!(result, Err(DomainError::InviteInvalid(_))))
            .count();
        assert_eq!(joined.len(), 1);
        assert_eq!(rejected, 1);
        let stored = store.get_invite(invite.id).await.unwrap().unwrap();
        assert_eq!(stored.used_count, 1);
        assert_eq!(stored.status, InviteStatus::Exhausted);
        assert_eq!(store.member_count(world.id), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_consumers_never_exceed_max_use() {
        // Arrange
        let store = Arc::new(InMemoryWorldStore::new());
        let world = seed_world(&store, Uuid::new_v4());
        let invite = seed_invite(&store, world.id, "crowd", 5);

        // Act
        let tasks: Vec<_> = (0..40)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    handle_consume_invite(
                        &consume("crowd", Uuid::new_v4()),
                        InviteUsePolicy::default(),
                        &FixedClock(fixed_now()),
                        store.as_ref(),
                    )
                    .await
                })
            })
            .collect();
        let mut successes = 0;
        for task in tasks {
            if let Ok(consumption) = task.await.unwrap() {
                assert!(!consumption.already_joined);
                successes += 1;
            }
        }

        // Assert
        assert_eq!(successes, 5);
        let stored = store.get_invite(invite.id).await.unwrap().unwrap();
        assert_eq!(stored.used_count, 5);
        assert_eq!(store.member_count(world.id), 6);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_user_racing_itself_joins_once() {
        let store = Arc::new(InMemoryWorldStore::new());
        let world = seed_world(&store, Uuid::new_v4());
        let invite = seed_invite(&store, world.id, "twice", 10);
        let user_id = Uuid::new_v4();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    handle_consume_invite(
                        &consume("twice", user_id),
                        InviteUsePolicy::default(),
                        &FixedClock(fixed_now()),
                        store.as_ref(),
                    )
                    .await
                    .unwrap()
                })
            })
            .collect();
        let mut first_joins = 0;
        for task in tasks {
            if !task.await.unwrap().already_joined {
                first_joins += 1;
            }
        }

        assert_eq!(first_joins, 1);
        assert_eq!(store.member_count(world.id), 2);
        let stored = store.get_invite(invite.id).await.unwrap().unwrap();
        assert_eq!(stored.used_count, 1);
    }

    #[tokio::test]
    async fn test_consume_propagates_store_failure() {
        let result = handle_consume_invite(
            &consume("abc123", Uuid::new_v4()),
            InviteUsePolicy::default(),
            &FixedClock(fixed_now()),
            &FailingWorldStore,
        )
        .await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }

    #[tokio::test]
    async fn test_create_invite_generates_unique_slugs_for_admins() {
        // Arrange
        let store = InMemoryWorldStore::new();
        let owner_id = Uuid::new_v4();
        let world = seed_world(&store, owner_id);
        let capabilities = StaticCapabilities::deny_all().with_world_admin(world.id, owner_id);
        let command = CreateInvite {
            request_id: None,
            world_id: world.id,
            actor_id: owner_id,
            max_use: 3,
            expires_at: Some(fixed_now() + Duration::days(7)),
            role: MemberRole::Member,
        };
        let clock = FixedClock(fixed_now());

        // Act
        let mut slugs = HashSet::new();
        for _ in 0..5 {
            let invite = handle_create_invite(&command, &clock, &capabilities, &store)
                .await
                .unwrap();
            assert_eq!(invite.status, InviteStatus::Active);
            assert_eq!(invite.slug.len(), SLUG_LEN);
            assert!(store.get_invite_by_slug(&invite.slug).await.unwrap().is_some());
            slugs.insert(invite.slug);
        }

        // Assert
        assert_eq!(slugs.len(), 5);
    }

    #[tokio::test]
    async fn test_create_invite_rejects_non_admin_and_owner_grants() {
        let store = InMemoryWorldStore::new();
        let owner_id = Uuid::new_v4();
        let world = seed_world(&store, owner_id);
        let capabilities = StaticCapabilities::deny_all().with_world_admin(world.id, owner_id);
        let clock = FixedClock(fixed_now());
        let mut command = CreateInvite {
            request_id: None,
            world_id: world.id,
            actor_id: Uuid::new_v4(),
            max_use: 0,
            expires_at: None,
            role: MemberRole::Member,
        };

        let denied = handle_create_invite(&command, &clock, &capabilities, &store).await;
        command.actor_id = owner_id;
        command.role = MemberRole::Owner;
        let owner_grant = handle_create_invite(&command, &clock, &capabilities, &store).await;
        command.role = MemberRole::Member;
        command.expires_at = Some(fixed_now());
        let past_expiry = handle_create_invite(&command, &clock, &capabilities, &store).await;

        assert!(matches!(denied, Err(DomainError::Permission(_))));
        assert!(matches!(owner_grant, Err(DomainError::MemberInvalid(_))));
        assert!(matches!(past_expiry, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_revoke_blocks_further_consumption_and_is_idempotent() {
        // Arrange
        let store = InMemoryWorldStore::new();
        let owner_id = Uuid::new_v4();
        let world = seed_world(&store, owner_id);
        let invite = seed_invite(&store, world.id, "abc123", 0);
        let capabilities = StaticCapabilities::deny_all().with_world_admin(world.id, owner_id);
        let command = RevokeInvite {
            request_id: None,
            invite_id: invite.id,
            actor_id: owner_id,
        };

        // Act
        let revoked = handle_revoke_invite(&command, &capabilities, &store)
            .await
            .unwrap();
        let again = handle_revoke_invite(&command, &capabilities, &store)
            .await
            .unwrap();
        let consumption = handle_consume_invite(
            &consume("abc123", Uuid::new_v4()),
            InviteUsePolicy::default(),
            &FixedClock(fixed_now()),
            &store,
        )
        .await;

        // Assert
        assert_eq!(revoked.status, InviteStatus::Revoked);
        assert_eq!(again.status, InviteStatus::Revoked);
        assert!(matches!(consumption, Err(DomainError::InviteInvalid(_))));
    }

    #[tokio::test]
    async fn test_revoke_exhausted_invite_is_invalid() {
        let store = InMemoryWorldStore::new();
        let owner_id = Uuid::new_v4();
        let world = seed_world(&store, owner_id);
        let mut invite = seed_invite(&store, world.id, "spent", 1);
        invite.used_count = 1;
        invite.status = InviteStatus::Exhausted;
        store.insert_invite_row(invite.clone());
        let capabilities = StaticCapabilities::deny_all().with_system_admin(owner_id);

        let result = handle_revoke_invite(
            &RevokeInvite {
                request_id: None,
                invite_id: invite.id,
                actor_id: owner_id,
            },
            &capabilities,
            &store,
        )
        .await;

        assert!(matches!(result, Err(DomainError::InviteInvalid(_))));
    }

    #[tokio::test]
    async fn test_revoke_unknown_invite_is_not_found() {
        let store = InMemoryWorldStore::new();
        let invite_id = Uuid::new_v4();

        let result = handle_revoke_invite(
            &RevokeInvite {
                request_id: None,
                invite_id,
                actor_id: Uuid::new_v4(),
            },
            &StaticCapabilities::deny_all(),
            &store,
        )
        .await;

        match result.unwrap_err() {
            DomainError::InviteNotFound(id) => assert_eq!(id, invite_id),
            other => panic!("expected InviteNotFound, got {other:?}"),
        }
    }
}

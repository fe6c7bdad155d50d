//! Shared application state.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;
use worldhub_core::capability::CapabilityChecker;
use worldhub_core::clock::Clock;
use worldhub_core::event::WorldEvent;
use worldhub_core::repository::WorldStore;
use worldhub_membership::application::query_handlers;
use worldhub_membership::domain::policy::InviteUsePolicy;
use worldhub_realtime::{ConnectionRegistry, EventFanout, WorldSequencer};

/// Default per-connection outbound frame buffer.
pub const DEFAULT_WS_SEND_BUFFER: usize = 64;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The store behind every handler.
    pub store: Arc<dyn WorldStore>,
    /// Authorization collaborator.
    pub capabilities: Arc<dyn CapabilityChecker>,
    /// Clock for timestamps and expiry checks.
    pub clock: Arc<dyn Clock>,
    /// Event fan-out over the connection registry.
    pub fanout: EventFanout,
    /// Per-world commit-then-broadcast ordering.
    pub sequencer: Arc<WorldSequencer>,
    /// Invite accounting policy.
    pub invite_policy: InviteUsePolicy,
    /// Outbound buffer size for new WebSocket connections.
    pub ws_send_buffer: usize,
}

impl AppState {
    /// Create new application state with an empty connection registry.
    #[must_use]
    pub fn new(
        store: Arc<dyn WorldStore>,
        capabilities: Arc<dyn CapabilityChecker>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            capabilities,
            clock,
            fanout: EventFanout::new(Arc::new(ConnectionRegistry::new())),
            sequencer: Arc::new(WorldSequencer::new()),
            invite_policy: InviteUsePolicy::default(),
            ws_send_buffer: DEFAULT_WS_SEND_BUFFER,
        }
    }

    /// Sets the invite accounting policy.
    #[must_use]
    pub fn with_invite_policy(mut self, policy: InviteUsePolicy) -> Self {
        self.invite_policy = policy;
        self
    }

    /// Sets the outbound buffer size for new WebSocket connections.
    #[must_use]
    pub fn with_ws_send_buffer(mut self, capacity: usize) -> Self {
        self.ws_send_buffer = capacity;
        self
    }

    /// The connection registry behind the fan-out.
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        self.fanout.registry()
    }

    /// Broadcasts `event` to its world's subscribers, if there is one.
    pub fn publish(&self, event: Option<&WorldEvent>) {
        if let Some(event) = event {
            self.fanout.broadcast(event.world_id, event);
        }
    }

    /// Broadcasts the removal of `user_id`, then drops that user's
    /// subscriptions to the world so the broadcast is the last event they
    /// receive from it.
    pub fn publish_departure(&self, world_id: Uuid, user_id: Uuid, event: Option<&WorldEvent>) {
        self.publish(event);
        let evicted = self.registry().evict_user(world_id, user_id);
        if !evicted.is_empty() {
            debug!(%world_id, %user_id, connections = evicted.len(), "evicted departed member");
        }
    }

    /// Drops the world's subscriptions held by users who are not members.
    /// Called after a world turns private so outsiders stop receiving its
    /// events. A store failure leaves the subscriptions in place.
    pub async fn evict_outsiders(&self, world_id: Uuid) {
        let users = self
            .registry()
            .snapshot(world_id)
            .into_iter()
            .map(|subscriber| subscriber.user_id);
        let outsiders =
            match query_handlers::non_members(world_id, users, self.store.as_ref()).await {
                Ok(outsiders) => outsiders,
                Err(err) => {
                    warn!(%world_id, error = %err, "could not check subscriber membership");
                    return;
                }
            };
        if outsiders.is_empty() {
            return;
        }
        let evicted = self
            .registry()
            .evict_where(world_id, |subscriber| outsiders.contains(&subscriber.user_id));
        debug!(%world_id, connections = evicted.len(), "evicted non-member subscribers");
    }
}

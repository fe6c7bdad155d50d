//! World-to-connection registry.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;
use uuid::Uuid;

use crate::connection::{Connection, ConnectionId};

/// A connection together with the user it was authenticated as.
#[derive(Debug, Clone)]
pub struct Subscriber {
    /// The live transport handle.
    pub connection: Connection,
    /// The connection's user.
    pub user_id: Uuid,
}

#[derive(Debug, Default)]
struct Subscriptions {
    by_world: HashMap<Uuid, HashMap<ConnectionId, Subscriber>>,
    world_of: HashMap<ConnectionId, Uuid>,
}

impl Subscriptions {
    fn detach(&mut self, connection_id: ConnectionId) -> Option<Uuid> {
        let world_id = self.world_of.remove(&connection_id)?;
        if let Some(connections) = self.by_world.get_mut(&world_id) {
            connections.remove(&connection_id);
            if connections.is_empty() {
                self.by_world.remove(&world_id);
            }
        }
        Some(world_id)
    }
}

/// Concurrent mapping from world id to the connections subscribed to it.
///
/// Both indexes live behind one lock, so a connection is never visible in
/// two worlds and a snapshot never sees half of a world switch. The lock is
/// held only for map updates and for cloning a snapshot; callers write to
/// connections after it is released.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    subscriptions: RwLock<Subscriptions>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Subscriptions> {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Subscriptions> {
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribes `connection` to `world_id`, moving it out of any world it
    /// was previously subscribed to. Returns that previous world.
    pub fn register(&self, connection: Connection, world_id: Uuid, user_id: Uuid) -> Option<Uuid> {
        let connection_id = connection.id();
        let mut subscriptions = self.write();
        let previous = subscriptions.detach(connection_id);
        subscriptions
            .by_world
            .entry(world_id)
            .or_default()
            .insert(
                connection_id,
                Subscriber {
                    connection,
                    user_id,
                },
            );
        subscriptions.world_of.insert(connection_id, world_id);
        drop(subscriptions);

        debug!(%connection_id, %world_id, %user_id, previous_world_id = ?previous, "connection registered");
        previous
    }

    /// Removes the connection from whatever world it is subscribed to.
    /// Unregistering an unknown or already removed connection is a no-op.
    pub fn unregister(&self, connection_id: ConnectionId) -> Option<Uuid> {
        let world_id = self.write().detach(connection_id);
        if let Some(world_id) = world_id {
            debug!(%connection_id, %world_id, "connection unregistered");
        }
        world_id
    }

    /// The connections subscribed to `world_id` at call time.
    #[must_use]
    pub fn snapshot(&self, world_id: Uuid) -> Vec<Subscriber> {
        self.read()
            .by_world
            .get(&world_id)
            .map(|connections| connections.values().cloned().collect())
            .unwrap_or_default()
    }

    /// The world a connection is subscribed to, if any.
    #[must_use]
    pub fn world_of(&self, connection_id: ConnectionId) -> Option<Uuid> {
        self.read().world_of.get(&connection_id).copied()
    }

    /// Unregisters every connection of `user_id` subscribed to `world_id`,
    /// returning the removed ids.
    pub fn evict_user(&self, world_id: Uuid, user_id: Uuid) -> Vec<ConnectionId> {
        let evicted = self.evict_where(world_id, |subscriber| subscriber.user_id == user_id);
        if !evicted.is_empty() {
            debug!(%world_id, %user_id, count = evicted.len(), "evicted user connections");
        }
        evicted
    }

    /// Unregisters every connection subscribed to `world_id` for which
    /// `predicate` holds, returning the removed ids. Selection and removal
    /// happen under one write lock.
    pub fn evict_where<F>(&self, world_id: Uuid, predicate: F) -> Vec<ConnectionId>
    where
        F: Fn(&Subscriber) -> bool,
    {
        let mut subscriptions = self.write();
        let evicted: Vec<ConnectionId> = subscriptions
            .by_world
            .get(&world_id)
            .map(|connections| {
                connections
                    .iter()
                    .filter(|(_, subscriber)| predicate(subscriber))
                    .map(|(connection_id, _)| *connection_id)
                    .collect()
            })
            .unwrap_or_default();
        for connection_id in &evicted {
            subscriptions.detach(*connection_id);
        }
        evicted
    }

    /// Number of subscribed connections across all worlds.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.read().world_of.len()
    }
}

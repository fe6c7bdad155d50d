//! Per-world ordering of commit-then-broadcast sections.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Idle lanes are pruned once the map grows past this many worlds.
const PRUNE_THRESHOLD: usize = 1024;

/// Serializes mutations of one world from store commit through broadcast, so
/// events reach subscribers in commit order. Worlds never contend with each
/// other.
#[derive(Debug, Default)]
pub struct WorldSequencer {
    lanes: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl WorldSequencer {
    /// Creates an empty sequencer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive use of `world_id`'s lane. The lane is released when
    /// the guard is dropped.
    pub async fn acquire(&self, world_id: Uuid) -> OwnedMutexGuard<()> {
        let lane = {
            let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
            if lanes.len() > PRUNE_THRESHOLD {
                lanes.retain(|_, lane| Arc::strong_count(lane) > 1);
            }
            Arc::clone(lanes.entry(world_id).or_default())
        };
        lane.lock_owned().await
    }
}

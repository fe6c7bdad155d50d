//! Best-effort event fan-out.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;
use worldhub_core::event::WorldEvent;

use crate::connection::Frame;
use crate::registry::ConnectionRegistry;

/// Outcome of one broadcast. Informational only: a failed delivery is never
/// an error for the caller.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Connections that accepted the frame.
    pub delivered: usize,
    /// Connections whose buffer was full or whose transport had closed.
    pub failed: usize,
}

/// Pushes events to the connections subscribed to a world.
///
/// There is no acknowledgment, retry, queue, or persistence. A connection
/// that is not in the registry at broadcast time never sees the event, and a
/// connection that fails a write is left for the transport layer to reap.
/// Clients must treat `revision` gaps and `forceReload` as the source of
/// truth.
#[derive(Debug, Clone)]
pub struct EventFanout {
    registry: Arc<ConnectionRegistry>,
}

impl EventFanout {
    /// Creates a fan-out over `registry`.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this fan-out reads from.
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Delivers `event` to every connection subscribed to `world_id` at call
    /// time.
    pub fn broadcast(&self, world_id: Uuid, event: &WorldEvent) -> DeliveryReport {
        let frame: Frame = match serde_json::to_string(event) {
            Ok(json) => Arc::from(json),
            Err(err) => {
                warn!(%world_id, event_type = %event.event_type, error = %err, "event serialization failed");
                return DeliveryReport::default();
            }
        };

        let mut report = DeliveryReport::default();
        for subscriber in self.registry.snapshot(world_id) {
            match subscriber.connection.try_send(Arc::clone(&frame)) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        %world_id,
                        connection_id = %subscriber.connection.id(),
                        user_id = %subscriber.user_id,
                        event_type = %event.event_type,
                        error = %err,
                        "event delivery failed"
                    );
                }
            }
        }

        debug!(
            %world_id,
            event_type = %event.event_type,
            delivered = report.delivered,
            failed = report.failed,
            "event broadcast"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;
    use worldhub_core::event::{KeywordChange, KeywordOperation};

    fn reorder_event(world_id: Uuid, revision: i64) -> WorldEvent {
        WorldEvent::keywords_changed(
            world_id,
            KeywordChange {
                operation: KeywordOperation::Reordered,
                revision,
                version: 0,
                keyword_ids: vec![],
                keywords: vec![],
                deleted_ids: vec![],
            },
            0,
        )
    }

    #[test]
    fn test_broadcast_reaches_every_subscriber_of_the_world_only() {
        // Arrange
        let registry = Arc::new(ConnectionRegistry::new());
        let fanout = EventFanout::new(Arc::clone(&registry));
        let world_id = Uuid::new_v4();
        let (a, mut rx_a) = Connection::channel(4);
        let (b, mut rx_b) = Connection::channel(4);
        let (elsewhere, mut rx_elsewhere) = Connection::channel(4);
        registry.register(a, world_id, Uuid::new_v4());
        registry.register(b, world_id, Uuid::new_v4());
        registry.register(elsewhere, Uuid::new_v4(), Uuid::new_v4());

        // Act
        let report = fanout.broadcast(world_id, &reorder_event(world_id, 3));

        // Assert
        assert_eq!(report, DeliveryReport { delivered: 2, failed: 0 });
        for rx in [&mut rx_a, &mut rx_b] {
            let frame = rx.try_recv().unwrap();
            let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
            assert_eq!(json["revision"], 3);
            assert_eq!(json["forceReload"], true);
        }
        assert!(rx_elsewhere.try_recv().is_err());
    }

    #[test]
    fn test_closed_connection_does_not_abort_remaining_deliveries() {
        // Arrange
        let registry = Arc::new(ConnectionRegistry::new());
        let fanout = EventFanout::new(Arc::clone(&registry));
        let world_id = Uuid::new_v4();
        let (gone, rx_gone) = Connection::channel(4);
        let (alive, mut rx_alive) = Connection::channel(4);
        registry.register(gone, world_id, Uuid::new_v4());
        registry.register(alive, world_id, Uuid::new_v4());
        drop(rx_gone);

        // Act
        let report = fanout.broadcast(world_id, &reorder_event(world_id, 1));

        // Assert
        assert_eq!(report, DeliveryReport { delivered: 1, failed: 1 });
        assert!(rx_alive.try_recv().is_ok());
        assert_eq!(registry.snapshot(world_id).len(), 2);
    }

    #[test]
    fn test_full_buffer_counts_as_failed_delivery() {
        let registry = Arc::new(ConnectionRegistry::new());
        let fanout = EventFanout::new(Arc::clone(&registry));
        let world_id = Uuid::new_v4();
        let (slow, _rx) = Connection::channel(1);
        registry.register(slow, world_id, Uuid::new_v4());

        let first = fanout.broadcast(world_id, &reorder_event(world_id, 1));
        let second = fanout.broadcast(world_id, &reorder_event(world_id, 2));

        assert_eq!(first.delivered, 1);
        assert_eq!(second, DeliveryReport { delivered: 0, failed: 1 });
    }

    #[test]
    fn test_unregistered_connection_never_receives() {
        let registry = Arc::new(ConnectionRegistry::new());
        let fanout = EventFanout::new(Arc::clone(&registry));
        let world_id = Uuid::new_v4();
        let (connection, mut rx) = Connection::channel(4);
        let connection_id = connection.id();
        registry.register(connection, world_id, Uuid::new_v4());
        registry.unregister(connection_id);

        let report = fanout.broadcast(world_id, &reorder_event(world_id, 1));

        assert_eq!(report, DeliveryReport::default());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_frames_arrive_in_broadcast_order() {
        let registry = Arc::new(ConnectionRegistry::new());
        let fanout = EventFanout::new(Arc::clone(&registry));
        let world_id = Uuid::new_v4();
        let (connection, mut rx) = Connection::channel(8);
        registry.register(connection, world_id, Uuid::new_v4());

        for revision in 1..=5 {
            fanout.broadcast(world_id, &reorder_event(world_id, revision));
        }

        let revisions: Vec<i64> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|frame| {
                let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
                json["revision"].as_i64().unwrap()
            })
            .collect();
        assert_eq!(revisions, vec![1, 2, 3, 4, 5]);
    }
}

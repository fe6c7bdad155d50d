//! Connection handles.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// A serialized event, shared between every recipient of one broadcast.
pub type Frame = Arc<str>;

/// Process-unique identifier of a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Allocates a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Why a frame could not be handed to a connection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The connection's outbound buffer is full; the peer is not draining.
    #[error("outbound buffer full")]
    Full,
    /// The transport task has gone away.
    #[error("connection closed")]
    Closed,
}

/// Outbound half of a live client transport.
///
/// The socket writer runs in the transport's own task and drains the paired
/// receiver; pushing a frame never blocks.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    outbound: mpsc::Sender<Frame>,
}

impl Connection {
    /// Creates a connection whose frames are buffered up to `capacity` and
    /// returns the receiver the transport task must drain.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (outbound, inbound) = mpsc::channel(capacity.max(1));
        (
            Self {
                id: ConnectionId::new(),
                outbound,
            },
            inbound,
        )
    }

    /// The connection's identifier.
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Best-effort, non-blocking write.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Full` if the buffer is full and
    /// `DeliveryError::Closed` if the transport task has dropped its receiver.
    pub fn try_send(&self, frame: Frame) -> Result<(), DeliveryError> {
        self.outbound.try_send(frame).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

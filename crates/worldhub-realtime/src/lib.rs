//! Worldhub: live connection registry and event fan-out.
//!
//! The registry is the only in-memory shared structure of the service. It is
//! an explicit object owned by the transport layer and injected into
//! [`EventFanout`]; nothing here is a process global.

pub mod connection;
pub mod fanout;
pub mod registry;
pub mod sequencer;

pub use connection::{Connection, ConnectionId, DeliveryError, Frame};
pub use fanout::{DeliveryReport, EventFanout};
pub use registry::{ConnectionRegistry, Subscriber};
pub use sequencer::WorldSequencer;

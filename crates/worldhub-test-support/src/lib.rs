//! Shared test doubles and fixtures for Worldhub.

mod capability;
mod clock;
mod fixtures;
mod store;

pub use capability::StaticCapabilities;
pub use clock::{FixedClock, fixed_now};
pub use fixtures::{seed_invite, seed_keyword, seed_world};
pub use store::{FailingWorldStore, InMemoryWorldStore};

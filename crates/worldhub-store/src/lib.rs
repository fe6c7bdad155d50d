//! Worldhub: PostgreSQL store.
//!
//! Implements every repository trait of `worldhub-core` over a `sqlx`
//! connection pool. Conditional updates carry their guard in the `WHERE`
//! clause so concurrent callers never need a retry loop.

pub mod pg_world_store;
pub mod schema;

pub use pg_world_store::PgWorldStore;

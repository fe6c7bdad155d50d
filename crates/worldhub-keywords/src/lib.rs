//! Worldhub: keyword list mutations.
//!
//! Every mutation commits its row writes together with a bump of the world's
//! keyword revision and returns the `world.keywords_changed` event stamped
//! with that revision. Callers broadcast the event while still holding the
//! world's sequencing guard so subscribers observe commit order.

pub mod application;
pub mod domain;

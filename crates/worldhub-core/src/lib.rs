//! Worldhub Core: shared domain model and collaborator seams.
//!
//! This crate defines the entities, error taxonomy, event envelope, and the
//! traits through which the membership, keyword, and realtime crates reach
//! the persistence engine and the authorization engine. It contains no
//! infrastructure code.

pub mod capability;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod model;
pub mod repository;

//! Worldhub: invite ledger and membership registry.
//!
//! Responsible for admitting users through invites, the membership roster
//! and its role invariants, invite administration, and world settings.
//! Handlers return the event describing their effect; broadcasting it is the
//! caller's job.

pub mod application;
pub mod domain;

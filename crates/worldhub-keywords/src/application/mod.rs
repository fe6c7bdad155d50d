//! Command and query handlers of the keyword context.

pub mod command_handlers;
pub mod query_handlers;

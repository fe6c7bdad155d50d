//! Domain layer for the keyword context.

pub mod commands;
pub mod validation;

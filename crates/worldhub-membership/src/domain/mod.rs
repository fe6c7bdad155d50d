//! Commands and policies of the membership context.

pub mod commands;
pub mod policy;

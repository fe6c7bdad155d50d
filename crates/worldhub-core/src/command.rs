//! Command abstractions.

/// Trait that all commands implement.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging).
    fn command_type(&self) -> &'static str;

    /// Caller-supplied request identifier, echoed on the events the command
    /// produces so a client can match its own mutation.
    fn request_id(&self) -> Option<&str>;
}

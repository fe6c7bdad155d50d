//! Invite accounting policy.

use serde::{Deserialize, Serialize};

/// Whether an invite consumed by someone who is already a member counts
/// against the invite's `max_use`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteUsePolicy {
    /// Only consumptions that create a membership row are counted. A joined
    /// member re-opening the link is a no-op.
    #[default]
    FirstJoinOnly,
    /// Every successful consumption is counted, including repeats by a
    /// joined member. Repeats never create a row and fail once the cap is
    /// reached.
    EveryConsumption,
}

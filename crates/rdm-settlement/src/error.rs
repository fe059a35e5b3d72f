// error.rs — Error types for outcome evaluation and distribution.

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while turning evidence into a settlement.
#[derive(Debug, Error)]
pub enum SettlementError {
    /// The evidence package has no usable completion percentage.
    #[error("missing completion percentage in evidence for goal {goal_id}")]
    MissingEvidence { goal_id: Uuid },

    /// A computed distribution does not conserve the pledge.
    ///
    /// This is a defect, not an input problem. It must never be committed.
    #[error(
        "distribution invariant violated for goal {goal_id}: reward {reward} + remorse {remorse} != pledge {pledge}"
    )]
    InvariantViolation {
        goal_id: Uuid,
        pledge: u64,
        reward: u64,
        remorse: u64,
    },
}

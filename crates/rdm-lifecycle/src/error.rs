// error.rs — Error types for the lifecycle controller.
//
// Lower-level errors from the goal store, reflection log, ledger and
// settlement pipeline are folded into the kinds a transport layer acts on:
// validation errors fail fast, Retryable means "run the same request
// again", and InvariantViolation is a defect that must never be committed.

use std::fmt;

use chrono::{DateTime, Utc};
use rdm_goal::GoalError;
use rdm_ledger::LedgerError;
use rdm_settlement::SettlementError;
use thiserror::Error;
use uuid::Uuid;

/// Coarse classification of a [`LifecycleError`], for mapping to status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidPledge,
    InvalidDuration,
    StaleReflection,
    AlreadyClaimed,
    MissingEvidence,
    GoalExpired,
    NotFound,
    InvalidTransition,
    Config,
    Retryable,
    LedgerIntegrity,
    InvariantViolation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidPledge => "invalid_pledge",
            ErrorKind::InvalidDuration => "invalid_duration",
            ErrorKind::StaleReflection => "stale_reflection",
            ErrorKind::AlreadyClaimed => "already_claimed",
            ErrorKind::MissingEvidence => "missing_evidence",
            ErrorKind::GoalExpired => "goal_expired",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::Config => "config",
            ErrorKind::Retryable => "retryable",
            ErrorKind::LedgerIntegrity => "ledger_integrity",
            ErrorKind::InvariantViolation => "invariant_violation",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Pledge amount outside the configured bounds.
    #[error("invalid pledge {amount}: must be between {min} and {max}")]
    InvalidPledge { amount: u64, min: u64, max: u64 },

    /// Goal duration too long to produce a deadline.
    #[error("invalid duration: {days} days is out of range")]
    InvalidDuration { days: u32 },

    /// Out-of-order or duplicate reflection sequence number.
    #[error("stale reflection for goal {goal_id}: expected sequence {expected}, got {got}")]
    StaleReflection { goal_id: Uuid, expected: u64, got: u64 },

    /// A completion claim was already accepted for this goal.
    #[error("goal {goal_id} already claimed (state: {state})")]
    AlreadyClaimed { goal_id: Uuid, state: String },

    /// Evidence lacks a usable completion percentage.
    #[error("missing completion percentage in evidence for goal {goal_id}")]
    MissingEvidence { goal_id: Uuid },

    /// The deadline passed before the request arrived; the goal has been
    /// settled as expired.
    #[error("goal {goal_id} expired at {deadline}")]
    GoalExpired {
        goal_id: Uuid,
        deadline: DateTime<Utc>,
    },

    #[error("goal not found: {0}")]
    NotFound(Uuid),

    #[error("invalid transition from {from} to {to} for goal {goal_id}")]
    InvalidTransition {
        goal_id: Uuid,
        from: String,
        to: String,
    },

    #[error("invalid config at {path}: {detail}")]
    Config { path: String, detail: String },

    /// Transient store, ledger or lock failure. Safe to retry the request.
    #[error("retryable: {reason}")]
    Retryable { reason: String },

    /// A goal's ledger failed its hash-chain or sequence check.
    #[error("ledger integrity violation for goal {goal_id}: {detail}")]
    LedgerIntegrity { goal_id: Uuid, detail: String },

    /// A distribution does not conserve the pledge. Fatal.
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

impl LifecycleError {
    pub fn retryable(reason: impl fmt::Display) -> Self {
        LifecycleError::Retryable {
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::InvalidPledge { .. } => ErrorKind::InvalidPledge,
            LifecycleError::InvalidDuration { .. } => ErrorKind::InvalidDuration,
            LifecycleError::StaleReflection { .. } => ErrorKind::StaleReflection,
            LifecycleError::AlreadyClaimed { .. } => ErrorKind::AlreadyClaimed,
            LifecycleError::MissingEvidence { .. } => ErrorKind::MissingEvidence,
            LifecycleError::GoalExpired { .. } => ErrorKind::GoalExpired,
            LifecycleError::NotFound(_) => ErrorKind::NotFound,
            LifecycleError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            LifecycleError::Config { .. } => ErrorKind::Config,
            LifecycleError::Retryable { .. } => ErrorKind::Retryable,
            LifecycleError::LedgerIntegrity { .. } => ErrorKind::LedgerIntegrity,
            LifecycleError::InvariantViolation { .. } => ErrorKind::InvariantViolation,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Retryable
    }

    /// Defects that must abort and alert rather than be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvariantViolation | ErrorKind::LedgerIntegrity
        )
    }
}

impl From<GoalError> for LifecycleError {
    fn from(err: GoalError) -> Self {
        match err {
            GoalError::NotFound(id) => LifecycleError::NotFound(id),
            GoalError::InvalidDuration { days } => LifecycleError::InvalidDuration { days },
            GoalError::InvalidTransition { goal_id, from, to } => {
                LifecycleError::InvalidTransition { goal_id, from, to }
            }
            GoalError::StaleSequence {
                goal_id,
                expected,
                got,
            } => LifecycleError::StaleReflection {
                goal_id,
                expected,
                got,
            },
            other @ (GoalError::IoError { .. }
            | GoalError::SerializationError(_)
            | GoalError::AlreadyExists(_)
            | GoalError::VersionConflict { .. }
            | GoalError::NotificationError(_)) => LifecycleError::retryable(other),
        }
    }
}

impl From<LedgerError> for LifecycleError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::IntegrityViolation {
                goal_id,
                line,
                detail,
            } => LifecycleError::LedgerIntegrity {
                goal_id,
                detail: format!("line {}: {}", line, detail),
            },
            other => LifecycleError::retryable(other),
        }
    }
}

impl From<SettlementError> for LifecycleError {
    fn from(err: SettlementError) -> Self {
        match err {
            SettlementError::MissingEvidence { goal_id } => {
                LifecycleError::MissingEvidence { goal_id }
            }
            SettlementError::InvariantViolation {
                goal_id,
                pledge,
                reward,
                remorse,
            } => {
                tracing::error!(
                    %goal_id,
                    pledge,
                    reward,
                    remorse,
                    "distribution invariant violated; settlement aborted"
                );
                LifecycleError::InvariantViolation {
                    goal_id,
                    pledge,
                    reward,
                    remorse,
                }
            }
        }
    }
}

impl From<serde_json::Error> for LifecycleError {
    fn from(err: serde_json::Error) -> Self {
        LifecycleError::retryable(format!("serialization error: {}", err))
    }
}

/// Failure reported by a [`PaymentProvider`](crate::payment::PaymentProvider).
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment provider unavailable: {0}")]
    Unavailable(String),

    #[error("transfer rejected: {0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_conflict_is_retryable() {
        let err: LifecycleError = GoalError::VersionConflict {
            goal_id: Uuid::new_v4(),
            expected: 1,
            actual: 2,
        }
        .into();
        assert!(err.is_retryable());
        assert!(!err.is_fatal());
    }

    #[test]
    fn stale_sequence_maps_to_stale_reflection() {
        let err: LifecycleError = GoalError::StaleSequence {
            goal_id: Uuid::new_v4(),
            expected: 2,
            got: 3,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::StaleReflection);
    }

    #[test]
    fn invariant_violation_is_fatal() {
        let err: LifecycleError = SettlementError::InvariantViolation {
            goal_id: Uuid::new_v4(),
            pledge: 100,
            reward: 60,
            remorse: 41,
        }
        .into();
        assert!(err.is_fatal());
        assert!(!err.is_retryable());
        assert_eq!(err.kind().to_string(), "invariant_violation");
    }

    #[test]
    fn ledger_integrity_is_fatal_and_io_is_retryable() {
        let goal_id = Uuid::new_v4();
        let err: LifecycleError = LedgerError::IntegrityViolation {
            goal_id,
            line: 3,
            detail: "bad hash".into(),
        }
        .into();
        assert!(err.is_fatal());

        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "disk slow");
        let err: LifecycleError = LedgerError::WriteFailed(io).into();
        assert!(err.is_retryable());
    }

    #[test]
    fn invalid_duration_is_a_validation_error() {
        let err: LifecycleError = GoalError::InvalidDuration { days: u32::MAX }.into();
        assert_eq!(err.kind(), ErrorKind::InvalidDuration);
        assert!(!err.is_retryable());
        assert!(!err.is_fatal());
    }
}

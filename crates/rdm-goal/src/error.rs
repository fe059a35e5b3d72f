// error.rs — Error types for goal records, stores and reflection logs.

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during goal storage and lifecycle operations.
#[derive(Debug, Error)]
pub enum GoalError {
    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    /// Failed to serialize/deserialize goal data.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The requested goal was not found.
    #[error("goal not found: {0}")]
    NotFound(Uuid),

    /// A goal with this ID already exists.
    #[error("goal already exists: {0}")]
    AlreadyExists(Uuid),

    /// Invalid state transition.
    #[error("invalid transition from {from} to {to} for goal {goal_id}")]
    InvalidTransition {
        goal_id: Uuid,
        from: String,
        to: String,
    },

    /// The goal's duration pushes its deadline past the supported calendar.
    #[error("invalid duration: {days} days is out of range")]
    InvalidDuration { days: u32 },

    /// Compare-and-set lost: the stored record changed since it was read.
    #[error("version conflict for goal {goal_id}: expected {expected}, found {actual}")]
    VersionConflict {
        goal_id: Uuid,
        expected: u64,
        actual: u64,
    },

    /// A reflection arrived with a sequence number other than the next one.
    #[error("stale reflection for goal {goal_id}: expected sequence {expected}, got {got}")]
    StaleSequence { goal_id: Uuid, expected: u64, got: u64 },

    /// A notification dispatch failed (non-fatal).
    #[error("notification error: {0}")]
    NotificationError(String),
}

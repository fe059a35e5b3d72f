// error.rs — Error types for the settlement ledger.

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while writing or reading a goal's ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Failed to open or create a ledger file.
    #[error("failed to open ledger at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to append an entry.
    #[error("failed to append ledger entry: {0}")]
    WriteFailed(#[from] std::io::Error),

    /// An entry could not be serialized or a stored line is malformed.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A terminal event type was passed to `append`.
    #[error("{event_type} is terminal and must be written with record_terminal")]
    TerminalViaAppend { event_type: String },

    /// A non-terminal event type was passed to `record_terminal`.
    #[error("{event_type} is not a terminal event")]
    NotTerminal { event_type: String },

    /// The hash chain or sequence of a goal's ledger is broken.
    #[error("ledger integrity check failed for goal {goal_id} at line {line}: {detail}")]
    IntegrityViolation {
        goal_id: Uuid,
        line: usize,
        detail: String,
    },
}

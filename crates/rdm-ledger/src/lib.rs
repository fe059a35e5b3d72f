//! # rdm-ledger
//!
//! Append-only settlement ledger for RDM goals.
//!
//! Every lifecycle transition and the final distribution are recorded as
//! [`LedgerEntry`] lines in a per-goal JSONL file. Entries carry a strictly
//! increasing per-goal sequence number and the SHA-256 of the previous
//! line, so ordering and integrity are externally verifiable.
//!
//! ```rust,no_run
//! use chrono::Utc;
//! use rdm_ledger::{LedgerEventType, LedgerRecorder};
//! use uuid::Uuid;
//!
//! let ledger = LedgerRecorder::open("/tmp/rdm-ledger").unwrap();
//! let goal_id = Uuid::new_v4();
//! ledger
//!     .append(goal_id, LedgerEventType::GoalCreated, serde_json::json!({}), Utc::now())
//!     .unwrap();
//! let write = ledger
//!     .record_terminal(goal_id, LedgerEventType::Verified, serde_json::json!({}), Utc::now())
//!     .unwrap();
//! assert!(write.created);
//! ```

pub mod entry;
pub mod error;
pub mod hasher;
pub mod recorder;

pub use entry::{LedgerEntry, LedgerEventType};
pub use error::LedgerError;
pub use recorder::{LedgerRecorder, LedgerWrite};

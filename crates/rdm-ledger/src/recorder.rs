// recorder.rs — LedgerRecorder: per-goal append-only JSONL ledger.
//
// Each goal has its own file: `<ledger_dir>/<goal_id>.jsonl`. Every line is
// one LedgerEntry whose `previous_hash` is the SHA-256 of the line before
// it, so inserting, deleting or editing a line breaks the chain.
//
// The terminal entry (Verified or ExpiredFailed) is written at most once.
// `record_terminal` checks for an existing terminal entry and writes a new
// one under the same per-goal lock, making the check-and-write a single
// compare-and-set keyed on "goal has no terminal entry yet". A second call
// returns the entry already on disk instead of writing another.
//
// `record_once` does the same for lifecycle steps that happen once per goal
// (pledge, activation, claim, payment), keyed on the event type. The
// controller writes these before committing the goal record, so a retry
// after a failed commit finds the entry instead of duplicating it.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entry::{LedgerEntry, LedgerEventType};
use crate::error::LedgerError;
use crate::hasher;

/// Number of lock stripes. Goals hash onto stripes, so writes for
/// different goals rarely contend and there is no single global lock.
const LOCK_STRIPES: usize = 64;

/// Outcome of [`LedgerRecorder::record_terminal`] and
/// [`LedgerRecorder::record_once`].
#[derive(Debug, Clone)]
pub struct LedgerWrite {
    pub entry: LedgerEntry,
    /// `false` if a matching entry already existed and was returned as-is.
    pub created: bool,
}

/// Where the tail of a goal's ledger currently stands.
struct LedgerTail {
    last_hash: Option<String>,
    last_sequence: u64,
    terminal: Option<LedgerEntry>,
    entries: Vec<LedgerEntry>,
}

impl LedgerTail {
    fn first_of(&self, event_type: LedgerEventType) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| e.event_type == event_type)
    }
}

pub struct LedgerRecorder {
    dir: PathBuf,
    stripes: Vec<Mutex<()>>,
}

impl LedgerRecorder {
    /// Open (or create) a ledger directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| LedgerError::OpenFailed {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            stripes: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path to the ledger file for a goal.
    pub fn path_for(&self, goal_id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.jsonl", goal_id))
    }

    /// Append a non-terminal entry.
    pub fn append(
        &self,
        goal_id: Uuid,
        event_type: LedgerEventType,
        payload: serde_json::Value,
        timestamp: DateTime<Utc>,
    ) -> Result<LedgerEntry, LedgerError> {
        if event_type.is_terminal() {
            return Err(LedgerError::TerminalViaAppend {
                event_type: event_type.to_string(),
            });
        }
        let _guard = self.lock(goal_id);
        let tail = self.read_tail(goal_id)?;
        self.write_entry(goal_id, &tail, event_type, payload, timestamp)
    }

    /// Write the terminal entry for a goal, or return the one already there.
    pub fn record_terminal(
        &self,
        goal_id: Uuid,
        event_type: LedgerEventType,
        payload: serde_json::Value,
        timestamp: DateTime<Utc>,
    ) -> Result<LedgerWrite, LedgerError> {
        if !event_type.is_terminal() {
            return Err(LedgerError::NotTerminal {
                event_type: event_type.to_string(),
            });
        }
        let _guard = self.lock(goal_id);
        let tail = self.read_tail(goal_id)?;

        if let Some(existing) = tail.terminal {
            tracing::debug!(
                %goal_id,
                existing = %existing.event_type,
                requested = %event_type,
                "terminal ledger entry already present"
            );
            return Ok(LedgerWrite {
                entry: existing,
                created: false,
            });
        }

        let entry = self.write_entry(goal_id, &tail, event_type, payload, timestamp)?;
        tracing::info!(%goal_id, event = %event_type, sequence = entry.sequence, "terminal ledger entry written");
        Ok(LedgerWrite {
            entry,
            created: true,
        })
    }

    /// Write a non-terminal entry unless the goal already has one of this
    /// type, in which case the existing entry is returned unchanged.
    pub fn record_once(
        &self,
        goal_id: Uuid,
        event_type: LedgerEventType,
        payload: serde_json::Value,
        timestamp: DateTime<Utc>,
    ) -> Result<LedgerWrite, LedgerError> {
        if event_type.is_terminal() {
            return Err(LedgerError::TerminalViaAppend {
                event_type: event_type.to_string(),
            });
        }
        let _guard = self.lock(goal_id);
        let tail = self.read_tail(goal_id)?;

        if let Some(existing) = tail.first_of(event_type) {
            tracing::debug!(%goal_id, event = %event_type, sequence = existing.sequence, "ledger entry already present");
            return Ok(LedgerWrite {
                entry: existing.clone(),
                created: false,
            });
        }

        let entry = self.write_entry(goal_id, &tail, event_type, payload, timestamp)?;
        Ok(LedgerWrite {
            entry,
            created: true,
        })
    }

    /// All entries for a goal, oldest first. Empty if nothing was recorded.
    pub fn entries(&self, goal_id: Uuid) -> Result<Vec<LedgerEntry>, LedgerError> {
        let path = self.path_for(goal_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for line in Self::lines(&path)? {
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }

    /// The terminal entry for a goal, if it has been settled.
    pub fn terminal(&self, goal_id: Uuid) -> Result<Option<LedgerEntry>, LedgerError> {
        Ok(self.read_tail(goal_id)?.terminal)
    }

    /// The first entry of the given type for a goal.
    pub fn find(
        &self,
        goal_id: Uuid,
        event_type: LedgerEventType,
    ) -> Result<Option<LedgerEntry>, LedgerError> {
        Ok(self.read_tail(goal_id)?.first_of(event_type).cloned())
    }

    /// Verify a goal's ledger: hash chain intact, sequence gapless from 1,
    /// every entry for this goal, at most one terminal entry.
    ///
    /// The first broken line is reported as `IntegrityViolation`.
    pub fn verify_chain(&self, goal_id: Uuid) -> Result<(), LedgerError> {
        let path = self.path_for(goal_id);
        if !path.exists() {
            return Ok(());
        }
        let mut previous_hash: Option<String> = None;
        let mut terminal_seen = false;

        for (index, line) in Self::lines(&path)?.into_iter().enumerate() {
            let line_no = index + 1;
            let entry: LedgerEntry = serde_json::from_str(&line)?;
            let violation = |detail: String| LedgerError::IntegrityViolation {
                goal_id,
                line: line_no,
                detail,
            };

            if entry.previous_hash != previous_hash {
                return Err(violation(format!(
                    "expected previous hash {}, got {}",
                    previous_hash.as_deref().unwrap_or("None"),
                    entry.previous_hash.as_deref().unwrap_or("None")
                )));
            }
            if entry.sequence != line_no as u64 {
                return Err(violation(format!(
                    "expected sequence {}, got {}",
                    line_no, entry.sequence
                )));
            }
            if entry.goal_id != goal_id {
                return Err(violation(format!("entry belongs to goal {}", entry.goal_id)));
            }
            if entry.event_type.is_terminal() {
                if terminal_seen {
                    return Err(violation("second terminal entry".to_string()));
                }
                terminal_seen = true;
            }

            // Hash the raw line, not a re-serialization, so field order
            // differences can't mask tampering.
            previous_hash = Some(hasher::hash_str(&line));
        }

        Ok(())
    }

    fn lock(&self, goal_id: Uuid) -> MutexGuard<'_, ()> {
        let stripe = (goal_id.as_u128() % LOCK_STRIPES as u128) as usize;
        // The guarded data is `()`, so a poisoned stripe carries no broken state.
        self.stripes[stripe]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn read_tail(&self, goal_id: Uuid) -> Result<LedgerTail, LedgerError> {
        let path = self.path_for(goal_id);
        let mut tail = LedgerTail {
            last_hash: None,
            last_sequence: 0,
            terminal: None,
            entries: Vec::new(),
        };
        if !path.exists() {
            return Ok(tail);
        }
        for line in Self::lines(&path)? {
            let entry: LedgerEntry = serde_json::from_str(&line)?;
            tail.last_sequence = entry.sequence;
            tail.last_hash = Some(hasher::hash_str(&line));
            if entry.event_type.is_terminal() && tail.terminal.is_none() {
                tail.terminal = Some(entry.clone());
            }
            tail.entries.push(entry);
        }
        Ok(tail)
    }

    fn write_entry(
        &self,
        goal_id: Uuid,
        tail: &LedgerTail,
        event_type: LedgerEventType,
        payload: serde_json::Value,
        timestamp: DateTime<Utc>,
    ) -> Result<LedgerEntry, LedgerError> {
        let entry = LedgerEntry {
            entry_id: Uuid::new_v4(),
            goal_id,
            sequence: tail.last_sequence + 1,
            event_type,
            payload,
            timestamp,
            previous_hash: tail.last_hash.clone(),
        };
        let json = serde_json::to_string(&entry)?;

        let path = self.path_for(goal_id);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| LedgerError::OpenFailed {
                path: path.clone(),
                source,
            })?;
        writeln!(file, "{}", json)?;
        file.sync_data()?;

        Ok(entry)
    }

    /// Non-blank lines of a ledger file.
    fn lines(path: &Path) -> Result<Vec<String>, LedgerError> {
        let file = File::open(path).map_err(|source| LedgerError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let mut lines = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if !line.trim().is_empty() {
                lines.push(line);
            }
        }
        Ok(lines)
    }
}

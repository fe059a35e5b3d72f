// reflection.rs — ReflectionLog: ordered check-ins per goal.
//
// Each goal's reflections live in `<reflections_dir>/<goal_id>.jsonl`, one
// ReflectionEntry per line. Sequence numbers start at 1 and are gapless:
// an append must carry exactly `last + 1` or it is rejected as stale.
// Entries are never rewritten.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rdm_settlement::ReflectionStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GoalError;

const LOCK_STRIPES: usize = 64;

/// One check-in against a goal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReflectionEntry {
    pub goal_id: Uuid,
    pub sequence: u64,
    pub status: ReflectionStatus,
    /// Free text, opaque to settlement.
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub challenges: String,
    pub recorded_at: DateTime<Utc>,
}

/// A check-in as submitted by a caller, before it is stamped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflectionSubmission {
    pub sequence: u64,
    pub status: ReflectionStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub challenges: String,
}

impl ReflectionSubmission {
    pub fn new(sequence: u64, status: ReflectionStatus) -> Self {
        Self {
            sequence,
            status,
            notes: String::new(),
            challenges: String::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_challenges(mut self, challenges: impl Into<String>) -> Self {
        self.challenges = challenges.into();
        self
    }
}

pub struct ReflectionLog {
    dir: PathBuf,
    stripes: Vec<Mutex<()>>,
}

impl ReflectionLog {
    /// Open (or create) a reflections directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, GoalError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| GoalError::IoError {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(Self {
            dir,
            stripes: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        })
    }

    fn path_for(&self, goal_id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.jsonl", goal_id))
    }

    fn lock(&self, goal_id: Uuid) -> MutexGuard<'_, ()> {
        let stripe = (goal_id.as_u128() % LOCK_STRIPES as u128) as usize;
        self.stripes[stripe]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a reflection. The submission's sequence must be exactly one
    /// past the last recorded entry.
    pub fn append(
        &self,
        goal_id: Uuid,
        submission: ReflectionSubmission,
        recorded_at: DateTime<Utc>,
    ) -> Result<ReflectionEntry, GoalError> {
        let _guard = self.lock(goal_id);
        let expected = self.next_sequence(goal_id)?;
        if submission.sequence != expected {
            return Err(GoalError::StaleSequence {
                goal_id,
                expected,
                got: submission.sequence,
            });
        }

        let entry = ReflectionEntry {
            goal_id,
            sequence: submission.sequence,
            status: submission.status,
            notes: submission.notes,
            challenges: submission.challenges,
            recorded_at,
        };
        let json = serde_json::to_string(&entry)?;
        let path = self.path_for(goal_id);
        let io_err = |source| GoalError::IoError {
            path: path.display().to_string(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;
        writeln!(file, "{}", json).map_err(io_err)?;
        file.sync_data().map_err(io_err)?;

        tracing::debug!(%goal_id, sequence = entry.sequence, "reflection appended");
        Ok(entry)
    }

    /// All reflections for a goal in sequence order.
    pub fn list(&self, goal_id: Uuid) -> Result<Vec<ReflectionEntry>, GoalError> {
        let path = self.path_for(goal_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&path).map_err(|source| GoalError::IoError {
            path: path.display().to_string(),
            source,
        })?;
        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|source| GoalError::IoError {
                path: path.display().to_string(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }

    /// Reflection statuses in order, as the evaluator consumes them.
    pub fn statuses(&self, goal_id: Uuid) -> Result<Vec<ReflectionStatus>, GoalError> {
        Ok(self.list(goal_id)?.into_iter().map(|e| e.status).collect())
    }

    pub fn last(&self, goal_id: Uuid) -> Result<Option<ReflectionEntry>, GoalError> {
        Ok(self.list(goal_id)?.pop())
    }

    pub fn count(&self, goal_id: Uuid) -> Result<u64, GoalError> {
        Ok(self.last(goal_id)?.map_or(0, |e| e.sequence))
    }

    /// The sequence number the next append must carry.
    pub fn next_sequence(&self, goal_id: Uuid) -> Result<u64, GoalError> {
        Ok(self.count(goal_id)? + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    fn submit(seq: u64) -> ReflectionSubmission {
        ReflectionSubmission::new(seq, ReflectionStatus::InProgress).with_notes("day done")
    }

    #[test]
    fn sequential_appends_succeed() {
        let dir = tempdir().unwrap();
        let log = ReflectionLog::open(dir.path()).unwrap();
        let goal = Uuid::new_v4();

        for seq in 1..=3 {
            let entry = log.append(goal, submit(seq), Utc::now()).unwrap();
            assert_eq!(entry.sequence, seq);
        }
        assert_eq!(log.count(goal).unwrap(), 3);
        assert_eq!(log.next_sequence(goal).unwrap(), 4);
        assert_eq!(log.list(goal).unwrap().len(), 3);
    }

    #[test]
    fn gap_is_rejected() {
        let dir = tempdir().unwrap();
        let log = ReflectionLog::open(dir.path()).unwrap();
        let goal = Uuid::new_v4();

        log.append(goal, submit(1), Utc::now()).unwrap();
        let result = log.append(goal, submit(3), Utc::now());
        assert!(matches!(
            result,
            Err(GoalError::StaleSequence {
                expected: 2,
                got: 3,
                ..
            })
        ));
        assert_eq!(log.count(goal).unwrap(), 1);
    }

    #[test]
    fn duplicate_is_rejected() {
        let dir = tempdir().unwrap();
        let log = ReflectionLog::open(dir.path()).unwrap();
        let goal = Uuid::new_v4();

        log.append(goal, submit(1), Utc::now()).unwrap();
        log.append(goal, submit(2), Utc::now()).unwrap();
        let result = log.append(goal, submit(2), Utc::now());
        assert!(matches!(result, Err(GoalError::StaleSequence { .. })));
        assert_eq!(log.count(goal).unwrap(), 2);
    }

    #[test]
    fn first_entry_must_be_one() {
        let dir = tempdir().unwrap();
        let log = ReflectionLog::open(dir.path()).unwrap();
        let result = log.append(Uuid::new_v4(), submit(0), Utc::now());
        assert!(matches!(
            result,
            Err(GoalError::StaleSequence { expected: 1, .. })
        ));
    }

    #[test]
    fn last_and_statuses() {
        let dir = tempdir().unwrap();
        let log = ReflectionLog::open(dir.path()).unwrap();
        let goal = Uuid::new_v4();
        assert!(log.last(goal).unwrap().is_none());

        log.append(goal, submit(1), Utc::now()).unwrap();
        log.append(
            goal,
            ReflectionSubmission::new(2, ReflectionStatus::Done).with_challenges("rain"),
            Utc::now(),
        )
        .unwrap();

        let last = log.last(goal).unwrap().unwrap();
        assert_eq!(last.status, ReflectionStatus::Done);
        assert_eq!(last.challenges, "rain");
        assert_eq!(
            log.statuses(goal).unwrap(),
            vec![ReflectionStatus::InProgress, ReflectionStatus::Done]
        );
    }

    #[test]
    fn concurrent_same_sequence_has_one_winner() {
        let dir = tempdir().unwrap();
        let log = Arc::new(ReflectionLog::open(dir.path()).unwrap());
        let goal = Uuid::new_v4();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let log = Arc::clone(&log);
                thread::spawn(move || log.append(goal, submit(1), Utc::now()).is_ok())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(log.list(goal).unwrap().len(), 1);
    }
}

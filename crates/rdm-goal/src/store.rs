// store.rs — GoalStore: persistence for Goal records.
//
// Two backends share one trait:
//   - JsonGoalStore: one JSON file per goal, `<store_dir>/<goal_id>.json`
//   - MemoryGoalStore: a HashMap, for tests and embedding
//
// Every mutation after `insert` goes through `compare_and_set`. The caller
// passes the goal as it read it (same `version`) with its changes applied;
// the store writes it with `version + 1` only if the stored version still
// matches, otherwise it returns VersionConflict and writes nothing.
//
// JsonGoalStore serializes read-compare-write per goal on a striped lock,
// so goals on different stripes write in parallel.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::error::GoalError;
use crate::goal::{Goal, GoalState};

const LOCK_STRIPES: usize = 64;

/// Storage for goal records.
pub trait GoalStore: Send + Sync {
    /// Store a new goal. Fails with AlreadyExists if the ID is taken.
    fn insert(&self, goal: &Goal) -> Result<(), GoalError>;

    fn get(&self, goal_id: Uuid) -> Result<Option<Goal>, GoalError>;

    /// Replace the stored goal if its version still equals `goal.version`.
    /// Returns the goal as written (version incremented).
    fn compare_and_set(&self, goal: &Goal) -> Result<Goal, GoalError>;

    /// All goals, newest first.
    fn list(&self) -> Result<Vec<Goal>, GoalError>;

    fn list_by_state(&self, state: GoalState) -> Result<Vec<Goal>, GoalError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|g| g.state == state)
            .collect())
    }
}

fn check_version(stored: &Goal, incoming: &Goal) -> Result<Goal, GoalError> {
    if stored.version != incoming.version {
        return Err(GoalError::VersionConflict {
            goal_id: incoming.goal_id,
            expected: incoming.version,
            actual: stored.version,
        });
    }
    let mut next = incoming.clone();
    next.version = stored.version + 1;
    Ok(next)
}

/// File-backed goal store.
pub struct JsonGoalStore {
    store_dir: PathBuf,
    stripes: Vec<Mutex<()>>,
}

impl JsonGoalStore {
    /// Create a new store backed by the given directory.
    /// Creates the directory if it doesn't exist.
    pub fn new(store_dir: impl AsRef<Path>) -> Result<Self, GoalError> {
        let store_dir = store_dir.as_ref().to_path_buf();
        fs::create_dir_all(&store_dir).map_err(|source| GoalError::IoError {
            path: store_dir.display().to_string(),
            source,
        })?;
        Ok(Self {
            store_dir,
            stripes: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        })
    }

    fn stripe(goal_id: Uuid) -> usize {
        (goal_id.as_u128() % LOCK_STRIPES as u128) as usize
    }

    /// Two CAS calls on the same goal cannot both pass the version check.
    fn lock(&self, goal_id: Uuid) -> MutexGuard<'_, ()> {
        self.stripes[Self::stripe(goal_id)]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn goal_file(&self, goal_id: Uuid) -> PathBuf {
        self.store_dir.join(format!("{}.json", goal_id))
    }

    fn read(path: &Path) -> Result<Goal, GoalError> {
        let json = fs::read_to_string(path).map_err(|source| GoalError::IoError {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Write to a sibling temp file and rename over the target, so a
    /// reader never sees a half-written record.
    fn write(&self, goal: &Goal) -> Result<(), GoalError> {
        let path = self.goal_file(goal.goal_id);
        let tmp = self.store_dir.join(format!(".{}.json.tmp", goal.goal_id));
        let json = serde_json::to_string_pretty(goal)?;
        fs::write(&tmp, json).map_err(|source| GoalError::IoError {
            path: tmp.display().to_string(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| GoalError::IoError {
            path: path.display().to_string(),
            source,
        })
    }
}

impl GoalStore for JsonGoalStore {
    fn insert(&self, goal: &Goal) -> Result<(), GoalError> {
        let _guard = self.lock(goal.goal_id);
        if self.goal_file(goal.goal_id).exists() {
            return Err(GoalError::AlreadyExists(goal.goal_id));
        }
        self.write(goal)
    }

    fn get(&self, goal_id: Uuid) -> Result<Option<Goal>, GoalError> {
        let path = self.goal_file(goal_id);
        if !path.exists() {
            return Ok(None);
        }
        Self::read(&path).map(Some)
    }

    fn compare_and_set(&self, goal: &Goal) -> Result<Goal, GoalError> {
        let _guard = self.lock(goal.goal_id);
        let path = self.goal_file(goal.goal_id);
        if !path.exists() {
            return Err(GoalError::NotFound(goal.goal_id));
        }
        let stored = Self::read(&path)?;
        let next = check_version(&stored, goal)?;
        self.write(&next)?;
        Ok(next)
    }

    fn list(&self) -> Result<Vec<Goal>, GoalError> {
        let mut goals = Vec::new();

        let entries = fs::read_dir(&self.store_dir).map_err(|source| GoalError::IoError {
            path: self.store_dir.display().to_string(),
            source,
        })?;

        for entry in entries {
            let entry = entry.map_err(|source| GoalError::IoError {
                path: self.store_dir.display().to_string(),
                source,
            })?;
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == "json") {
                match Self::read(&path) {
                    Ok(goal) => goals.push(goal),
                    Err(e) => tracing::warn!(path = %path.display(), "skipping unreadable goal record: {}", e),
                }
            }
        }

        goals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(goals)
    }
}

/// In-memory goal store.
#[derive(Default)]
pub struct MemoryGoalStore {
    goals: Mutex<HashMap<Uuid, Goal>>,
}

impl MemoryGoalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Goal>> {
        // Every write replaces a whole record, so a poisoned map is still consistent.
        self.goals.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl GoalStore for MemoryGoalStore {
    fn insert(&self, goal: &Goal) -> Result<(), GoalError> {
        let mut goals = self.lock();
        if goals.contains_key(&goal.goal_id) {
            return Err(GoalError::AlreadyExists(goal.goal_id));
        }
        goals.insert(goal.goal_id, goal.clone());
        Ok(())
    }

    fn get(&self, goal_id: Uuid) -> Result<Option<Goal>, GoalError> {
        Ok(self.lock().get(&goal_id).cloned())
    }

    fn compare_and_set(&self, goal: &Goal) -> Result<Goal, GoalError> {
        let mut goals = self.lock();
        let stored = goals
            .get(&goal.goal_id)
            .ok_or(GoalError::NotFound(goal.goal_id))?;
        let next = check_version(stored, goal)?;
        goals.insert(next.goal_id, next.clone());
        Ok(next)
    }

    fn list(&self) -> Result<Vec<Goal>, GoalError> {
        let mut goals: Vec<Goal> = self.lock().values().cloned().collect();
        goals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(goals)
    }
}

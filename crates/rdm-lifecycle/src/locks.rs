// locks.rs — GoalLocks: per-goal exclusive sections with a bounded wait.
//
// A goal is "held" while its ID is in the set. The set's mutex is only
// taken long enough to insert or remove an ID, so requests for different
// goals never wait on each other's work. Waiting for a held goal gives up
// after the configured timeout with a retryable error instead of blocking
// indefinitely.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

use uuid::Uuid;

use crate::error::LifecycleError;

pub struct GoalLocks {
    held: Mutex<HashSet<Uuid>>,
    released: Condvar,
    timeout: Duration,
}

/// Releases the goal when dropped.
pub struct GoalGuard<'a> {
    locks: &'a GoalLocks,
    goal_id: Uuid,
}

impl GoalLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
            released: Condvar::new(),
            timeout,
        }
    }

    pub fn acquire(&self, goal_id: Uuid) -> Result<GoalGuard<'_>, LifecycleError> {
        // The set is only mutated by insert/remove, so a poisoned lock is still consistent.
        let held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut held, wait) = self
            .released
            .wait_timeout_while(held, self.timeout, |held| held.contains(&goal_id))
            .unwrap_or_else(PoisonError::into_inner);
        if wait.timed_out() && held.contains(&goal_id) {
            tracing::warn!(%goal_id, timeout_ms = self.timeout.as_millis() as u64, "goal lock wait timed out");
            return Err(LifecycleError::retryable(format!(
                "timed out after {:?} waiting for goal {}",
                self.timeout, goal_id
            )));
        }
        held.insert(goal_id);
        Ok(GoalGuard {
            locks: self,
            goal_id,
        })
    }

    pub fn is_held(&self, goal_id: Uuid) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&goal_id)
    }
}

impl Drop for GoalGuard<'_> {
    fn drop(&mut self) {
        let mut held = self
            .locks
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        held.remove(&self.goal_id);
        self.locks.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn guard_releases_on_drop() {
        let locks = GoalLocks::new(Duration::from_millis(50));
        let goal = Uuid::new_v4();
        {
            let _guard = locks.acquire(goal).unwrap();
            assert!(locks.is_held(goal));
        }
        assert!(!locks.is_held(goal));
        assert!(locks.acquire(goal).is_ok());
    }

    #[test]
    fn second_acquire_times_out_as_retryable() {
        let locks = GoalLocks::new(Duration::from_millis(20));
        let goal = Uuid::new_v4();
        let _guard = locks.acquire(goal).unwrap();
        let err = locks.acquire(goal).err().unwrap();
        assert!(err.is_retryable());
    }

    #[test]
    fn different_goals_do_not_contend() {
        let locks = GoalLocks::new(Duration::from_millis(20));
        let _a = locks.acquire(Uuid::new_v4()).unwrap();
        assert!(locks.acquire(Uuid::new_v4()).is_ok());
    }

    #[test]
    fn waiter_proceeds_after_release() {
        let locks = Arc::new(GoalLocks::new(Duration::from_secs(5)));
        let goal = Uuid::new_v4();
        let guard = locks.acquire(goal).unwrap();

        let waiter = {
            let locks = Arc::clone(&locks);
            thread::spawn(move || locks.acquire(goal).is_ok())
        };
        thread::sleep(Duration::from_millis(20));
        drop(guard);

        assert!(waiter.join().unwrap());
    }
}

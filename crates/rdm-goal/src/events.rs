// events.rs — Event model and notification dispatch.
//
// The lifecycle emits an event at each observable step. Sinks (a JSONL log
// file, webhooks, dashboards) subscribe through NotificationSink. Dispatch
// is synchronous and a failing sink never fails the operation that
// produced the event.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rdm_settlement::{BadgeTier, OutcomeCategory, Percentage, ReflectionStatus, Settlement};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GoalError;
use crate::goal::{Goal, GoalState};

/// Events emitted at key lifecycle points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum GoalEvent {
    GoalCreated {
        goal_id: Uuid,
        description: String,
        pledge_amount: u64,
        deadline: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    GoalStateChanged {
        goal_id: Uuid,
        from_state: String,
        to_state: String,
        timestamp: DateTime<Utc>,
    },

    ReflectionAppended {
        goal_id: Uuid,
        sequence: u64,
        status: ReflectionStatus,
        timestamp: DateTime<Utc>,
    },

    /// The goal reached Verified or Expired with a committed distribution.
    GoalSettled {
        goal_id: Uuid,
        category: OutcomeCategory,
        completion: Percentage,
        reward: u64,
        remorse: u64,
        bonus: u64,
        badge: BadgeTier,
        timestamp: DateTime<Utc>,
    },

    PaymentRecorded {
        goal_id: Uuid,
        reference: String,
        amount: u64,
        timestamp: DateTime<Utc>,
    },
}

impl GoalEvent {
    /// Get the event type name as a string.
    pub fn event_type(&self) -> &str {
        match self {
            GoalEvent::GoalCreated { .. } => "goal_created",
            GoalEvent::GoalStateChanged { .. } => "goal_state_changed",
            GoalEvent::ReflectionAppended { .. } => "reflection_appended",
            GoalEvent::GoalSettled { .. } => "goal_settled",
            GoalEvent::PaymentRecorded { .. } => "payment_recorded",
        }
    }

    pub fn goal_id(&self) -> Uuid {
        match self {
            GoalEvent::GoalCreated { goal_id, .. }
            | GoalEvent::GoalStateChanged { goal_id, .. }
            | GoalEvent::ReflectionAppended { goal_id, .. }
            | GoalEvent::GoalSettled { goal_id, .. }
            | GoalEvent::PaymentRecorded { goal_id, .. } => *goal_id,
        }
    }

    pub fn goal_created(goal: &Goal) -> Self {
        GoalEvent::GoalCreated {
            goal_id: goal.goal_id,
            description: goal.description.clone(),
            pledge_amount: goal.pledge_amount,
            deadline: goal.deadline,
            timestamp: goal.created_at,
        }
    }

    pub fn goal_state_changed(
        goal_id: Uuid,
        from: GoalState,
        to: GoalState,
        timestamp: DateTime<Utc>,
    ) -> Self {
        GoalEvent::GoalStateChanged {
            goal_id,
            from_state: from.to_string(),
            to_state: to.to_string(),
            timestamp,
        }
    }

    pub fn goal_settled(settlement: &Settlement, timestamp: DateTime<Utc>) -> Self {
        let d = &settlement.distribution;
        GoalEvent::GoalSettled {
            goal_id: d.goal_id,
            category: settlement.outcome.category,
            completion: settlement.outcome.completion,
            reward: d.reward,
            remorse: d.remorse,
            bonus: d.bonus,
            badge: settlement.badge.tier,
            timestamp,
        }
    }
}

/// Receives lifecycle events.
pub trait NotificationSink: Send + Sync {
    /// Handle an event. Errors are logged but don't stop the system.
    fn send(&self, event: &GoalEvent) -> Result<(), GoalError>;
}

/// Logs events as JSONL to a file.
pub struct LogSink {
    path: PathBuf,
}

impl LogSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl NotificationSink for LogSink {
    fn send(&self, event: &GoalEvent) -> Result<(), GoalError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| GoalError::IoError {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| GoalError::IoError {
                path: self.path.display().to_string(),
                source,
            })?;

        let json = serde_json::to_string(event)?;
        writeln!(file, "{}", json).map_err(|source| GoalError::IoError {
            path: self.path.display().to_string(),
            source,
        })?;

        Ok(())
    }
}

/// Dispatches events to multiple sinks.
pub struct EventDispatcher {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add_sink(&mut self, sink: Box<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Dispatch an event to all sinks.
    pub fn dispatch(&self, event: &GoalEvent) {
        for sink in &self.sinks {
            if let Err(e) = sink.send(event) {
                tracing::warn!(
                    goal_id = %event.goal_id(),
                    event = event.event_type(),
                    "notification sink error: {}",
                    e
                );
            }
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

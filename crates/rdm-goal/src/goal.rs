// goal.rs — Goal: one pledged commitment and its lifecycle.
//
// The state machine only ever moves forward:
//   Created → Pledged → Active → PendingVerification → Verified
//   (Created | Pledged | Active) → Expired   when the deadline passes
//                                           without an accepted claim
//
// Verified and Expired are terminal. A claim that is already
// PendingVerification is never overridden by expiry.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rdm_settlement::{EvidencePackage, Settlement};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GoalError;

/// The lifecycle state of a Goal.
///
/// Serializes as `{"state": "pending_verification"}` in JSON.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GoalState {
    /// Recorded, pledge not yet confirmed.
    Created,

    /// Pledge amount validated and committed.
    Pledged,

    /// Tracking has started; reflections are accepted.
    Active,

    /// A completion claim with evidence is awaiting settlement.
    PendingVerification,

    /// Settled from a completion claim.
    Verified,

    /// Settled as a failure because the deadline passed with no claim.
    Expired,
}

impl fmt::Display for GoalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoalState::Created => write!(f, "created"),
            GoalState::Pledged => write!(f, "pledged"),
            GoalState::Active => write!(f, "active"),
            GoalState::PendingVerification => write!(f, "pending_verification"),
            GoalState::Verified => write!(f, "verified"),
            GoalState::Expired => write!(f, "expired"),
        }
    }
}

impl GoalState {
    /// Position along the lifecycle. Every valid transition strictly
    /// increases it.
    pub fn rank(self) -> u8 {
        match self {
            GoalState::Created => 0,
            GoalState::Pledged => 1,
            GoalState::Active => 2,
            GoalState::PendingVerification => 3,
            GoalState::Verified | GoalState::Expired => 4,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, GoalState::Verified | GoalState::Expired)
    }

    /// States from which the deadline forces expiry.
    pub fn is_expirable(self) -> bool {
        matches!(
            self,
            GoalState::Created | GoalState::Pledged | GoalState::Active
        )
    }

    /// Check whether transitioning from this state to `next` is valid.
    pub fn can_transition_to(self, next: GoalState) -> bool {
        if next == GoalState::Expired {
            return self.is_expirable();
        }
        matches!(
            (self, next),
            (GoalState::Created, GoalState::Pledged)
                | (GoalState::Pledged, GoalState::Active)
                | (GoalState::Active, GoalState::PendingVerification)
                | (GoalState::PendingVerification, GoalState::Verified)
        )
    }
}

/// Input for creating a goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGoal {
    pub description: String,
    pub pledge_amount: u64,
    pub duration_days: u32,
    pub verification_method: String,
    #[serde(default)]
    pub impact_tags: BTreeSet<String>,
}

impl NewGoal {
    pub fn new(description: impl Into<String>, pledge_amount: u64, duration_days: u32) -> Self {
        Self {
            description: description.into(),
            pledge_amount,
            duration_days,
            verification_method: "self_verification".to_string(),
            impact_tags: BTreeSet::new(),
        }
    }

    pub fn with_verification_method(mut self, method: impl Into<String>) -> Self {
        self.verification_method = method.into();
        self
    }

    /// Add an SDG/ESG alignment tag (e.g., "SDG12").
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.impact_tags.insert(tag.into());
        self
    }
}

/// A goal record as held by the [`GoalStore`](crate::store::GoalStore).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub goal_id: Uuid,

    pub description: String,

    /// Staked amount in token units.
    pub pledge_amount: u64,

    pub duration_days: u32,

    /// How completion will be verified (e.g., "photo_log", "peer_verification").
    pub verification_method: String,

    /// SDG/ESG alignment tags.
    #[serde(default)]
    pub impact_tags: BTreeSet<String>,

    pub state: GoalState,

    pub created_at: DateTime<Utc>,

    pub deadline: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Incremented by the store on every successful compare-and-set.
    #[serde(default)]
    pub version: u64,

    /// Evidence accepted with the completion claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<EvidencePackage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<DateTime<Utc>>,

    /// Final settlement, present once the goal is terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement: Option<Settlement>,

    /// Transaction reference returned by the payment provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
}

impl Goal {
    /// Create a new Goal in the Created state.
    ///
    /// Fails with `InvalidDuration` if the deadline falls outside the
    /// representable calendar.
    pub fn new(spec: NewGoal, now: DateTime<Utc>) -> Result<Self, GoalError> {
        let deadline = Duration::try_days(i64::from(spec.duration_days))
            .and_then(|span| now.checked_add_signed(span))
            .ok_or(GoalError::InvalidDuration {
                days: spec.duration_days,
            })?;
        Ok(Self {
            goal_id: Uuid::new_v4(),
            description: spec.description,
            pledge_amount: spec.pledge_amount,
            duration_days: spec.duration_days,
            verification_method: spec.verification_method,
            impact_tags: spec.impact_tags,
            state: GoalState::Created,
            created_at: now,
            deadline,
            updated_at: now,
            version: 0,
            evidence: None,
            claimed_at: None,
            settlement: None,
            payment_reference: None,
        })
    }

    /// Transition to a new state. Returns an error if the transition is invalid.
    pub fn transition(&mut self, next: GoalState, now: DateTime<Utc>) -> Result<(), GoalError> {
        if !self.state.can_transition_to(next) {
            return Err(GoalError::InvalidTransition {
                goal_id: self.goal_id,
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        self.updated_at = now;
        Ok(())
    }

    /// True once `now` is strictly past the deadline.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline
    }

    /// True if the deadline has passed and nothing protects the goal from expiry.
    pub fn is_due_for_expiry(&self, now: DateTime<Utc>) -> bool {
        self.state.is_expirable() && self.is_overdue(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [GoalState; 6] = [
        GoalState::Created,
        GoalState::Pledged,
        GoalState::Active,
        GoalState::PendingVerification,
        GoalState::Verified,
        GoalState::Expired,
    ];

    fn test_goal() -> Goal {
        Goal::new(
            NewGoal::new("Reduce single-use plastic by 80%", 100, 30).with_tag("SDG12"),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn new_goal_starts_in_created_state() {
        let goal = test_goal();
        assert_eq!(goal.state, GoalState::Created);
        assert_eq!(goal.version, 0);
        assert_eq!(goal.deadline - goal.created_at, Duration::days(30));
        assert!(goal.impact_tags.contains("SDG12"));
    }

    #[test]
    fn unrepresentable_deadline_is_rejected() {
        let result = Goal::new(NewGoal::new("Forever", 100, u32::MAX), Utc::now());
        assert!(matches!(
            result,
            Err(GoalError::InvalidDuration { days: u32::MAX })
        ));
    }

    #[test]
    fn valid_forward_transitions() {
        let mut goal = test_goal();
        let now = Utc::now();
        goal.transition(GoalState::Pledged, now).unwrap();
        goal.transition(GoalState::Active, now).unwrap();
        goal.transition(GoalState::PendingVerification, now).unwrap();
        goal.transition(GoalState::Verified, now).unwrap();
        assert!(goal.state.is_terminal());
    }

    #[test]
    fn skipping_a_state_is_rejected() {
        let mut goal = test_goal();
        let result = goal.transition(GoalState::Active, Utc::now());
        assert!(matches!(result, Err(GoalError::InvalidTransition { .. })));
        assert_eq!(goal.state, GoalState::Created);
    }

    #[test]
    fn every_valid_transition_moves_forward() {
        for from in ALL_STATES {
            for to in ALL_STATES {
                if from.can_transition_to(to) {
                    assert!(to.rank() > from.rank(), "{from} -> {to} is not monotonic");
                }
            }
        }
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for to in ALL_STATES {
            assert!(!GoalState::Verified.can_transition_to(to));
            assert!(!GoalState::Expired.can_transition_to(to));
        }
    }

    #[test]
    fn pending_verification_cannot_expire() {
        assert!(GoalState::Active.can_transition_to(GoalState::Expired));
        assert!(GoalState::Created.can_transition_to(GoalState::Expired));
        assert!(!GoalState::PendingVerification.can_transition_to(GoalState::Expired));
    }

    #[test]
    fn overdue_is_strictly_after_deadline() {
        let goal = test_goal();
        assert!(!goal.is_overdue(goal.deadline));
        assert!(goal.is_overdue(goal.deadline + Duration::seconds(1)));
    }

    #[test]
    fn due_for_expiry_respects_pending_claim() {
        let mut goal = test_goal();
        let later = goal.deadline + Duration::days(1);
        assert!(goal.is_due_for_expiry(later));

        let now = Utc::now();
        goal.transition(GoalState::Pledged, now).unwrap();
        goal.transition(GoalState::Active, now).unwrap();
        goal.transition(GoalState::PendingVerification, now).unwrap();
        assert!(!goal.is_due_for_expiry(later));
    }

    #[test]
    fn serialization_round_trip() {
        let goal = test_goal();
        let json = serde_json::to_string_pretty(&goal).unwrap();
        assert!(json.contains("\"state\": \"created\""));
        assert!(!json.contains("settlement"));
        let restored: Goal = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.goal_id, goal.goal_id);
        assert_eq!(restored.state, goal.state);
        assert_eq!(restored.impact_tags, goal.impact_tags);
    }

    #[test]
    fn state_display_format() {
        assert_eq!(GoalState::Created.to_string(), "created");
        assert_eq!(
            GoalState::PendingVerification.to_string(),
            "pending_verification"
        );
        assert_eq!(GoalState::Expired.to_string(), "expired");
    }
}

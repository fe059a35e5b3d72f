// status.rs — Read-only status view of a goal.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rdm_goal::{Goal, GoalState, ReflectionEntry};
use rdm_settlement::{BadgeTier, BonusLine, OutcomeCategory, OutcomeFlag, Percentage, Settlement};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything a caller needs to show where a goal stands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalStatus {
    pub goal_id: Uuid,
    pub description: String,
    pub state: GoalState,
    pub pledge_amount: u64,
    pub verification_method: String,
    pub impact_tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    /// Whole days until the deadline; negative once it has passed.
    pub days_remaining: i64,
    pub reflection_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reflection: Option<ReflectionEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement: Option<SettlementSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
}

/// The settled outcome of a goal, flattened for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettlementSummary {
    pub category: OutcomeCategory,
    pub completion: Percentage,
    pub confidence: u8,
    pub reasoning: String,
    pub flags: Vec<OutcomeFlag>,
    pub reward: u64,
    pub remorse: u64,
    pub reward_share: Percentage,
    pub remorse_share: Percentage,
    pub bonus: u64,
    pub bonus_lines: Vec<BonusLine>,
    pub total_received: u64,
    pub badge: BadgeTier,
}

impl From<&Settlement> for SettlementSummary {
    fn from(s: &Settlement) -> Self {
        let d = &s.distribution;
        Self {
            category: s.outcome.category,
            completion: s.outcome.completion,
            confidence: s.outcome.confidence,
            reasoning: s.outcome.reasoning.clone(),
            flags: s.outcome.flags.clone(),
            reward: d.reward,
            remorse: d.remorse,
            reward_share: d.reward_share(),
            remorse_share: d.remorse_share(),
            bonus: d.bonus,
            bonus_lines: d.bonus_lines.clone(),
            total_received: d.total_received,
            badge: s.badge.tier,
        }
    }
}

impl GoalStatus {
    pub fn new(goal: &Goal, reflections: &[ReflectionEntry], now: DateTime<Utc>) -> Self {
        Self {
            goal_id: goal.goal_id,
            description: goal.description.clone(),
            state: goal.state,
            pledge_amount: goal.pledge_amount,
            verification_method: goal.verification_method.clone(),
            impact_tags: goal.impact_tags.clone(),
            created_at: goal.created_at,
            deadline: goal.deadline,
            days_remaining: (goal.deadline - now).num_days(),
            reflection_count: reflections.last().map_or(0, |r| r.sequence),
            last_reflection: reflections.last().cloned(),
            settlement: goal.settlement.as_ref().map(SettlementSummary::from),
            payment_reference: goal.payment_reference.clone(),
        }
    }
}

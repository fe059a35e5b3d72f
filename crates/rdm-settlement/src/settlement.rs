// settlement.rs — The pure settlement pipeline.
//
// evaluate → distribute → assign badge, in that order. No I/O and no
// clock: the lifecycle controller wraps this in its per-goal critical
// section and handles persistence.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::badge::{assign_badge, Badge};
use crate::config::SettlementConfig;
use crate::distribution::{Distribution, DistributionEngine};
use crate::error::SettlementError;
use crate::evaluator::{OutcomeDetermination, OutcomeEvaluator};
use crate::evidence::{EvidencePackage, ReflectionStatus};

/// The complete result of settling one goal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settlement {
    pub outcome: OutcomeDetermination,
    pub distribution: Distribution,
    pub badge: Badge,
}

#[derive(Debug, Clone, Default)]
pub struct SettlementEngine {
    evaluator: OutcomeEvaluator,
    distributor: DistributionEngine,
}

impl SettlementEngine {
    pub fn new(config: &SettlementConfig) -> Self {
        Self {
            evaluator: OutcomeEvaluator::new(config.evaluation.clone()),
            distributor: DistributionEngine::new(config.distribution.clone()),
        }
    }

    pub fn evaluator(&self) -> &OutcomeEvaluator {
        &self.evaluator
    }

    pub fn distributor(&self) -> &DistributionEngine {
        &self.distributor
    }

    /// Settle a claimed goal from its evidence and reflection history.
    pub fn settle(
        &self,
        pledge: u64,
        evidence: &EvidencePackage,
        reflections: &[ReflectionStatus],
    ) -> Result<Settlement, SettlementError> {
        let outcome = self.evaluator.evaluate(evidence, reflections)?;
        self.finish(pledge, outcome)
    }

    /// Settle a goal whose deadline passed with no claim: full remorse.
    pub fn settle_expired(&self, goal_id: Uuid, pledge: u64) -> Result<Settlement, SettlementError> {
        let outcome = self.evaluator.expired(goal_id);
        self.finish(pledge, outcome)
    }

    fn finish(
        &self,
        pledge: u64,
        outcome: OutcomeDetermination,
    ) -> Result<Settlement, SettlementError> {
        let distribution = self.distributor.distribute(pledge, &outcome)?;
        let badge = assign_badge(outcome.goal_id, outcome.completion);
        Ok(Settlement {
            outcome,
            distribution,
            badge,
        })
    }
}

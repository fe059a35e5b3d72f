// evaluator.rs — OutcomeEvaluator: evidence → categorized outcome.
//
// Pure and deterministic. Given the same evidence and reflection history it
// always produces the same determination, which is what makes a failed
// settlement safe to retry from the top.
//
// Categorization (with default thresholds):
//   SUCCESS   completion ≥ 80
//   PARTIAL   40 ≤ completion < 80
//   FAILURE   completion < 40
//
// Confidence starts at the externally supplied value and moves up for each
// corroborating source (peer rating, quantitative measurement) and down for
// each conflicting one.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::EvaluationConfig;
use crate::error::SettlementError;
use crate::evidence::{EvidencePackage, ReflectionStatus};
use crate::percentage::Percentage;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeCategory {
    Success,
    Partial,
    Failure,
}

impl fmt::Display for OutcomeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeCategory::Success => write!(f, "SUCCESS"),
            OutcomeCategory::Partial => write!(f, "PARTIAL"),
            OutcomeCategory::Failure => write!(f, "FAILURE"),
        }
    }
}

/// Structured observations attached to a determination.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeFlag {
    /// Peer rating agrees with the self-assessment.
    PeerCorroborated,
    /// Peer rating disagrees with the self-assessment.
    PeerConflict,
    /// Quantitative measurement agrees with the completion percentage.
    MeasurementCorroborated,
    /// Quantitative measurement disagrees with the completion percentage.
    MeasurementConflict,
    LowConfidence,
    Innovation,
    /// No reflection check-ins were recorded before the claim.
    NoCheckIns,
    /// The deadline passed without a completion claim.
    Expired,
}

/// The evaluator's verdict for one goal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutcomeDetermination {
    pub goal_id: Uuid,
    pub completion: Percentage,
    pub category: OutcomeCategory,
    /// 0–100.
    pub confidence: u8,
    pub reasoning: String,
    #[serde(default)]
    pub flags: Vec<OutcomeFlag>,
}

impl OutcomeDetermination {
    pub fn has_flag(&self, flag: OutcomeFlag) -> bool {
        self.flags.contains(&flag)
    }
}

/// Maps evidence into an [`OutcomeDetermination`].
#[derive(Debug, Clone, Default)]
pub struct OutcomeEvaluator {
    config: EvaluationConfig,
}

impl OutcomeEvaluator {
    pub fn new(config: EvaluationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Categorize a clamped completion percentage.
    pub fn categorize(&self, completion: Percentage) -> OutcomeCategory {
        if completion.at_least(self.config.success_threshold) {
            OutcomeCategory::Success
        } else if completion.at_least(self.config.partial_threshold) {
            OutcomeCategory::Partial
        } else {
            OutcomeCategory::Failure
        }
    }

    /// Judge a completion claim.
    ///
    /// Only the completion percentage is mandatory; every optional field
    /// that is missing simply contributes nothing.
    pub fn evaluate(
        &self,
        evidence: &EvidencePackage,
        reflections: &[ReflectionStatus],
    ) -> Result<OutcomeDetermination, SettlementError> {
        let completion = evidence
            .completion()
            .ok_or(SettlementError::MissingEvidence {
                goal_id: evidence.goal_id,
            })?;

        let mut flags = Vec::new();
        let mut confidence =
            i32::from(evidence.confidence.unwrap_or(self.config.default_confidence).min(100));
        let mut reasoning = "self_reported";

        if let Some(peer) = evidence.peer_score {
            let claimed = evidence.self_assessment.nominal_score();
            if peer.abs_diff(claimed) < self.config.peer_tolerance {
                confidence += i32::from(self.config.corroboration_bonus);
                flags.push(OutcomeFlag::PeerCorroborated);
                reasoning = "peer_corroborated";
            } else {
                confidence -= i32::from(self.config.conflict_penalty);
                flags.push(OutcomeFlag::PeerConflict);
                flags.push(OutcomeFlag::LowConfidence);
                reasoning = "peer_conflict";
            }
        }

        if let Some(measured) = evidence.quantitative_score {
            let reported = completion.basis_points() / Percentage::SCALE;
            let distance = u32::from(measured).abs_diff(reported);
            if distance < u32::from(self.config.peer_tolerance) {
                confidence += i32::from(self.config.corroboration_bonus);
                flags.push(OutcomeFlag::MeasurementCorroborated);
                if reasoning == "self_reported" {
                    reasoning = "measured";
                }
            } else {
                confidence -= i32::from(self.config.conflict_penalty);
                flags.push(OutcomeFlag::MeasurementConflict);
            }
        }

        let confidence = confidence.clamp(0, 100) as u8;
        if confidence < self.config.low_confidence_threshold {
            flags.push(OutcomeFlag::LowConfidence);
        }
        if evidence.innovation {
            flags.push(OutcomeFlag::Innovation);
        }
        if reflections.is_empty() {
            flags.push(OutcomeFlag::NoCheckIns);
        }
        flags.sort();
        flags.dedup();

        let category = self.categorize(completion);
        tracing::debug!(
            goal_id = %evidence.goal_id,
            completion = %completion,
            %category,
            confidence,
            "outcome evaluated"
        );

        Ok(OutcomeDetermination {
            goal_id: evidence.goal_id,
            completion,
            category,
            confidence,
            reasoning: reasoning.to_string(),
            flags,
        })
    }

    /// The forced outcome for a goal whose deadline passed with no claim:
    /// FAILURE at 0% completion.
    pub fn expired(&self, goal_id: Uuid) -> OutcomeDetermination {
        OutcomeDetermination {
            goal_id,
            completion: Percentage::ZERO,
            category: OutcomeCategory::Failure,
            confidence: 100,
            reasoning: "expired_without_claim".to_string(),
            flags: vec![OutcomeFlag::Expired],
        }
    }
}

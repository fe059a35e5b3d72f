// config.rs — Thresholds and bonus amounts for settlement.
//
// These are loaded from the `[evaluation]` and `[distribution]` sections
// of the RDM config file and handed to the evaluator and distribution
// engine at construction.

use serde::{Deserialize, Serialize};

/// Outcome categorization and confidence scoring parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Minimum whole percentage for SUCCESS.
    pub success_threshold: u8,

    /// Minimum whole percentage for PARTIAL.
    pub partial_threshold: u8,

    /// Confidence used when the external evaluator supplies none.
    pub default_confidence: u8,

    /// Maximum distance between a corroborating score and the claim it
    /// corroborates (exclusive).
    pub peer_tolerance: u8,

    /// Added to confidence per corroborating source.
    pub corroboration_bonus: u8,

    /// Subtracted from confidence per conflicting source.
    pub conflict_penalty: u8,

    /// Confidence strictly below this value is flagged `low_confidence`.
    pub low_confidence_threshold: u8,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            success_threshold: 80,
            partial_threshold: 40,
            default_confidence: 70,
            peer_tolerance: 20,
            corroboration_bonus: 10,
            conflict_penalty: 15,
            low_confidence_threshold: 50,
        }
    }
}

/// Bonus rules for the distribution engine.
///
/// Bonuses come from a separate pool and are never taken out of the pledge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DistributionConfig {
    /// Whole percentage at or above which the exceptional-effort bonus applies.
    pub exceptional_threshold: u8,

    /// Exceptional-effort bonus as a whole percentage of the pledge (floored).
    pub exceptional_bonus_percent: u8,

    /// Fixed bonus for corroborating peer verification.
    pub peer_bonus: u64,

    /// Fixed bonus for an innovative approach.
    pub innovation_bonus: u64,

    /// Optional ceiling on reward + bonus. Only the bonus is trimmed to fit;
    /// the reward is the user's own pledge and is never reduced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_total_payout: Option<u64>,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            exceptional_threshold: 95,
            exceptional_bonus_percent: 5,
            peer_bonus: 5,
            innovation_bonus: 10,
            max_total_payout: None,
        }
    }
}

/// Both halves of the settlement configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettlementConfig {
    #[serde(default)]
    pub evaluation: EvaluationConfig,

    #[serde(default)]
    pub distribution: DistributionConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: DistributionConfig =
            serde_json::from_str(r#"{"peer_bonus": 7}"#).unwrap();
        assert_eq!(config.peer_bonus, 7);
        assert_eq!(config.innovation_bonus, 10);
        assert!(config.max_total_payout.is_none());
    }

    #[test]
    fn default_thresholds() {
        let config = EvaluationConfig::default();
        assert_eq!(config.success_threshold, 80);
        assert_eq!(config.partial_threshold, 40);
    }
}

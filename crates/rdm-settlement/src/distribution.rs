// distribution.rs — DistributionEngine: outcome + pledge → token split.
//
// The pledge is split between a reward bucket (returned to the user) and a
// remorse bucket (forfeited):
//
//   reward  = floor(pledge × completion / 100)
//   remorse = pledge − reward
//
// Remorse is always derived from reward, never computed independently, so
// `reward + remorse == pledge` holds for every input with no rounding
// leakage. Bonuses are drawn from a separate pool and reported alongside.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DistributionConfig;
use crate::error::SettlementError;
use crate::evaluator::{OutcomeDetermination, OutcomeFlag};
use crate::percentage::Percentage;

/// Why a bonus was awarded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BonusKind {
    ExceptionalEffort,
    PeerVerification,
    Innovation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BonusLine {
    pub kind: BonusKind,
    pub amount: u64,
}

/// The settled split of one goal's pledge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Distribution {
    pub goal_id: Uuid,
    pub pledge: u64,
    pub completion: Percentage,
    pub reward: u64,
    pub remorse: u64,
    /// Sum of `bonus_lines`, after any payout ceiling.
    pub bonus: u64,
    #[serde(default)]
    pub bonus_lines: Vec<BonusLine>,
    /// `reward + bonus`.
    pub total_received: u64,
}

impl Distribution {
    /// Re-check the conservation invariants on a computed or replayed
    /// distribution.
    pub fn verify(&self) -> Result<(), SettlementError> {
        let conserved = self.reward.checked_add(self.remorse) == Some(self.pledge);
        let bonus_consistent = self
            .bonus_lines
            .iter()
            .try_fold(0u64, |acc, l| acc.checked_add(l.amount))
            == Some(self.bonus);
        let total_consistent = self.reward.checked_add(self.bonus) == Some(self.total_received);
        if conserved && bonus_consistent && total_consistent {
            Ok(())
        } else {
            Err(SettlementError::InvariantViolation {
                goal_id: self.goal_id,
                pledge: self.pledge,
                reward: self.reward,
                remorse: self.remorse,
            })
        }
    }

    /// Share of the pledge returned, for display.
    pub fn reward_share(&self) -> Percentage {
        self.completion
    }

    /// Share of the pledge forfeited, for display.
    pub fn remorse_share(&self) -> Percentage {
        self.completion.complement()
    }
}

/// Splits a pledge according to an outcome.
#[derive(Debug, Clone, Default)]
pub struct DistributionEngine {
    config: DistributionConfig,
}

impl DistributionEngine {
    pub fn new(config: DistributionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DistributionConfig {
        &self.config
    }

    /// The reward share of `pledge` at `completion`, floored.
    pub fn reward_for(pledge: u64, completion: Percentage) -> u64 {
        let scaled = u128::from(pledge) * u128::from(completion.basis_points());
        // completion ≤ 100% so the quotient never exceeds `pledge`.
        (scaled / u128::from(Percentage::FULL.basis_points())) as u64
    }

    pub fn distribute(
        &self,
        pledge: u64,
        outcome: &OutcomeDetermination,
    ) -> Result<Distribution, SettlementError> {
        let reward = Self::reward_for(pledge, outcome.completion);
        let remorse = pledge.checked_sub(reward).ok_or(SettlementError::InvariantViolation {
            goal_id: outcome.goal_id,
            pledge,
            reward,
            remorse: 0,
        })?;

        let mut bonus_lines = self.bonus_lines(pledge, outcome);
        let bonus = self.apply_ceiling(reward, &mut bonus_lines);

        let distribution = Distribution {
            goal_id: outcome.goal_id,
            pledge,
            completion: outcome.completion,
            reward,
            remorse,
            bonus,
            bonus_lines,
            total_received: reward.saturating_add(bonus),
        };
        distribution.verify()?;

        tracing::debug!(
            goal_id = %outcome.goal_id,
            pledge,
            reward,
            remorse,
            bonus,
            "distribution computed"
        );
        Ok(distribution)
    }

    fn bonus_lines(&self, pledge: u64, outcome: &OutcomeDetermination) -> Vec<BonusLine> {
        let mut lines = Vec::new();
        if outcome.completion.at_least(self.config.exceptional_threshold) {
            let amount = (u128::from(pledge) * u128::from(self.config.exceptional_bonus_percent)
                / 100) as u64;
            if amount > 0 {
                lines.push(BonusLine {
                    kind: BonusKind::ExceptionalEffort,
                    amount,
                });
            }
        }
        if outcome.has_flag(OutcomeFlag::PeerCorroborated) && self.config.peer_bonus > 0 {
            lines.push(BonusLine {
                kind: BonusKind::PeerVerification,
                amount: self.config.peer_bonus,
            });
        }
        if outcome.has_flag(OutcomeFlag::Innovation) && self.config.innovation_bonus > 0 {
            lines.push(BonusLine {
                kind: BonusKind::Innovation,
                amount: self.config.innovation_bonus,
            });
        }
        lines
    }

    /// Trim bonus lines (last awarded first) so that reward + bonus stays
    /// within the configured ceiling. Returns the resulting bonus total.
    fn apply_ceiling(&self, reward: u64, lines: &mut Vec<BonusLine>) -> u64 {
        let total: u64 = lines.iter().fold(0u64, |acc, l| acc.saturating_add(l.amount));
        let Some(ceiling) = self.config.max_total_payout else {
            return total;
        };
        let allowed = ceiling.saturating_sub(reward);
        let mut excess = total.saturating_sub(allowed);
        while excess > 0 {
            let Some(last) = lines.last_mut() else { break };
            let cut = excess.min(last.amount);
            last.amount -= cut;
            excess -= cut;
            if last.amount == 0 {
                lines.pop();
            }
        }
        lines.iter().map(|l| l.amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::OutcomeCategory;

    fn outcome(pct: u32, flags: Vec<OutcomeFlag>) -> OutcomeDetermination {
        OutcomeDetermination {
            goal_id: Uuid::new_v4(),
            completion: Percentage::from_whole(pct),
            category: OutcomeCategory::Partial,
            confidence: 70,
            reasoning: "test".to_string(),
            flags,
        }
    }

    fn engine() -> DistributionEngine {
        DistributionEngine::new(DistributionConfig::default())
    }

    #[test]
    fn reward_plus_remorse_always_equals_pledge() {
        let e = engine();
        let pledges = [
            1u64, 2, 3, 7, 33, 50, 99, 100, 101, 333, 500, 999, 12_345, 1_000_000_000_000,
        ];
        for &pledge in &pledges {
            for pct in 0..=100u32 {
                let d = e.distribute(pledge, &outcome(pct, vec![])).unwrap();
                assert_eq!(d.reward + d.remorse, pledge, "pledge={pledge} pct={pct}");
                assert!(d.reward <= pledge);
            }
        }
    }

    #[test]
    fn fractional_percentages_conserve_the_pledge() {
        let e = engine();
        for tenths in 0..=1000u32 {
            let mut o = outcome(0, vec![]);
            o.completion = Percentage::from_reported(f64::from(tenths) / 10.0).unwrap();
            let d = e.distribute(77, &o).unwrap();
            assert_eq!(d.reward + d.remorse, 77);
        }
    }

    #[test]
    fn reward_is_floored() {
        let d = engine().distribute(3, &outcome(50, vec![])).unwrap();
        assert_eq!(d.reward, 1);
        assert_eq!(d.remorse, 2);
    }

    #[test]
    fn proportional_split_for_common_cases() {
        let d = engine().distribute(100, &outcome(85, vec![])).unwrap();
        assert_eq!((d.reward, d.remorse, d.bonus), (85, 15, 0));

        let d = engine().distribute(100, &outcome(25, vec![])).unwrap();
        assert_eq!((d.reward, d.remorse), (25, 75));

        let d = engine().distribute(100, &outcome(0, vec![])).unwrap();
        assert_eq!((d.reward, d.remorse), (0, 100));
    }

    #[test]
    fn display_shares_are_complementary() {
        let d = engine().distribute(200, &outcome(70, vec![])).unwrap();
        assert_eq!(d.reward_share(), Percentage::from_whole(70));
        assert_eq!(d.remorse_share(), Percentage::from_whole(30));
    }

    #[test]
    fn exceptional_effort_bonus_at_threshold() {
        let d = engine().distribute(100, &outcome(95, vec![])).unwrap();
        assert_eq!(d.bonus, 5);
        assert_eq!(d.bonus_lines[0].kind, BonusKind::ExceptionalEffort);
        assert_eq!(d.total_received, 100);

        let d = engine().distribute(100, &outcome(94, vec![])).unwrap();
        assert_eq!(d.bonus, 0);
    }

    #[test]
    fn exceptional_bonus_is_floored() {
        let d = engine().distribute(30, &outcome(100, vec![])).unwrap();
        // 5% of 30 is 1.5 → 1.
        assert_eq!(d.bonus, 1);
    }

    #[test]
    fn bonuses_are_additive_and_not_taken_from_pledge() {
        let d = engine()
            .distribute(
                100,
                &outcome(
                    100,
                    vec![OutcomeFlag::PeerCorroborated, OutcomeFlag::Innovation],
                ),
            )
            .unwrap();
        assert_eq!(d.reward, 100);
        assert_eq!(d.remorse, 0);
        assert_eq!(d.bonus, 5 + 5 + 10);
        assert_eq!(d.total_received, 120);
        assert_eq!(d.bonus_lines.len(), 3);
    }

    #[test]
    fn peer_conflict_earns_no_peer_bonus() {
        let d = engine()
            .distribute(100, &outcome(60, vec![OutcomeFlag::PeerConflict]))
            .unwrap();
        assert_eq!(d.bonus, 0);
    }

    #[test]
    fn ceiling_trims_bonus_but_never_reward() {
        let engine = DistributionEngine::new(DistributionConfig {
            max_total_payout: Some(108),
            ..DistributionConfig::default()
        });
        let d = engine
            .distribute(
                100,
                &outcome(
                    100,
                    vec![OutcomeFlag::PeerCorroborated, OutcomeFlag::Innovation],
                ),
            )
            .unwrap();
        assert_eq!(d.reward, 100);
        assert_eq!(d.bonus, 8);
        assert_eq!(d.total_received, 108);
        // Innovation (last) is dropped entirely, peer trimmed from 5 to 3.
        assert_eq!(
            d.bonus_lines,
            vec![
                BonusLine {
                    kind: BonusKind::ExceptionalEffort,
                    amount: 5
                },
                BonusLine {
                    kind: BonusKind::PeerVerification,
                    amount: 3
                },
            ]
        );

        let tight = DistributionEngine::new(DistributionConfig {
            max_total_payout: Some(50),
            ..DistributionConfig::default()
        });
        let d = tight.distribute(100, &outcome(100, vec![])).unwrap();
        assert_eq!(d.reward, 100);
        assert_eq!(d.bonus, 0);
    }

    #[test]
    fn verify_detects_corruption() {
        let mut d = engine().distribute(100, &outcome(60, vec![])).unwrap();
        d.remorse += 1;
        assert!(matches!(
            d.verify(),
            Err(SettlementError::InvariantViolation { .. })
        ));
    }

    #[test]
    fn distribution_is_deterministic() {
        let o = outcome(97, vec![OutcomeFlag::Innovation]);
        let a = engine().distribute(250, &o).unwrap();
        let b = engine().distribute(250, &o).unwrap();
        assert_eq!(a, b);
    }
}

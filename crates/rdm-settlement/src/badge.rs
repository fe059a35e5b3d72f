// badge.rs — BadgeAssigner: completion percentage → impact badge tier.
//
//   < 40      None
//   40 – 59   Bronze
//   60 – 79   Silver
//   80 – 94   Gold
//   95 – 100  Platinum
//
// Each boundary value belongs to the higher tier (exactly 40 is Bronze).

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::percentage::Percentage;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum BadgeTier {
    None,
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl BadgeTier {
    /// Tier for a completion percentage.
    pub fn for_completion(completion: Percentage) -> Self {
        if completion.at_least(95) {
            BadgeTier::Platinum
        } else if completion.at_least(80) {
            BadgeTier::Gold
        } else if completion.at_least(60) {
            BadgeTier::Silver
        } else if completion.at_least(40) {
            BadgeTier::Bronze
        } else {
            BadgeTier::None
        }
    }
}

impl fmt::Display for BadgeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BadgeTier::None => write!(f, "none"),
            BadgeTier::Bronze => write!(f, "bronze"),
            BadgeTier::Silver => write!(f, "silver"),
            BadgeTier::Gold => write!(f, "gold"),
            BadgeTier::Platinum => write!(f, "platinum"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Badge {
    pub goal_id: Uuid,
    pub tier: BadgeTier,
}

/// Assign the badge for a goal.
pub fn assign_badge(goal_id: Uuid, completion: Percentage) -> Badge {
    Badge {
        goal_id,
        tier: BadgeTier::for_completion(completion),
    }
}

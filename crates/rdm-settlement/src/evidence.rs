// evidence.rs — Evidence submitted with a completion claim.
//
// Free-text evidence is interpreted by an external evaluation service. What
// reaches this crate is already normalized: a completion percentage plus a
// handful of optional corroborating scores and flags.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::percentage::Percentage;

/// The user's own verdict on how the goal went.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelfAssessment {
    Done,
    PartiallyDone,
    NotDone,
}

impl SelfAssessment {
    /// Nominal completion score used when comparing against a peer rating.
    pub fn nominal_score(self) -> u8 {
        match self {
            SelfAssessment::Done => 100,
            SelfAssessment::PartiallyDone => 50,
            SelfAssessment::NotDone => 0,
        }
    }
}

/// Status reported at a reflection check-in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReflectionStatus {
    NotStarted,
    InProgress,
    Done,
    PartiallyDone,
    NotDone,
}

/// Everything the evaluator needs to judge one goal, passed once per goal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidencePackage {
    pub goal_id: Uuid,

    pub self_assessment: SelfAssessment,

    /// Completion percentage from the external evaluator. Mandatory for
    /// settlement; `None` means the evaluator produced nothing usable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_percentage: Option<f64>,

    /// Confidence reported by the external evaluator (0–100).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,

    /// Rating from a peer verifier (0–100).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_score: Option<u8>,

    /// Who gave the peer rating (e.g., "Coach Sarah Johnson").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_source: Option<String>,

    /// Score from a quantitative measurement such as an app or IoT device (0–100).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantitative_score: Option<u8>,

    #[serde(default)]
    pub innovation: bool,
}

impl EvidencePackage {
    /// Evidence with only the mandatory fields set.
    pub fn new(goal_id: Uuid, self_assessment: SelfAssessment, completion_percentage: f64) -> Self {
        Self {
            goal_id,
            self_assessment,
            completion_percentage: Some(completion_percentage),
            confidence: None,
            peer_score: None,
            peer_source: None,
            quantitative_score: None,
            innovation: false,
        }
    }

    pub fn with_confidence(mut self, confidence: u8) -> Self {
        self.confidence = Some(confidence.min(100));
        self
    }

    pub fn with_peer(mut self, score: u8, source: impl Into<String>) -> Self {
        self.peer_score = Some(score.min(100));
        self.peer_source = Some(source.into());
        self
    }

    pub fn with_quantitative(mut self, score: u8) -> Self {
        self.quantitative_score = Some(score.min(100));
        self
    }

    pub fn with_innovation(mut self) -> Self {
        self.innovation = true;
        self
    }

    /// The clamped completion percentage, or `None` if absent or NaN.
    pub fn completion(&self) -> Option<Percentage> {
        self.completion_percentage.and_then(Percentage::from_reported)
    }
}

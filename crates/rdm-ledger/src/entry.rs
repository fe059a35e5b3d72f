// entry.rs — Ledger entry data model.
//
// One entry per line in a goal's ledger file. Entries carry a per-goal
// sequence number starting at 1 and the hash of the previous line, so both
// ordering and integrity can be checked from the file alone.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEventType {
    GoalCreated,
    Pledged,
    Activated,
    ClaimSubmitted,
    /// Terminal: the claim was settled.
    Verified,
    /// Terminal: the deadline passed without a claim.
    ExpiredFailed,
    /// A payment reference was recorded after settlement.
    PaymentRecorded,
}

impl LedgerEventType {
    /// At most one terminal entry may exist per goal.
    pub fn is_terminal(self) -> bool {
        matches!(self, LedgerEventType::Verified | LedgerEventType::ExpiredFailed)
    }
}

impl fmt::Display for LedgerEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LedgerEventType::GoalCreated => "goal_created",
            LedgerEventType::Pledged => "pledged",
            LedgerEventType::Activated => "activated",
            LedgerEventType::ClaimSubmitted => "claim_submitted",
            LedgerEventType::Verified => "verified",
            LedgerEventType::ExpiredFailed => "expired_failed",
            LedgerEventType::PaymentRecorded => "payment_recorded",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub entry_id: Uuid,
    pub goal_id: Uuid,
    /// 1-based, strictly increasing per goal.
    pub sequence: u64,
    pub event_type: LedgerEventType,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    /// Hash of the previous line in this goal's ledger; `None` for the first.
    pub previous_hash: Option<String>,
}

impl LedgerEntry {
    /// Deserialize the payload into a concrete type.
    pub fn payload_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_verified_and_expired_are_terminal() {
        assert!(LedgerEventType::Verified.is_terminal());
        assert!(LedgerEventType::ExpiredFailed.is_terminal());
        assert!(!LedgerEventType::ClaimSubmitted.is_terminal());
        assert!(!LedgerEventType::PaymentRecorded.is_terminal());
    }

    #[test]
    fn event_type_serializes_as_snake_case() {
        let json = serde_json::to_string(&LedgerEventType::ExpiredFailed).unwrap();
        assert_eq!(json, "\"expired_failed\"");
        assert_eq!(LedgerEventType::ExpiredFailed.to_string(), "expired_failed");
    }

    #[test]
    fn payload_as_decodes() {
        let entry = LedgerEntry {
            entry_id: Uuid::new_v4(),
            goal_id: Uuid::new_v4(),
            sequence: 1,
            event_type: LedgerEventType::Pledged,
            payload: serde_json::json!({ "pledge_amount": 100 }),
            timestamp: Utc::now(),
            previous_hash: None,
        };
        let value: serde_json::Value = entry.payload_as().unwrap();
        assert_eq!(value["pledge_amount"], 100);
    }
}

// payment.rs — Seam to the external payment/ledger provider.
//
// The controller never constructs or signs transactions. Once a goal is
// settled it hands the Distribution to a PaymentProvider and records the
// transaction reference the provider returns. Every request carries an
// idempotency key derived from the goal, so a provider that has already
// executed the transfer can return the original reference instead of
// paying twice.

use rdm_settlement::Distribution;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PaymentError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub idempotency_key: String,
    pub goal_id: Uuid,
    /// Amount owed to the goal owner: reward plus bonus.
    pub amount: u64,
    pub distribution: Distribution,
}

impl TransferRequest {
    pub fn for_distribution(distribution: &Distribution) -> Self {
        Self {
            idempotency_key: format!("rdm-settlement-{}", distribution.goal_id),
            goal_id: distribution.goal_id,
            amount: distribution.total_received,
            distribution: distribution.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferReceipt {
    /// Provider-issued transaction reference.
    pub reference: String,
    pub amount: u64,
}

pub trait PaymentProvider: Send + Sync {
    /// Short name for logs and ledger entries.
    fn name(&self) -> &str;

    fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, PaymentError>;
}

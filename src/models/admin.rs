use serde::{Deserialize, Serialize};

use crate::models::exchange::TransactionView;

#[derive(Debug, Clone, Deserialize)]
pub struct ResolveRequest {
    pub transaction_id: i32,
    /// Final outcome, e.g. "refunded", "credited", "written_off"
    pub outcome: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingTransactionsResponse {
    pub manual_required: Vec<EscalatedTransaction>,
    pub stuck: Vec<EscalatedTransaction>,
}

/// Operator view: includes the leg ids and failure detail the user view hides.
#[derive(Debug, Clone, Serialize)]
pub struct EscalatedTransaction {
    pub id: i32,
    pub user_id: i32,
    pub direction: String,
    pub amount: i64,
    pub reference: String,
    pub status: String,
    pub escrow_tx_id: Option<String>,
    pub casino_tx_id: Option<String>,
    pub compensation_tx_id: Option<String>,
    pub failure_reason: Option<String>,
    pub failed_leg: Option<String>,
    pub compensation_attempts: i32,
    pub resolution: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<crate::entities::casino_transactions::Model> for EscalatedTransaction {
    fn from(m: crate::entities::casino_transactions::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            direction: m.direction,
            amount: m.amount,
            reference: m.nonce,
            status: m.status,
            escrow_tx_id: m.escrow_tx_id,
            casino_tx_id: m.casino_tx_id,
            compensation_tx_id: m.compensation_tx_id,
            failure_reason: m.failure_reason,
            failed_leg: m.failed_leg,
            compensation_attempts: m.compensation_attempts,
            resolution: m.resolution,
            created_at: m.created_at.to_string(),
            updated_at: m.updated_at.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SettingUpsertRequest {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolveResponse {
    pub transaction: TransactionView,
    pub message: String,
}

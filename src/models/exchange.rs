use serde::{Deserialize, Serialize};

use crate::entities::casino_transactions;

/// Exchange direction: `buy` moves peso token into casino chips,
/// `sell` moves chips back into peso token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "buy",
            Direction::Sell => "sell",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "buy" => Some(Direction::Buy),
            "sell" => Some(Direction::Sell),
            _ => None,
        }
    }
}

/// Saga status. Transitions not listed in [`ExchangeStatus::can_transition_to`]
/// are rejected at the store layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeStatus {
    Initiated,
    EscrowDebited,
    CasinoDebited,
    PayoutPending,
    RefundPending,
    RedepositPending,
    Completed,
    Failed,
    ManualRequired,
}

impl ExchangeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeStatus::Initiated => "initiated",
            ExchangeStatus::EscrowDebited => "escrow_debited",
            ExchangeStatus::CasinoDebited => "casino_debited",
            ExchangeStatus::PayoutPending => "payout_pending",
            ExchangeStatus::RefundPending => "refund_pending",
            ExchangeStatus::RedepositPending => "redeposit_pending",
            ExchangeStatus::Completed => "completed",
            ExchangeStatus::Failed => "failed",
            ExchangeStatus::ManualRequired => "manual_required",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initiated" => Some(ExchangeStatus::Initiated),
            "escrow_debited" => Some(ExchangeStatus::EscrowDebited),
            "casino_debited" => Some(ExchangeStatus::CasinoDebited),
            "payout_pending" => Some(ExchangeStatus::PayoutPending),
            "refund_pending" => Some(ExchangeStatus::RefundPending),
            "redeposit_pending" => Some(ExchangeStatus::RedepositPending),
            "completed" => Some(ExchangeStatus::Completed),
            "failed" => Some(ExchangeStatus::Failed),
            "manual_required" => Some(ExchangeStatus::ManualRequired),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExchangeStatus::Completed | ExchangeStatus::Failed | ExchangeStatus::ManualRequired
        )
    }

    /// The full transition table for both saga directions.
    pub fn can_transition_to(self, next: ExchangeStatus) -> bool {
        use ExchangeStatus::*;
        matches!(
            (self, next),
            // buy: token -> chip
            (Initiated, EscrowDebited)
                | (EscrowDebited, Completed)
                | (EscrowDebited, RefundPending)
                | (RefundPending, Failed)
                | (RefundPending, ManualRequired)
                // sell: chip -> token
                | (Initiated, CasinoDebited)
                | (CasinoDebited, PayoutPending)
                | (PayoutPending, Completed)
                | (PayoutPending, RedepositPending)
                | (RedepositPending, Failed)
                | (RedepositPending, ManualRequired)
                // leg-one failure, nothing moved; simulated links complete directly
                | (Initiated, Failed)
                | (Initiated, Completed)
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeRequest {
    pub amount: f64,
    pub pin: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExchangeResponse {
    pub transaction_id: i32,
    pub reference: String,
    pub status: ExchangeStatus,
    pub amount: i64,
    pub message: String,
}

/// User-facing view of a saga record. Operator-only fields stay internal.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionView {
    pub id: i32,
    pub direction: String,
    pub amount: i64,
    pub reference: String,
    pub status: String,
    pub failure_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<casino_transactions::Model> for TransactionView {
    fn from(m: casino_transactions::Model) -> Self {
        Self {
            id: m.id,
            direction: m.direction,
            amount: m.amount,
            reference: m.nonce,
            status: m.status,
            failure_reason: m.failure_reason,
            created_at: m.created_at.to_string(),
            updated_at: m.updated_at.to_string(),
        }
    }
}

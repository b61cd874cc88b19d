//! Saga record persistence.
//!
//! Every state transition goes through `apply_transition`, which enforces
//! the status transition table and stamps `updated_at`. The orchestrator
//! persists each step before issuing the next remote call, so a crash
//! mid-exchange always leaves a row operator tooling can find.

use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter, QueryOrder,
    Set,
};

use crate::entities::{casino_transactions, prelude::*};
use crate::error::WalletError;
use crate::models::exchange::{Direction, ExchangeStatus};

const NON_TERMINAL_STATUSES: [&str; 6] = [
    "initiated",
    "escrow_debited",
    "casino_debited",
    "payout_pending",
    "refund_pending",
    "redeposit_pending",
];

pub async fn create(
    db: &DatabaseConnection,
    user_id: i32,
    direction: Direction,
    amount: i64,
    nonce: &str,
) -> Result<casino_transactions::Model, WalletError> {
    let now = Utc::now().naive_utc();
    let record = casino_transactions::ActiveModel {
        user_id: Set(user_id),
        direction: Set(direction.as_str().to_string()),
        amount: Set(amount),
        nonce: Set(nonce.to_string()),
        status: Set(ExchangeStatus::Initiated.as_str().to_string()),
        compensation_attempts: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let model = record.insert(db).await?;
    tracing::info!(
        "transaction {} created: {} {} for user {} (nonce {})",
        model.id,
        model.direction,
        model.amount,
        user_id,
        model.nonce
    );
    Ok(model)
}

async fn apply_transition(
    db: &DatabaseConnection,
    record: casino_transactions::Model,
    next: ExchangeStatus,
    mutate: impl FnOnce(&mut casino_transactions::ActiveModel),
) -> Result<casino_transactions::Model, WalletError> {
    let current = ExchangeStatus::parse(&record.status).ok_or_else(|| {
        WalletError::Internal(format!(
            "unknown status '{}' on transaction {}",
            record.status, record.id
        ))
    })?;

    if !current.can_transition_to(next) {
        return Err(WalletError::IllegalTransition {
            from: record.status.clone(),
            to: next.as_str().to_string(),
        });
    }

    tracing::info!(
        "transaction {} ({}): {} -> {}",
        record.id,
        record.nonce,
        current.as_str(),
        next.as_str()
    );

    let mut active: casino_transactions::ActiveModel = record.into();
    active.status = Set(next.as_str().to_string());
    active.updated_at = Set(Utc::now().naive_utc());
    mutate(&mut active);
    Ok(active.update(db).await?)
}

pub async fn mark_escrow_debited(
    db: &DatabaseConnection,
    record: casino_transactions::Model,
    escrow_tx_id: &str,
) -> Result<casino_transactions::Model, WalletError> {
    let tx_id = escrow_tx_id.to_string();
    apply_transition(db, record, ExchangeStatus::EscrowDebited, |active| {
        active.escrow_tx_id = Set(Some(tx_id));
    })
    .await
}

pub async fn mark_casino_debited(
    db: &DatabaseConnection,
    record: casino_transactions::Model,
    casino_tx_id: &str,
) -> Result<casino_transactions::Model, WalletError> {
    let tx_id = casino_tx_id.to_string();
    apply_transition(db, record, ExchangeStatus::CasinoDebited, |active| {
        active.casino_tx_id = Set(Some(tx_id));
    })
    .await
}

pub async fn mark_payout_pending(
    db: &DatabaseConnection,
    record: casino_transactions::Model,
) -> Result<casino_transactions::Model, WalletError> {
    apply_transition(db, record, ExchangeStatus::PayoutPending, |_| {}).await
}

/// Leg one failed: nothing moved, the record goes straight to `failed`.
pub async fn mark_leg_one_failed(
    db: &DatabaseConnection,
    record: casino_transactions::Model,
    reason: &str,
    failed_leg: &str,
) -> Result<casino_transactions::Model, WalletError> {
    let reason = reason.to_string();
    let leg = failed_leg.to_string();
    apply_transition(db, record, ExchangeStatus::Failed, |active| {
        active.failure_reason = Set(Some(reason));
        active.failed_leg = Set(Some(leg));
    })
    .await
}

/// Persisted before the compensation call is attempted.
pub async fn begin_compensation(
    db: &DatabaseConnection,
    record: casino_transactions::Model,
    pending: ExchangeStatus,
    reason: &str,
    failed_leg: &str,
) -> Result<casino_transactions::Model, WalletError> {
    let attempts = record.compensation_attempts + 1;
    let reason = reason.to_string();
    let leg = failed_leg.to_string();
    apply_transition(db, record, pending, |active| {
        active.failure_reason = Set(Some(reason));
        active.failed_leg = Set(Some(leg));
        active.compensation_attempts = Set(attempts);
        active.last_compensation_at = Set(Some(Utc::now().naive_utc()));
    })
    .await
}

/// Compensation succeeded: the exchange failed but the user is whole.
pub async fn mark_compensated(
    db: &DatabaseConnection,
    record: casino_transactions::Model,
    compensation_tx_id: &str,
) -> Result<casino_transactions::Model, WalletError> {
    let tx_id = compensation_tx_id.to_string();
    apply_transition(db, record, ExchangeStatus::Failed, |active| {
        active.compensation_tx_id = Set(Some(tx_id));
    })
    .await
}

/// Both the leg and its compensation failed; a human takes over from here.
pub async fn mark_manual_required(
    db: &DatabaseConnection,
    record: casino_transactions::Model,
    combined_reason: &str,
) -> Result<casino_transactions::Model, WalletError> {
    let reason = combined_reason.to_string();
    apply_transition(db, record, ExchangeStatus::ManualRequired, |active| {
        active.failure_reason = Set(Some(reason));
        active.failed_leg = Set(Some("compensation".to_string()));
    })
    .await
}

pub async fn mark_completed(
    db: &DatabaseConnection,
    record: casino_transactions::Model,
    escrow_tx_id: Option<&str>,
    casino_tx_id: Option<&str>,
) -> Result<casino_transactions::Model, WalletError> {
    let escrow = escrow_tx_id.map(|s| s.to_string());
    let casino = casino_tx_id.map(|s| s.to_string());
    apply_transition(db, record, ExchangeStatus::Completed, |active| {
        if let Some(id) = escrow {
            active.escrow_tx_id = Set(Some(id));
        }
        if let Some(id) = casino {
            active.casino_tx_id = Set(Some(id));
        }
    })
    .await
}

pub async fn find_for_user(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<casino_transactions::Model>, WalletError> {
    Ok(CasinoTransactions::find()
        .filter(casino_transactions::Column::UserId.eq(user_id))
        .order_by(casino_transactions::Column::CreatedAt, Order::Desc)
        .all(db)
        .await?)
}

pub async fn find_one_for_user(
    db: &DatabaseConnection,
    id: i32,
    user_id: i32,
) -> Result<Option<casino_transactions::Model>, WalletError> {
    Ok(CasinoTransactions::find_by_id(id)
        .filter(casino_transactions::Column::UserId.eq(user_id))
        .one(db)
        .await?)
}

pub async fn find_by_status(
    db: &DatabaseConnection,
    status: ExchangeStatus,
) -> Result<Vec<casino_transactions::Model>, WalletError> {
    Ok(CasinoTransactions::find()
        .filter(casino_transactions::Column::Status.eq(status.as_str()))
        .order_by(casino_transactions::Column::UpdatedAt, Order::Asc)
        .all(db)
        .await?)
}

/// Non-terminal records that have not moved for `older_than_minutes`,
/// likely a crash mid-saga; candidates for operator-triggered retry.
pub async fn find_stuck(
    db: &DatabaseConnection,
    older_than_minutes: i64,
) -> Result<Vec<casino_transactions::Model>, WalletError> {
    let cutoff = Utc::now().naive_utc() - Duration::minutes(older_than_minutes);
    Ok(CasinoTransactions::find()
        .filter(casino_transactions::Column::Status.is_in(NON_TERMINAL_STATUSES))
        .filter(casino_transactions::Column::UpdatedAt.lt(cutoff))
        .order_by(casino_transactions::Column::UpdatedAt, Order::Asc)
        .all(db)
        .await?)
}

/// Operator resolution: only `manual_required` records, exactly once.
pub async fn resolve(
    db: &DatabaseConnection,
    id: i32,
    outcome: &str,
    note: Option<&str>,
    operator_id: i32,
) -> Result<casino_transactions::Model, WalletError> {
    let record = CasinoTransactions::find_by_id(id)
        .one(db)
        .await?
        .ok_or(WalletError::NotFound("transaction"))?;

    if record.status != ExchangeStatus::ManualRequired.as_str() {
        return Err(WalletError::Validation(
            "only manual_required transactions can be resolved".to_string(),
        ));
    }
    if record.resolution.is_some() {
        return Err(WalletError::Validation(
            "transaction already resolved".to_string(),
        ));
    }

    let resolution = match note {
        Some(n) => format!("{}: {}", outcome, n),
        None => outcome.to_string(),
    };

    tracing::info!(
        "transaction {} resolved as '{}' by operator {}",
        id,
        resolution,
        operator_id
    );

    let mut active: casino_transactions::ActiveModel = record.into();
    active.resolution = Set(Some(resolution));
    active.resolved_by = Set(Some(operator_id));
    active.updated_at = Set(Utc::now().naive_utc());
    Ok(active.update(db).await?)
}

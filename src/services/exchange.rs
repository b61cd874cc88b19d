//! The chip exchange saga.
//!
//! A deposit debits the token escrow ledger then credits casino chips; a
//! withdrawal debits chips then pays out from escrow. The two ledgers
//! share no transaction boundary, so the orchestrator runs the legs
//! strictly in sequence, persists every transition before the next remote
//! call, and compensates the completed leg when the second one fails.
//! Only a failed compensation escalates to a human.
//!
//! Each saga owns one nonce, generated at creation and passed to every
//! remote call, so the ledgers can deduplicate retries. The compensation
//! leg of a withdrawal uses a derived nonce (`<nonce>-R`) so the
//! re-credit is distinguishable from the original debit.

use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::AppState;
use crate::entities::{casino_links, casino_transactions, prelude::*, users};
use crate::error::WalletError;
use crate::models::casino::{AccountKind, LinkStatus};
use crate::models::exchange::{Direction, ExchangeRequest, ExchangeStatus};
use crate::services::casino_api::{CasinoLedger, ChipTransfer};
use crate::services::escrow_api::EscrowLedger;
use crate::services::exchange_store;
use crate::services::notifications::Notifier;
use crate::services::pin_gate;
use crate::services::remote::RemoteOutcome;

pub const COMPENSATION_NONCE_SUFFIX: &str = "-R";

#[derive(Debug, Clone, Copy)]
pub struct ExchangeLimits {
    pub min: i64,
    pub max: i64,
}

/// Floor to whole token units, then enforce the configured band.
pub fn validate_amount(requested: f64, limits: &ExchangeLimits) -> Result<i64, WalletError> {
    if !requested.is_finite() || requested <= 0.0 {
        return Err(WalletError::Validation(
            "amount must be a positive number".to_string(),
        ));
    }
    let amount = requested.floor() as i64;
    if amount < limits.min || amount > limits.max {
        return Err(WalletError::Validation(format!(
            "amount must be between {} and {}",
            limits.min, limits.max
        )));
    }
    Ok(amount)
}

pub fn compensation_nonce(nonce: &str) -> String {
    format!("{}{}", nonce, COMPENSATION_NONCE_SUFFIX)
}

/// Success value or the reason string recorded on the saga record.
/// A local `PoolUnavailable` after leg one is a leg failure like any
/// other: it must drive compensation, never propagate.
fn leg_outcome<T>(result: Result<RemoteOutcome<T>, WalletError>) -> Result<T, String> {
    match result {
        Ok(RemoteOutcome::Success(value)) => Ok(value),
        Ok(other) => Err(other
            .failure_reason()
            .unwrap_or_else(|| "unknown failure".to_string())),
        Err(e) => Err(e.to_string()),
    }
}

async fn load_exchange_link(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<casino_links::Model, WalletError> {
    let link = CasinoLinks::find()
        .filter(casino_links::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(WalletError::NotLinked)?;

    let status = LinkStatus::parse(&link.status).ok_or_else(|| {
        WalletError::Internal(format!("unknown link status '{}'", link.status))
    })?;
    if !status.allows_exchange() {
        return Err(WalletError::NotLinked);
    }
    Ok(link)
}

fn link_is_simulated(link: &casino_links::Model) -> bool {
    link.status == LinkStatus::Simulated.as_str()
}

fn link_transfer(link: &casino_links::Model, signed_amount: i64, nonce: &str) -> ChipTransfer {
    ChipTransfer {
        username: link.casino_username.clone(),
        signed_amount,
        as_agent: link.account_kind == AccountKind::Agent.as_str(),
        nonce: nonce.to_string(),
        comment: format!("Wallet chip exchange ref {}", nonce),
    }
}

/// Buy: token -> chip. Validation, PIN and pre-flight happen in
/// [`deposit`]; this is the saga proper, testable against mock ledgers.
pub async fn run_deposit(
    db: &DatabaseConnection,
    escrow: &dyn EscrowLedger,
    casino: &dyn CasinoLedger,
    notifier: &Notifier,
    user: &users::Model,
    link: &casino_links::Model,
    amount: i64,
) -> Result<casino_transactions::Model, WalletError> {
    let nonce = Uuid::new_v4().to_string();
    let record = exchange_store::create(db, user.id, Direction::Buy, amount, &nonce).await?;

    if link_is_simulated(link) {
        let record =
            exchange_store::mark_completed(db, record, None, Some(&format!("sim-{}", nonce)))
                .await?;
        notifier.exchange_terminal(&record);
        return Ok(record);
    }

    // Leg one: debit the user's token balance in escrow
    let record = match escrow.debit(&user.username, amount).await {
        RemoteOutcome::Success(tx) => {
            exchange_store::mark_escrow_debited(db, record, &tx.tx_id).await?
        }
        other => {
            // Nothing moved; fail in place
            let reason = other.failure_reason().unwrap_or_default();
            let record = exchange_store::mark_leg_one_failed(db, record, &reason, "escrow").await?;
            notifier.exchange_terminal(&record);
            return Ok(record);
        }
    };

    // Leg two: credit chips with the saga nonce
    let credit = leg_outcome(
        casino
            .transfer(&link.agent_pool, link_transfer(link, amount, &nonce))
            .await,
    );

    match credit {
        Ok(tx) => {
            let record = exchange_store::mark_completed(db, record, None, Some(&tx.tx_id)).await?;
            notifier.exchange_terminal(&record);
            Ok(record)
        }
        Err(casino_reason) => {
            tracing::warn!(
                "transaction {} casino credit failed ({}), refunding escrow",
                record.id,
                casino_reason
            );
            let record = exchange_store::begin_compensation(
                db,
                record,
                ExchangeStatus::RefundPending,
                &casino_reason,
                "casino",
            )
            .await?;

            match escrow.credit(&user.username, amount).await {
                RemoteOutcome::Success(tx) => {
                    let record = exchange_store::mark_compensated(db, record, &tx.tx_id).await?;
                    notifier.exchange_terminal(&record);
                    Ok(record)
                }
                other => {
                    let refund_reason = other.failure_reason().unwrap_or_default();
                    let combined =
                        format!("casino leg: {}; refund: {}", casino_reason, refund_reason);
                    let record = exchange_store::mark_manual_required(db, record, &combined).await?;
                    notifier.exchange_terminal(&record);
                    Ok(record)
                }
            }
        }
    }
}

/// Sell: chip -> token. Compensation re-credits the chip debit under the
/// derived nonce.
pub async fn run_withdraw(
    db: &DatabaseConnection,
    escrow: &dyn EscrowLedger,
    casino: &dyn CasinoLedger,
    notifier: &Notifier,
    user: &users::Model,
    link: &casino_links::Model,
    amount: i64,
) -> Result<casino_transactions::Model, WalletError> {
    let nonce = Uuid::new_v4().to_string();
    let record = exchange_store::create(db, user.id, Direction::Sell, amount, &nonce).await?;

    if link_is_simulated(link) {
        let record =
            exchange_store::mark_completed(db, record, None, Some(&format!("sim-{}", nonce)))
                .await?;
        notifier.exchange_terminal(&record);
        return Ok(record);
    }

    // Leg one: debit chips (negative signed amount)
    let debit = leg_outcome(
        casino
            .transfer(&link.agent_pool, link_transfer(link, -amount, &nonce))
            .await,
    );

    let record = match debit {
        Ok(tx) => exchange_store::mark_casino_debited(db, record, &tx.tx_id).await?,
        Err(reason) => {
            let record = exchange_store::mark_leg_one_failed(db, record, &reason, "casino").await?;
            notifier.exchange_terminal(&record);
            return Ok(record);
        }
    };

    // Leg two: pay out from escrow; the pending state is persisted first
    let record = exchange_store::mark_payout_pending(db, record).await?;

    match escrow.credit(&user.username, amount).await {
        RemoteOutcome::Success(tx) => {
            let record = exchange_store::mark_completed(db, record, Some(&tx.tx_id), None).await?;
            notifier.exchange_terminal(&record);
            Ok(record)
        }
        other => {
            let payout_reason = other.failure_reason().unwrap_or_default();
            tracing::warn!(
                "transaction {} escrow payout failed ({}), re-crediting chips",
                record.id,
                payout_reason
            );
            let record = exchange_store::begin_compensation(
                db,
                record,
                ExchangeStatus::RedepositPending,
                &payout_reason,
                "escrow",
            )
            .await?;

            let redeposit = leg_outcome(
                casino
                    .transfer(
                        &link.agent_pool,
                        link_transfer(link, amount, &compensation_nonce(&nonce)),
                    )
                    .await,
            );

            match redeposit {
                Ok(tx) => {
                    let record = exchange_store::mark_compensated(db, record, &tx.tx_id).await?;
                    notifier.exchange_terminal(&record);
                    Ok(record)
                }
                Err(redeposit_reason) => {
                    let combined = format!(
                        "payout leg: {}; chip redeposit: {}",
                        payout_reason, redeposit_reason
                    );
                    let record = exchange_store::mark_manual_required(db, record, &combined).await?;
                    notifier.exchange_terminal(&record);
                    Ok(record)
                }
            }
        }
    }
}

/// Full deposit entry point: PIN gate, link check, amount band and the
/// advisory token-balance pre-flight, then the saga.
pub async fn deposit(
    state: &AppState,
    user: &users::Model,
    req: &ExchangeRequest,
) -> Result<casino_transactions::Model, WalletError> {
    pin_gate::require(&state.db, user, req.pin.as_deref()).await?;
    let link = load_exchange_link(&state.db, user.id).await?;
    let limits = ExchangeLimits {
        min: state.config.exchange_min_amount,
        max: state.config.exchange_max_amount,
    };
    let amount = validate_amount(req.amount, &limits)?;

    if !link_is_simulated(&link) {
        // Advisory: the escrow ledger remains the final authority
        let balance = state.escrow.balance_of(&user.username).await.into_result()?;
        if balance.balance < Decimal::from(amount) {
            return Err(WalletError::InsufficientBalance(format!(
                "token balance {} is below the requested {}",
                balance.balance, amount
            )));
        }
    }

    run_deposit(
        &state.db,
        &state.escrow,
        &state.casino,
        &state.notifier,
        user,
        &link,
        amount,
    )
    .await
}

/// Full withdrawal entry point. The pre-flight checks the escrow float
/// account, which must cover the eventual payout.
pub async fn withdraw(
    state: &AppState,
    user: &users::Model,
    req: &ExchangeRequest,
) -> Result<casino_transactions::Model, WalletError> {
    pin_gate::require(&state.db, user, req.pin.as_deref()).await?;
    let link = load_exchange_link(&state.db, user.id).await?;
    let limits = ExchangeLimits {
        min: state.config.exchange_min_amount,
        max: state.config.exchange_max_amount,
    };
    let amount = validate_amount(req.amount, &limits)?;

    if !link_is_simulated(&link) {
        let float = state
            .escrow
            .balance_of(&state.config.escrow_float_account)
            .await
            .into_result()?;
        if float.balance < Decimal::from(amount) {
            return Err(WalletError::InsufficientBalance(
                "escrow pool cannot cover this payout right now".to_string(),
            ));
        }
    }

    run_withdraw(
        &state.db,
        &state.escrow,
        &state.casino,
        &state.notifier,
        user,
        &link,
        amount,
    )
    .await
}

/// User-facing summary of a saga outcome. Never reads as success unless
/// the record actually completed.
pub fn outcome_message(record: &casino_transactions::Model) -> String {
    match ExchangeStatus::parse(&record.status) {
        Some(ExchangeStatus::Completed) => match Direction::parse(&record.direction) {
            Some(Direction::Sell) => "Tokens credited to your wallet.".to_string(),
            _ => "Chips credited to your casino account.".to_string(),
        },
        Some(ExchangeStatus::Failed) => {
            if record.compensation_tx_id.is_some() {
                "The exchange could not be completed. Your funds were restored.".to_string()
            } else {
                "The exchange could not be completed. No funds were moved.".to_string()
            }
        }
        Some(ExchangeStatus::ManualRequired) => format!(
            "The exchange needs attention from our support team (reference {}). \
             Support will follow up with you.",
            record.nonce
        ),
        _ => "The exchange is still being processed.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: ExchangeLimits = ExchangeLimits {
        min: 100,
        max: 50_000,
    };

    #[test]
    fn amounts_are_floored_to_whole_units() {
        assert_eq!(validate_amount(500.0, &LIMITS).unwrap(), 500);
        assert_eq!(validate_amount(500.99, &LIMITS).unwrap(), 500);
    }

    #[test]
    fn amounts_outside_the_band_are_rejected() {
        assert!(validate_amount(99.0, &LIMITS).is_err());
        assert!(validate_amount(50_001.0, &LIMITS).is_err());
        assert!(validate_amount(-500.0, &LIMITS).is_err());
        assert!(validate_amount(0.0, &LIMITS).is_err());
        assert!(validate_amount(f64::NAN, &LIMITS).is_err());
    }

    #[test]
    fn flooring_cannot_sneak_under_the_minimum() {
        // 100.5 floors to 100, which is allowed; 99.9 floors below the band
        assert_eq!(validate_amount(100.5, &LIMITS).unwrap(), 100);
        assert!(validate_amount(99.9, &LIMITS).is_err());
    }

    #[test]
    fn compensation_nonce_is_derived_from_the_original() {
        let nonce = "f6a7e2d0";
        assert_eq!(compensation_nonce(nonce), "f6a7e2d0-R");
        assert_ne!(compensation_nonce(nonce), nonce);
    }
}

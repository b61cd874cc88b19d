//! Saga integration tests.
//!
//! The orchestrator runs against scripted ledger mocks and a real test
//! database, so every state transition is persisted and asserted exactly
//! as in production.

mod common;

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use payverse_backend::entities::casino_transactions;
use payverse_backend::error::WalletError;
use payverse_backend::models::casino::{AccountKind, LinkStatus};
use payverse_backend::models::exchange::ExchangeStatus;
use payverse_backend::services::casino_api::{
    CasinoLedger, CasinoStats, CasinoTx, ChipTransfer, HierarchyInfo,
};
use payverse_backend::services::escrow_api::{EscrowBalance, EscrowLedger, EscrowTx};
use payverse_backend::services::exchange::{self, compensation_nonce};
use payverse_backend::services::exchange_store;
use payverse_backend::services::notifications::Notifier;
use payverse_backend::services::remote::RemoteOutcome;

use crate::common::{create_test_link, create_test_user, setup_test_db};

// ---------- scripted ledgers ----------

#[derive(Debug, Clone, PartialEq)]
struct EscrowCall {
    op: &'static str,
    handle: String,
    amount: i64,
}

struct ScriptedEscrow {
    debit_results: Mutex<VecDeque<RemoteOutcome<EscrowTx>>>,
    credit_results: Mutex<VecDeque<RemoteOutcome<EscrowTx>>>,
    balance: Decimal,
    calls: Mutex<Vec<EscrowCall>>,
}

impl ScriptedEscrow {
    fn new() -> Self {
        Self {
            debit_results: Mutex::new(VecDeque::new()),
            credit_results: Mutex::new(VecDeque::new()),
            balance: Decimal::from(1_000_000),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn script_debit(self, outcome: RemoteOutcome<EscrowTx>) -> Self {
        self.debit_results.lock().unwrap().push_back(outcome);
        self
    }

    fn script_credit(self, outcome: RemoteOutcome<EscrowTx>) -> Self {
        self.credit_results.lock().unwrap().push_back(outcome);
        self
    }

    fn calls(&self) -> Vec<EscrowCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Sum of credits minus debits seen by the ledger for `handle`.
    fn net_for(&self, handle: &str) -> i64 {
        self.calls()
            .iter()
            .filter(|c| c.handle == handle)
            .map(|c| if c.op == "credit" { c.amount } else { -c.amount })
            .sum()
    }
}

fn ok_escrow(tx_id: &str) -> RemoteOutcome<EscrowTx> {
    RemoteOutcome::Success(EscrowTx {
        tx_id: tx_id.to_string(),
    })
}

#[async_trait]
impl EscrowLedger for ScriptedEscrow {
    async fn debit(&self, handle: &str, amount: i64) -> RemoteOutcome<EscrowTx> {
        let outcome = self
            .debit_results
            .lock()
            .unwrap()
            .pop_front()
            .expect("unscripted escrow debit");
        // The ledger only moves money on success
        if outcome.is_success() {
            self.calls.lock().unwrap().push(EscrowCall {
                op: "debit",
                handle: handle.to_string(),
                amount,
            });
        }
        outcome
    }

    async fn credit(&self, handle: &str, amount: i64) -> RemoteOutcome<EscrowTx> {
        let outcome = self
            .credit_results
            .lock()
            .unwrap()
            .pop_front()
            .expect("unscripted escrow credit");
        if outcome.is_success() {
            self.calls.lock().unwrap().push(EscrowCall {
                op: "credit",
                handle: handle.to_string(),
                amount,
            });
        }
        outcome
    }

    async fn balance_of(&self, _handle: &str) -> RemoteOutcome<EscrowBalance> {
        RemoteOutcome::Success(EscrowBalance {
            balance: self.balance,
        })
    }
}

struct ScriptedCasino {
    transfer_results: Mutex<VecDeque<RemoteOutcome<CasinoTx>>>,
    transfers: Mutex<Vec<ChipTransfer>>,
}

impl ScriptedCasino {
    fn new() -> Self {
        Self {
            transfer_results: Mutex::new(VecDeque::new()),
            transfers: Mutex::new(Vec::new()),
        }
    }

    fn script_transfer(self, outcome: RemoteOutcome<CasinoTx>) -> Self {
        self.transfer_results.lock().unwrap().push_back(outcome);
        self
    }

    fn transfers(&self) -> Vec<ChipTransfer> {
        self.transfers.lock().unwrap().clone()
    }
}

fn ok_casino(tx_id: &str) -> RemoteOutcome<CasinoTx> {
    RemoteOutcome::Success(CasinoTx {
        tx_id: tx_id.to_string(),
    })
}

#[async_trait]
impl CasinoLedger for ScriptedCasino {
    async fn hierarchy_of(
        &self,
        _pool: &str,
        _username: &str,
        _kind: AccountKind,
    ) -> Result<RemoteOutcome<HierarchyInfo>, WalletError> {
        unreachable!("the saga never re-resolves ownership")
    }

    async fn transfer(
        &self,
        _pool: &str,
        transfer: ChipTransfer,
    ) -> Result<RemoteOutcome<CasinoTx>, WalletError> {
        self.transfers.lock().unwrap().push(transfer);
        Ok(self
            .transfer_results
            .lock()
            .unwrap()
            .pop_front()
            .expect("unscripted casino transfer"))
    }

    async fn statistics_of(
        &self,
        _pool: &str,
        _username: &str,
    ) -> Result<RemoteOutcome<CasinoStats>, WalletError> {
        unreachable!("the saga never reads statistics")
    }

    async fn send_message(
        &self,
        _pool: &str,
        _username: &str,
        _client_id: i64,
        _subject: &str,
        _body: &str,
    ) -> Result<RemoteOutcome<()>, WalletError> {
        unreachable!("the saga never sends messages")
    }
}

fn notifier() -> Notifier {
    Notifier::new(None)
}

// ---------- deposits (buy: token -> chip) ----------

#[tokio::test]
async fn deposit_happy_path_completes() {
    let db = setup_test_db().await.expect("test db");
    let user = create_test_user(&db, None).await.unwrap();
    let link = create_test_link(&db, user.id, LinkStatus::Verified).await.unwrap();

    let escrow = ScriptedEscrow::new().script_debit(ok_escrow("E1"));
    let casino = ScriptedCasino::new().script_transfer(ok_casino("C1"));

    let record = exchange::run_deposit(&db, &escrow, &casino, &notifier(), &user, &link, 500)
        .await
        .unwrap();

    assert_eq!(record.status, ExchangeStatus::Completed.as_str());
    assert_eq!(record.escrow_tx_id.as_deref(), Some("E1"));
    assert_eq!(record.casino_tx_id.as_deref(), Some("C1"));
    assert_eq!(record.amount, 500);

    // Both legs moved the same requested amount under the same nonce
    assert_eq!(escrow.calls()[0].amount, 500);
    let transfers = casino.transfers();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].signed_amount, 500);
    assert_eq!(transfers[0].nonce, record.nonce);

    // Exactly one record exists for the nonce
    let count = casino_transactions::Entity::find()
        .filter(casino_transactions::Column::Nonce.eq(&record.nonce))
        .all(&db)
        .await
        .unwrap()
        .len();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn deposit_escrow_failure_fails_with_nothing_moved() {
    let db = setup_test_db().await.expect("test db");
    let user = create_test_user(&db, None).await.unwrap();
    let link = create_test_link(&db, user.id, LinkStatus::Verified).await.unwrap();

    let escrow =
        ScriptedEscrow::new().script_debit(RemoteOutcome::Rejected("escrow offline".into()));
    let casino = ScriptedCasino::new();

    let record = exchange::run_deposit(&db, &escrow, &casino, &notifier(), &user, &link, 500)
        .await
        .unwrap();

    assert_eq!(record.status, ExchangeStatus::Failed.as_str());
    assert_eq!(record.failed_leg.as_deref(), Some("escrow"));
    assert_eq!(record.failure_reason.as_deref(), Some("escrow offline"));
    assert!(record.compensation_tx_id.is_none());

    // The casino leg never ran and the user's balance never changed
    assert!(casino.transfers().is_empty());
    assert_eq!(escrow.net_for(&user.username), 0);
}

#[tokio::test]
async fn deposit_casino_failure_is_refunded() {
    let db = setup_test_db().await.expect("test db");
    let user = create_test_user(&db, None).await.unwrap();
    let link = create_test_link(&db, user.id, LinkStatus::Verified).await.unwrap();

    let escrow = ScriptedEscrow::new()
        .script_debit(ok_escrow("E1"))
        .script_credit(ok_escrow("R1"));
    let casino = ScriptedCasino::new()
        .script_transfer(RemoteOutcome::Rejected("pool float exhausted".into()));

    let record = exchange::run_deposit(&db, &escrow, &casino, &notifier(), &user, &link, 500)
        .await
        .unwrap();

    // Failed-but-safe: the refund restored the user's tokens
    assert_eq!(record.status, ExchangeStatus::Failed.as_str());
    assert_eq!(record.compensation_tx_id.as_deref(), Some("R1"));
    assert_eq!(record.failed_leg.as_deref(), Some("casino"));
    assert!(
        record
            .failure_reason
            .as_deref()
            .unwrap()
            .contains("pool float exhausted")
    );
    assert_eq!(record.compensation_attempts, 1);
    assert!(record.last_compensation_at.is_some());

    assert_eq!(escrow.net_for(&user.username), 0);
}

#[tokio::test]
async fn deposit_refund_failure_escalates_to_manual() {
    let db = setup_test_db().await.expect("test db");
    let user = create_test_user(&db, None).await.unwrap();
    let link = create_test_link(&db, user.id, LinkStatus::Verified).await.unwrap();

    let escrow = ScriptedEscrow::new()
        .script_debit(ok_escrow("E1"))
        .script_credit(RemoteOutcome::Rejected("escrow maintenance window".into()));
    let casino = ScriptedCasino::new()
        .script_transfer(RemoteOutcome::Rejected("pool float exhausted".into()));

    let record = exchange::run_deposit(&db, &escrow, &casino, &notifier(), &user, &link, 500)
        .await
        .unwrap();

    assert_eq!(record.status, ExchangeStatus::ManualRequired.as_str());

    // Both failure reasons are recorded
    let reason = record.failure_reason.as_deref().unwrap();
    assert!(reason.contains("pool float exhausted"));
    assert!(reason.contains("escrow maintenance window"));

    // And the record is discoverable through the escalation query
    let escalated = exchange_store::find_by_status(&db, ExchangeStatus::ManualRequired)
        .await
        .unwrap();
    assert!(escalated.iter().any(|r| r.id == record.id));
}

#[tokio::test]
async fn deposit_casino_timeout_is_recorded_as_timeout() {
    let db = setup_test_db().await.expect("test db");
    let user = create_test_user(&db, None).await.unwrap();
    let link = create_test_link(&db, user.id, LinkStatus::Verified).await.unwrap();

    let escrow = ScriptedEscrow::new()
        .script_debit(ok_escrow("E1"))
        .script_credit(ok_escrow("R1"));
    let casino = ScriptedCasino::new().script_transfer(RemoteOutcome::TimedOut);

    let record = exchange::run_deposit(&db, &escrow, &casino, &notifier(), &user, &link, 500)
        .await
        .unwrap();

    // A timed-out leg is a distinct, retryable failure, never success
    assert_eq!(record.status, ExchangeStatus::Failed.as_str());
    assert!(record.failure_reason.as_deref().unwrap().contains("timeout"));
    assert_eq!(record.compensation_tx_id.as_deref(), Some("R1"));
}

#[tokio::test]
async fn simulated_link_completes_without_ledger_calls() {
    let db = setup_test_db().await.expect("test db");
    let user = create_test_user(&db, None).await.unwrap();
    let link = create_test_link(&db, user.id, LinkStatus::Simulated).await.unwrap();

    let escrow = ScriptedEscrow::new();
    let casino = ScriptedCasino::new();

    let record = exchange::run_deposit(&db, &escrow, &casino, &notifier(), &user, &link, 500)
        .await
        .unwrap();

    assert_eq!(record.status, ExchangeStatus::Completed.as_str());
    assert!(record.casino_tx_id.as_deref().unwrap().starts_with("sim-"));
    assert!(escrow.calls().is_empty());
    assert!(casino.transfers().is_empty());
}

// ---------- withdrawals (sell: chip -> token) ----------

#[tokio::test]
async fn withdraw_happy_path_completes() {
    let db = setup_test_db().await.expect("test db");
    let user = create_test_user(&db, None).await.unwrap();
    let link = create_test_link(&db, user.id, LinkStatus::Verified).await.unwrap();

    let escrow = ScriptedEscrow::new().script_credit(ok_escrow("E1"));
    let casino = ScriptedCasino::new().script_transfer(ok_casino("C1"));

    let record = exchange::run_withdraw(&db, &escrow, &casino, &notifier(), &user, &link, 300)
        .await
        .unwrap();

    assert_eq!(record.status, ExchangeStatus::Completed.as_str());
    assert_eq!(record.escrow_tx_id.as_deref(), Some("E1"));
    assert_eq!(record.casino_tx_id.as_deref(), Some("C1"));

    // Chip debit is the negative of the requested amount, same nonce
    let transfers = casino.transfers();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].signed_amount, -300);
    assert_eq!(transfers[0].nonce, record.nonce);

    // The payout credited the user's handle in full
    assert_eq!(escrow.net_for(&user.username), 300);
}

#[tokio::test]
async fn withdraw_casino_failure_fails_with_nothing_moved() {
    let db = setup_test_db().await.expect("test db");
    let user = create_test_user(&db, None).await.unwrap();
    let link = create_test_link(&db, user.id, LinkStatus::Verified).await.unwrap();

    let escrow = ScriptedEscrow::new();
    let casino = ScriptedCasino::new()
        .script_transfer(RemoteOutcome::Rejected("insufficient chips".into()));

    let record = exchange::run_withdraw(&db, &escrow, &casino, &notifier(), &user, &link, 300)
        .await
        .unwrap();

    assert_eq!(record.status, ExchangeStatus::Failed.as_str());
    assert_eq!(record.failed_leg.as_deref(), Some("casino"));
    assert!(escrow.calls().is_empty());
}

#[tokio::test]
async fn withdraw_payout_failure_redeposits_chips() {
    let db = setup_test_db().await.expect("test db");
    let user = create_test_user(&db, None).await.unwrap();
    let link = create_test_link(&db, user.id, LinkStatus::Verified).await.unwrap();

    let escrow = ScriptedEscrow::new()
        .script_credit(RemoteOutcome::Rejected("escrow underfunded".into()));
    let casino = ScriptedCasino::new()
        .script_transfer(ok_casino("C1"))
        .script_transfer(ok_casino("C2"));

    let record = exchange::run_withdraw(&db, &escrow, &casino, &notifier(), &user, &link, 300)
        .await
        .unwrap();

    assert_eq!(record.status, ExchangeStatus::Failed.as_str());
    assert_eq!(record.compensation_tx_id.as_deref(), Some("C2"));
    assert_eq!(record.compensation_attempts, 1);

    // The re-credit mirrors the debit under the derived nonce
    let transfers = casino.transfers();
    assert_eq!(transfers.len(), 2);
    assert_eq!(transfers[0].signed_amount, -300);
    assert_eq!(transfers[1].signed_amount, 300);
    assert_eq!(transfers[1].nonce, compensation_nonce(&record.nonce));

    // Chip balance net zero, and no token payout happened
    let net_chips: i64 = transfers.iter().map(|t| t.signed_amount).sum();
    assert_eq!(net_chips, 0);
    assert_eq!(escrow.net_for(&user.username), 0);
}

#[tokio::test]
async fn withdraw_double_failure_escalates_to_manual() {
    let db = setup_test_db().await.expect("test db");
    let user = create_test_user(&db, None).await.unwrap();
    let link = create_test_link(&db, user.id, LinkStatus::Verified).await.unwrap();

    let escrow = ScriptedEscrow::new()
        .script_credit(RemoteOutcome::Rejected("escrow underfunded".into()));
    let casino = ScriptedCasino::new()
        .script_transfer(ok_casino("C1"))
        .script_transfer(RemoteOutcome::TimedOut);

    let record = exchange::run_withdraw(&db, &escrow, &casino, &notifier(), &user, &link, 300)
        .await
        .unwrap();

    // The user is owed 300 token units pending operator action
    assert_eq!(record.status, ExchangeStatus::ManualRequired.as_str());
    let reason = record.failure_reason.as_deref().unwrap();
    assert!(reason.contains("escrow underfunded"));
    assert!(reason.contains("timeout"));
    assert_eq!(record.casino_tx_id.as_deref(), Some("C1"));
}

// ---------- operator resolution ----------

#[tokio::test]
async fn manual_required_records_resolve_exactly_once() {
    let db = setup_test_db().await.expect("test db");
    let user = create_test_user(&db, None).await.unwrap();
    let link = create_test_link(&db, user.id, LinkStatus::Verified).await.unwrap();

    let escrow = ScriptedEscrow::new()
        .script_credit(RemoteOutcome::Rejected("escrow underfunded".into()));
    let casino = ScriptedCasino::new()
        .script_transfer(ok_casino("C1"))
        .script_transfer(RemoteOutcome::Rejected("bridge down".into()));

    let record = exchange::run_withdraw(&db, &escrow, &casino, &notifier(), &user, &link, 300)
        .await
        .unwrap();
    assert_eq!(record.status, ExchangeStatus::ManualRequired.as_str());

    let resolved =
        exchange_store::resolve(&db, record.id, "credited", Some("paid out by hand"), 7)
            .await
            .unwrap();
    assert_eq!(resolved.resolution.as_deref(), Some("credited: paid out by hand"));
    assert_eq!(resolved.resolved_by, Some(7));

    // Frozen: a second resolution is refused
    let again = exchange_store::resolve(&db, record.id, "credited", None, 7).await;
    assert!(again.is_err());
}

#[tokio::test]
async fn completed_records_cannot_be_resolved() {
    let db = setup_test_db().await.expect("test db");
    let user = create_test_user(&db, None).await.unwrap();
    let link = create_test_link(&db, user.id, LinkStatus::Verified).await.unwrap();

    let escrow = ScriptedEscrow::new().script_debit(ok_escrow("E1"));
    let casino = ScriptedCasino::new().script_transfer(ok_casino("C1"));

    let record = exchange::run_deposit(&db, &escrow, &casino, &notifier(), &user, &link, 500)
        .await
        .unwrap();

    let result = exchange_store::resolve(&db, record.id, "refunded", None, 7).await;
    assert!(result.is_err());
}

// ---------- PIN gate ----------

#[tokio::test]
async fn five_bad_pins_lock_and_the_sixth_consumes_no_slot() {
    use payverse_backend::services::pin_gate::{self, PinCheck};

    let db = setup_test_db().await.expect("test db");
    let mut user = create_test_user(&db, Some("4321")).await.unwrap();

    for attempt in 1..=4 {
        let check = pin_gate::authorize(&db, &user, Some("0000")).await.unwrap();
        assert_eq!(check, PinCheck::Invalid(5 - attempt));
        user = payverse_backend::entities::users::Entity::find_by_id(user.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
    }

    // Fifth miss locks the gate
    let check = pin_gate::authorize(&db, &user, Some("0000")).await.unwrap();
    assert!(matches!(check, PinCheck::Locked(_)));

    user = payverse_backend::entities::users::Entity::find_by_id(user.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.pin_failed_attempts, 5);

    // Sixth attempt during lockout: refused, counter untouched, even with
    // the correct PIN
    let check = pin_gate::authorize(&db, &user, Some("4321")).await.unwrap();
    assert!(matches!(check, PinCheck::Locked(_)));

    user = payverse_backend::entities::users::Entity::find_by_id(user.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.pin_failed_attempts, 5);
}

#[tokio::test]
async fn correct_pin_resets_the_failure_counter() {
    use payverse_backend::services::pin_gate::{self, PinCheck};

    let db = setup_test_db().await.expect("test db");
    let mut user = create_test_user(&db, Some("4321")).await.unwrap();

    let check = pin_gate::authorize(&db, &user, Some("9999")).await.unwrap();
    assert_eq!(check, PinCheck::Invalid(4));

    user = payverse_backend::entities::users::Entity::find_by_id(user.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();

    let check = pin_gate::authorize(&db, &user, Some("4321")).await.unwrap();
    assert_eq!(check, PinCheck::Ok);

    user = payverse_backend::entities::users::Entity::find_by_id(user.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.pin_failed_attempts, 0);
}

#[tokio::test]
async fn missing_pin_state_is_distinguished_from_a_wrong_pin() {
    use payverse_backend::services::pin_gate::{self, PinCheck};

    let db = setup_test_db().await.expect("test db");
    let user = create_test_user(&db, None).await.unwrap();

    let check = pin_gate::authorize(&db, &user, Some("4321")).await.unwrap();
    assert_eq!(check, PinCheck::NotSet);

    let user = create_test_user(&db, Some("4321")).await.unwrap();
    let check = pin_gate::authorize(&db, &user, None).await.unwrap();
    assert_eq!(check, PinCheck::Required);
}

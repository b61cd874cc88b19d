use axum::Json;
use axum::extract::{Path, State};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, Set};

use crate::AppState;
use crate::auth::AuthUser;
use crate::entities::{casino_links, prelude::*};
use crate::error::WalletError;
use crate::models::casino::{
    CasinoBalanceResponse, ChallengeKindView, ConnectRequest, ConnectResponse, LinkStatus,
    LinkView, VerifyRequest,
};
use crate::models::common::OkResponse;
use crate::models::exchange::{
    ExchangeRequest, ExchangeResponse, ExchangeStatus, TransactionView,
};
use crate::services::casino_api::CasinoLedger;
use crate::services::verification::{self, CheckOutcome};
use crate::services::{exchange, exchange_store};

/// Start linking a casino account: resolve ownership, then issue the
/// verification challenge appropriate for the account kind.
pub async fn connect(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<ConnectRequest>,
) -> Result<Json<ConnectResponse>, WalletError> {
    let issued = verification::issue(
        &state.challenges,
        &state.casino,
        &state.config.agent_pools,
        user.id,
        &req.casino_username,
        req.preferred_kind,
    )
    .await?;

    let (challenge, message) = if issued.mailed {
        (
            ChallengeKindView::MailedCode,
            "A 6-digit code was sent to your casino inbox. Submit it to finish linking.",
        )
    } else {
        (
            ChallengeKindView::CurrentBalance,
            "Submit your current casino chip balance exactly as shown in your account.",
        )
    };

    Ok(Json(ConnectResponse {
        casino_username: issued.canonical_username,
        account_kind: issued.kind,
        challenge,
        message: message.to_string(),
    }))
}

/// Check the challenge; on success write the link, superseding any
/// previous one.
pub async fn verify(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<LinkView>, WalletError> {
    let (outcome, meta) = state
        .challenges
        .check(user.id, &req.casino_username, &req.value);

    match outcome {
        CheckOutcome::Verified => {}
        CheckOutcome::Invalid => return Err(WalletError::ChallengeInvalid),
        CheckOutcome::Expired => return Err(WalletError::ChallengeExpired),
    }
    let meta = meta.ok_or_else(|| WalletError::Internal("challenge metadata missing".into()))?;

    if let Some(existing) = CasinoLinks::find()
        .filter(casino_links::Column::UserId.eq(user.id))
        .one(&state.db)
        .await?
    {
        existing.delete(&state.db).await?;
    }

    let link = casino_links::ActiveModel {
        user_id: Set(user.id),
        casino_username: Set(meta.canonical_username),
        casino_client_id: Set(meta.client_id),
        agent_pool: Set(meta.pool),
        account_kind: Set(meta.kind.as_str().to_string()),
        status: Set(LinkStatus::Verified.as_str().to_string()),
        hierarchy_snapshot: Set(Some(meta.hierarchy_snapshot)),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    tracing::info!(
        "user {} linked casino account {} via pool {}",
        user.id,
        link.casino_username,
        link.agent_pool
    );

    Ok(Json(link.into()))
}

pub async fn get_link(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<LinkView>, WalletError> {
    let link = CasinoLinks::find()
        .filter(casino_links::Column::UserId.eq(user.id))
        .one(&state.db)
        .await?
        .ok_or(WalletError::NotFound("casino link"))?;

    Ok(Json(link.into()))
}

pub async fn disconnect(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<OkResponse>, WalletError> {
    let link = CasinoLinks::find()
        .filter(casino_links::Column::UserId.eq(user.id))
        .one(&state.db)
        .await?
        .ok_or(WalletError::NotFound("casino link"))?;

    link.delete(&state.db).await?;
    Ok(Json(OkResponse { ok: true }))
}

pub async fn balance(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<CasinoBalanceResponse>, WalletError> {
    let link = CasinoLinks::find()
        .filter(casino_links::Column::UserId.eq(user.id))
        .one(&state.db)
        .await?
        .ok_or(WalletError::NotLinked)?;

    let stats = state
        .casino
        .statistics_of(&link.agent_pool, &link.casino_username)
        .await?
        .into_result()?;

    Ok(Json(CasinoBalanceResponse {
        casino_username: link.casino_username,
        balance: stats.current_balance.to_string(),
    }))
}

fn exchange_response(
    record: crate::entities::casino_transactions::Model,
) -> Result<Json<ExchangeResponse>, WalletError> {
    let status = ExchangeStatus::parse(&record.status)
        .ok_or_else(|| WalletError::Internal(format!("unknown status '{}'", record.status)))?;
    let message = exchange::outcome_message(&record);

    Ok(Json(ExchangeResponse {
        transaction_id: record.id,
        reference: record.nonce,
        status,
        amount: record.amount,
        message,
    }))
}

/// Buy chips: token -> chip saga.
pub async fn deposit(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<ExchangeRequest>,
) -> Result<Json<ExchangeResponse>, WalletError> {
    let record = exchange::deposit(&state, &user, &req).await?;
    exchange_response(record)
}

/// Sell chips: chip -> token saga.
pub async fn withdraw(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<ExchangeRequest>,
) -> Result<Json<ExchangeResponse>, WalletError> {
    let record = exchange::withdraw(&state, &user, &req).await?;
    exchange_response(record)
}

pub async fn list_transactions(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<TransactionView>>, WalletError> {
    let records = exchange_store::find_for_user(&state.db, user.id).await?;
    Ok(Json(records.into_iter().map(TransactionView::from).collect()))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<TransactionView>, WalletError> {
    let record = exchange_store::find_one_for_user(&state.db, id, user.id)
        .await?
        .ok_or(WalletError::NotFound("transaction"))?;

    Ok(Json(record.into()))
}

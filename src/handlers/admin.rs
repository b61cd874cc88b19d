use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

use crate::AppState;
use crate::auth::require_operator;
use crate::entities::{app_settings, prelude::*};
use crate::error::WalletError;
use crate::models::admin::{
    EscalatedTransaction, PendingTransactionsResponse, ResolveRequest, ResolveResponse,
    SettingUpsertRequest,
};
use crate::models::common::OkResponse;
use crate::models::exchange::ExchangeStatus;
use crate::services::exchange_store;

/// Records sitting still for longer than this are surfaced as stuck.
const STUCK_CUTOFF_MINUTES: i64 = 15;

/// Escalation queue: everything needing a human plus non-terminal records
/// that stopped moving (likely a crash mid-saga).
pub async fn pending(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<PendingTransactionsResponse>, WalletError> {
    require_operator(&headers, &state.config)?;

    let manual_required =
        exchange_store::find_by_status(&state.db, ExchangeStatus::ManualRequired)
            .await?
            .into_iter()
            .map(EscalatedTransaction::from)
            .collect();

    let stuck = exchange_store::find_stuck(&state.db, STUCK_CUTOFF_MINUTES)
        .await?
        .into_iter()
        .map(EscalatedTransaction::from)
        .collect();

    Ok(Json(PendingTransactionsResponse {
        manual_required,
        stuck,
    }))
}

pub async fn resolve(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, WalletError> {
    require_operator(&headers, &state.config)?;

    // Operator id 0: the console authenticates with a shared secret, not
    // a user session
    let record = exchange_store::resolve(
        &state.db,
        req.transaction_id,
        &req.outcome,
        req.note.as_deref(),
        0,
    )
    .await?;

    Ok(Json(ResolveResponse {
        transaction: record.into(),
        message: "Transaction resolved and frozen.".to_string(),
    }))
}

/// Upsert an app setting. Agent tokens live here; the credential cache is
/// invalidated so the new value is picked up within the same request.
pub async fn upsert_setting(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SettingUpsertRequest>,
) -> Result<Json<OkResponse>, WalletError> {
    require_operator(&headers, &state.config)?;

    if req.key.trim().is_empty() {
        return Err(WalletError::Validation("setting key must not be empty".into()));
    }

    let existing = AppSettings::find()
        .filter(app_settings::Column::Key.eq(&req.key))
        .one(&state.db)
        .await?;

    match existing {
        Some(row) => {
            let mut active: app_settings::ActiveModel = row.into();
            active.value = Set(req.value);
            active.updated_at = Set(Utc::now().naive_utc());
            active.update(&state.db).await?;
        }
        None => {
            app_settings::ActiveModel {
                key: Set(req.key.clone()),
                value: Set(req.value),
                updated_at: Set(Utc::now().naive_utc()),
                ..Default::default()
            }
            .insert(&state.db)
            .await?;
        }
    }

    state.tokens.invalidate();
    tracing::info!("setting '{}' updated, token cache invalidated", req.key);

    Ok(Json(OkResponse { ok: true }))
}

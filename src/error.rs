use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDateTime;
use thiserror::Error;

use crate::models::common::ErrorResponse;

/// Error taxonomy for the exchange core.
///
/// Validation, authorization and pre-flight failures are returned to the
/// caller before any saga record exists. Failures after leg one of a saga
/// are recorded on the transaction row instead and never surface here.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("{0}")]
    Validation(String),

    #[error("no credential available for agent pool '{0}'")]
    PoolUnavailable(String),

    #[error("casino account not found under any configured agent")]
    AccountNotFound,

    #[error("no verified casino account link")]
    NotLinked,

    #[error("verification challenge expired")]
    ChallengeExpired,

    #[error("verification challenge invalid")]
    ChallengeInvalid,

    #[error("no transaction PIN set")]
    PinNotSet,

    #[error("transaction PIN required")]
    PinRequired,

    #[error("PIN locked until {0}")]
    PinLocked(NaiveDateTime),

    #[error("invalid PIN, {0} attempt(s) remaining")]
    PinInvalid(i32),

    #[error("insufficient balance: {0}")]
    InsufficientBalance(String),

    #[error("remote call timed out")]
    RemoteTimeout,

    #[error("remote authentication rejected: {0}")]
    RemoteAuthRejected(String),

    #[error("remote rejected the operation: {0}")]
    RemoteBusinessRejected(String),

    #[error("illegal status transition {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    #[error("operation requires manual reconciliation, reference {0}")]
    CompensationFailed(i32),

    #[error("unauthorized")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl WalletError {
    fn status_code(&self) -> StatusCode {
        match self {
            WalletError::Validation(_) | WalletError::PinRequired => StatusCode::BAD_REQUEST,
            WalletError::Unauthorized => StatusCode::UNAUTHORIZED,
            WalletError::PinNotSet
            | WalletError::PinLocked(_)
            | WalletError::PinInvalid(_)
            | WalletError::ChallengeExpired
            | WalletError::ChallengeInvalid => StatusCode::FORBIDDEN,
            WalletError::AccountNotFound
            | WalletError::NotLinked
            | WalletError::NotFound(_) => StatusCode::NOT_FOUND,
            WalletError::InsufficientBalance(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WalletError::PoolUnavailable(_) | WalletError::RemoteAuthRejected(_) => {
                StatusCode::BAD_GATEWAY
            }
            WalletError::RemoteTimeout => StatusCode::GATEWAY_TIMEOUT,
            WalletError::RemoteBusinessRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WalletError::CompensationFailed(_) => StatusCode::CONFLICT,
            WalletError::IllegalTransition { .. }
            | WalletError::Internal(_)
            | WalletError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WalletError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

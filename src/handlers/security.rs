use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::WalletError;
use crate::models::security::{
    PinActionResponse, PinChangeRequest, PinSetupRequest, PinVerifyRequest, SecurityStatusResponse,
};
use crate::services::pin_gate;

pub async fn pin_setup(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<PinSetupRequest>,
) -> Result<Json<PinActionResponse>, WalletError> {
    if user.pin_hash.is_some() {
        return Err(WalletError::Validation(
            "a PIN is already set; use the change endpoint".to_string(),
        ));
    }

    pin_gate::set_pin(&state.db, &user, &req.pin).await?;
    Ok(Json(PinActionResponse {
        ok: true,
        message: "Transaction PIN set.".to_string(),
    }))
}

/// Changing the PIN goes through the same gate as money movement, so a
/// locked gate blocks changes too.
pub async fn pin_change(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<PinChangeRequest>,
) -> Result<Json<PinActionResponse>, WalletError> {
    pin_gate::require(&state.db, &user, Some(&req.current_pin)).await?;
    pin_gate::set_pin(&state.db, &user, &req.new_pin).await?;

    Ok(Json(PinActionResponse {
        ok: true,
        message: "Transaction PIN changed.".to_string(),
    }))
}

pub async fn pin_verify(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<PinVerifyRequest>,
) -> Result<Json<PinActionResponse>, WalletError> {
    pin_gate::require(&state.db, &user, Some(&req.pin)).await?;
    Ok(Json(PinActionResponse {
        ok: true,
        message: "PIN verified.".to_string(),
    }))
}

pub async fn status(
    State(_state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<SecurityStatusResponse>, WalletError> {
    Ok(Json(SecurityStatusResponse {
        pin_set: user.pin_hash.is_some(),
        locked_until: user.pin_locked_until.map(|t| t.to_string()),
        failed_attempts: user.pin_failed_attempts,
    }))
}

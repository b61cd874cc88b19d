//! Session boundary.
//!
//! Registration and login live in the surrounding CRUD layer; the
//! exchange core only needs an authenticated user per request, resolved
//! here from the bearer session token. Operator console routes use a
//! static shared secret instead of the session layer.

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use crate::AppState;
use crate::config::AppConfig;
use crate::entities::{prelude::*, users};
use crate::error::WalletError;

pub struct AuthUser(pub users::Model);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = WalletError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(WalletError::Unauthorized)?;

        let user = Users::find()
            .filter(users::Column::SessionToken.eq(token))
            .one(&state.db)
            .await?
            .ok_or(WalletError::Unauthorized)?;

        Ok(AuthUser(user))
    }
}

/// Operator console auth: static shared secret in `X-Operator-Token`.
/// Refuses everything when no operator token is configured.
pub fn require_operator(headers: &HeaderMap, config: &AppConfig) -> Result<(), WalletError> {
    let expected = config
        .operator_token
        .as_deref()
        .ok_or(WalletError::Unauthorized)?;
    let supplied = headers.get("x-operator-token").and_then(|v| v.to_str().ok());

    if supplied == Some(expected) {
        Ok(())
    } else {
        Err(WalletError::Unauthorized)
    }
}

//! Transaction PIN gate.
//!
//! Shared precondition for every money-movement path. State is two
//! persisted fields on the user row: the consecutive-failure counter and
//! the lockout deadline. Five consecutive misses lock the gate for 30
//! minutes; attempts during lockout are refused without consuming a slot.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{Duration, NaiveDateTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

use crate::entities::users;
use crate::error::WalletError;

pub const MAX_ATTEMPTS: i32 = 5;
pub const LOCKOUT_MINUTES: i64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub enum PinCheck {
    Ok,
    NotSet,
    Required,
    Locked(NaiveDateTime),
    Invalid(i32),
}

pub fn validate_pin_format(pin: &str) -> Result<(), WalletError> {
    if pin.len() < 4 || pin.len() > 6 || !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(WalletError::Validation(
            "PIN must be 4 to 6 digits".to_string(),
        ));
    }
    Ok(())
}

pub fn hash_pin(pin: &str) -> Result<String, WalletError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| WalletError::Internal(format!("pin hashing failed: {}", e)))
}

fn verify_hash(hash: &str, pin: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(pin.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

pub async fn authorize(
    db: &DatabaseConnection,
    user: &users::Model,
    supplied: Option<&str>,
) -> Result<PinCheck, WalletError> {
    let hash = match &user.pin_hash {
        Some(h) => h.clone(),
        None => return Ok(PinCheck::NotSet),
    };

    // Lockout check comes first so a locked gate never consumes attempts
    if let Some(until) = user.pin_locked_until {
        if until > Utc::now().naive_utc() {
            return Ok(PinCheck::Locked(until));
        }
    }

    let supplied = match supplied {
        Some(p) if !p.is_empty() => p,
        _ => return Ok(PinCheck::Required),
    };

    if verify_hash(&hash, supplied) {
        if user.pin_failed_attempts != 0 || user.pin_locked_until.is_some() {
            let mut active: users::ActiveModel = user.clone().into();
            active.pin_failed_attempts = Set(0);
            active.pin_locked_until = Set(None);
            active.update(db).await?;
        }
        return Ok(PinCheck::Ok);
    }

    let attempts = user.pin_failed_attempts + 1;
    let mut active: users::ActiveModel = user.clone().into();
    active.pin_failed_attempts = Set(attempts);

    if attempts >= MAX_ATTEMPTS {
        let until = (Utc::now() + Duration::minutes(LOCKOUT_MINUTES)).naive_utc();
        active.pin_locked_until = Set(Some(until));
        active.update(db).await?;
        tracing::warn!(
            "user {} PIN locked until {} after {} failed attempts",
            user.id,
            until,
            attempts
        );
        Ok(PinCheck::Locked(until))
    } else {
        active.update(db).await?;
        Ok(PinCheck::Invalid(MAX_ATTEMPTS - attempts))
    }
}

/// `authorize` mapped onto the error taxonomy, for paths that must not
/// proceed past a failed gate.
pub async fn require(
    db: &DatabaseConnection,
    user: &users::Model,
    supplied: Option<&str>,
) -> Result<(), WalletError> {
    match authorize(db, user, supplied).await? {
        PinCheck::Ok => Ok(()),
        PinCheck::NotSet => Err(WalletError::PinNotSet),
        PinCheck::Required => Err(WalletError::PinRequired),
        PinCheck::Locked(until) => Err(WalletError::PinLocked(until)),
        PinCheck::Invalid(remaining) => Err(WalletError::PinInvalid(remaining)),
    }
}

/// Hash and store a new PIN, clearing any failure state.
pub async fn set_pin(
    db: &DatabaseConnection,
    user: &users::Model,
    pin: &str,
) -> Result<users::Model, WalletError> {
    validate_pin_format(pin)?;
    let hash = hash_pin(pin)?;

    let mut active: users::ActiveModel = user.clone().into();
    active.pin_hash = Set(Some(hash));
    active.pin_failed_attempts = Set(0);
    active.pin_locked_until = Set(None);
    Ok(active.update(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_roundtrip() {
        let hash = hash_pin("4321").unwrap();
        assert!(verify_hash(&hash, "4321"));
        assert!(!verify_hash(&hash, "1234"));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_hash("not-a-phc-string", "1234"));
    }

    #[test]
    fn pin_format_rules() {
        assert!(validate_pin_format("1234").is_ok());
        assert!(validate_pin_format("123456").is_ok());
        assert!(validate_pin_format("123").is_err());
        assert!(validate_pin_format("1234567").is_err());
        assert!(validate_pin_format("12a4").is_err());
    }
}

//! Shared result shape for outbound ledger calls.
//!
//! Expected remote failure modes are values, not errors: a timeout, an
//! auth rejection, or a remote-declared business rejection all come back
//! as variants so callers can decide whether to compensate, retry, or
//! report. Only local misconfiguration (a missing pool credential)
//! surfaces as a `WalletError`.

use crate::error::WalletError;

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOutcome<T> {
    Success(T),
    /// The remote explicitly rejected our credential
    AuthRejected(String),
    /// Any other remote-declared or transport-level failure
    Rejected(String),
    /// The call exceeded its deadline; retryable, never treated as success
    TimedOut,
}

impl<T> RemoteOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, RemoteOutcome::Success(_))
    }

    /// Short reason string recorded on saga records for non-success outcomes.
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            RemoteOutcome::Success(_) => None,
            RemoteOutcome::AuthRejected(msg) => Some(format!("auth rejected: {}", msg)),
            RemoteOutcome::Rejected(msg) => Some(msg.clone()),
            RemoteOutcome::TimedOut => Some("timeout".to_string()),
        }
    }

    /// Convert a non-success outcome into the matching caller-facing error.
    /// Used on pre-flight paths, before any saga record exists.
    pub fn into_result(self) -> Result<T, WalletError> {
        match self {
            RemoteOutcome::Success(v) => Ok(v),
            RemoteOutcome::AuthRejected(msg) => Err(WalletError::RemoteAuthRejected(msg)),
            RemoteOutcome::Rejected(msg) => Err(WalletError::RemoteBusinessRejected(msg)),
            RemoteOutcome::TimedOut => Err(WalletError::RemoteTimeout),
        }
    }

    /// Split into the success value or the same outcome under a new payload
    /// type, so endpoint wrappers can early-return non-success variants.
    pub fn split<U>(self) -> Result<T, RemoteOutcome<U>> {
        match self {
            RemoteOutcome::Success(v) => Ok(v),
            RemoteOutcome::AuthRejected(m) => Err(RemoteOutcome::AuthRejected(m)),
            RemoteOutcome::Rejected(m) => Err(RemoteOutcome::Rejected(m)),
            RemoteOutcome::TimedOut => Err(RemoteOutcome::TimedOut),
        }
    }

}

/// Map a reqwest transport error into the outcome shape.
pub fn transport_outcome<T>(err: reqwest::Error) -> RemoteOutcome<T> {
    if err.is_timeout() {
        RemoteOutcome::TimedOut
    } else {
        RemoteOutcome::Rejected(format!("transport error: {}", err))
    }
}

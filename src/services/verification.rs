//! Casino account ownership verification.
//!
//! Issuing a challenge first resolves which agent pool owns the account,
//! then proves possession one of two ways: agents get a 6-digit code
//! pushed through the casino's own mail channel; players (no reliable
//! mail channel) must reproduce their account's current chip balance as
//! captured at issuance. One live challenge per (user, account) key,
//! 10-minute expiry checked on read, consumed on successful check.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, Utc};
use parking_lot::RwLock;
use rand::Rng;
use rust_decimal::Decimal;

use crate::error::WalletError;
use crate::models::casino::AccountKind;
use crate::services::agent_resolver;
use crate::services::casino_api::CasinoLedger;

pub const CHALLENGE_TTL_MINUTES: i64 = 10;

/// Resolution metadata captured at issuance, handed back on successful
/// verification so the link can be written without a second resolve.
#[derive(Debug, Clone)]
pub struct ChallengeMeta {
    pub pool: String,
    pub client_id: i64,
    pub canonical_username: String,
    pub kind: AccountKind,
    pub hierarchy_snapshot: serde_json::Value,
}

#[derive(Debug, Clone)]
enum Proof {
    Code(String),
    Balance(Decimal),
}

#[derive(Debug, Clone)]
struct Challenge {
    proof: Proof,
    expires_at: NaiveDateTime,
    meta: ChallengeMeta,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    Verified,
    Invalid,
    Expired,
}

#[derive(Clone, Default)]
pub struct ChallengeStore {
    inner: Arc<RwLock<HashMap<(i32, String), Challenge>>>,
}

impl ChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(user_id: i32, username: &str) -> (i32, String) {
        (user_id, username.to_lowercase())
    }

    /// Replaces any live challenge under the same key.
    fn put(&self, user_id: i32, username: &str, challenge: Challenge) {
        self.inner
            .write()
            .insert(Self::key(user_id, username), challenge);
    }

    pub(crate) fn put_code(
        &self,
        user_id: i32,
        username: &str,
        code: String,
        expires_at: NaiveDateTime,
        meta: ChallengeMeta,
    ) {
        self.put(
            user_id,
            username,
            Challenge {
                proof: Proof::Code(code),
                expires_at,
                meta,
            },
        );
    }

    pub(crate) fn put_balance(
        &self,
        user_id: i32,
        username: &str,
        balance: Decimal,
        expires_at: NaiveDateTime,
        meta: ChallengeMeta,
    ) {
        self.put(
            user_id,
            username,
            Challenge {
                proof: Proof::Balance(balance),
                expires_at,
                meta,
            },
        );
    }

    /// Check a submitted value against the live challenge for the key.
    ///
    /// Expiry wins over correctness; a successful check consumes the
    /// challenge and returns its resolution metadata.
    pub fn check(
        &self,
        user_id: i32,
        username: &str,
        submitted: &str,
    ) -> (CheckOutcome, Option<ChallengeMeta>) {
        let key = Self::key(user_id, username);
        let mut map = self.inner.write();

        let challenge = match map.get(&key) {
            Some(c) => c.clone(),
            None => return (CheckOutcome::Invalid, None),
        };

        if Utc::now().naive_utc() > challenge.expires_at {
            map.remove(&key);
            return (CheckOutcome::Expired, None);
        }

        let matches = match &challenge.proof {
            Proof::Code(code) => submitted.trim() == code,
            Proof::Balance(captured) => match submitted.trim().parse::<Decimal>() {
                // Possession proof: only the account holder can read the
                // live balance at issuance time. Exact to 2 decimal places.
                Ok(claimed) => claimed.round_dp(2) == captured.round_dp(2),
                Err(_) => false,
            },
        };

        if matches {
            map.remove(&key);
            (CheckOutcome::Verified, Some(challenge.meta))
        } else {
            (CheckOutcome::Invalid, None)
        }
    }
}

/// What the caller is told after issuing a challenge.
#[derive(Debug, Clone)]
pub struct IssuedChallenge {
    pub kind: AccountKind,
    pub canonical_username: String,
    pub mailed: bool,
}

pub async fn issue(
    store: &ChallengeStore,
    casino: &dyn CasinoLedger,
    pools: &[String],
    user_id: i32,
    username: &str,
    preferred_kind: Option<AccountKind>,
) -> Result<IssuedChallenge, WalletError> {
    let resolved = agent_resolver::resolve(casino, pools, username, preferred_kind).await?;

    let meta = ChallengeMeta {
        pool: resolved.pool.clone(),
        client_id: resolved.client_id,
        canonical_username: resolved.canonical_username.clone(),
        kind: resolved.kind,
        hierarchy_snapshot: serde_json::to_value(&resolved.ancestors)
            .unwrap_or(serde_json::Value::Null),
    };
    let expires_at = (Utc::now() + Duration::minutes(CHALLENGE_TTL_MINUTES)).naive_utc();

    match resolved.kind {
        AccountKind::Agent => {
            let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
            let body = format!(
                "Your wallet verification code is {}. It expires in {} minutes.",
                code, CHALLENGE_TTL_MINUTES
            );

            // Out-of-band delivery: only the account holder can read it
            casino
                .send_message(
                    &resolved.pool,
                    &resolved.canonical_username,
                    resolved.client_id,
                    "Account verification",
                    &body,
                )
                .await?
                .into_result()?;

            store.put_code(user_id, username, code, expires_at, meta);
            tracing::info!(
                "issued mailed-code challenge for user {} / {}",
                user_id,
                username
            );

            Ok(IssuedChallenge {
                kind: AccountKind::Agent,
                canonical_username: resolved.canonical_username,
                mailed: true,
            })
        }
        AccountKind::Player => {
            let stats = casino
                .statistics_of(&resolved.pool, &resolved.canonical_username)
                .await?
                .into_result()?;

            store.put_balance(user_id, username, stats.current_balance, expires_at, meta);
            tracing::info!(
                "issued balance challenge for user {} / {}",
                user_id,
                username
            );

            Ok(IssuedChallenge {
                kind: AccountKind::Player,
                canonical_username: resolved.canonical_username,
                mailed: false,
            })
        }
    }
}

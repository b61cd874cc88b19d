//! Agent ownership discovery.
//!
//! A casino account belongs to exactly one of the configured agent pools.
//! To find which, we query every pool's hierarchy endpoint concurrently
//! (each pool authenticates as itself) and look for the pool's own
//! identity at the third ancestor level of the returned chain. Player
//! accounts are tried before agent accounts unless the caller prefers
//! otherwise. Read-only and safe to repeat.

use futures_util::future::join_all;

use crate::error::WalletError;
use crate::models::casino::AccountKind;
use crate::services::casino_api::{CasinoLedger, HierarchyInfo};
use crate::services::remote::RemoteOutcome;

/// Ancestor level that must match the pool's own identity for a claim.
const OWNER_ANCESTOR_LEVEL: usize = 2;

#[derive(Debug, Clone)]
pub struct ResolvedAccount {
    pub pool: String,
    pub client_id: i64,
    pub canonical_username: String,
    pub kind: AccountKind,
    pub ancestors: Vec<crate::services::casino_api::HierarchyNode>,
}

fn pool_claims(pool: &str, info: &HierarchyInfo) -> bool {
    info.ancestors
        .get(OWNER_ANCESTOR_LEVEL)
        .map(|node| node.username.eq_ignore_ascii_case(pool))
        .unwrap_or(false)
}

pub async fn resolve(
    casino: &dyn CasinoLedger,
    pools: &[String],
    username: &str,
    preferred_kind: Option<AccountKind>,
) -> Result<ResolvedAccount, WalletError> {
    let kinds = match preferred_kind {
        Some(AccountKind::Agent) => [AccountKind::Agent, AccountKind::Player],
        _ => [AccountKind::Player, AccountKind::Agent],
    };

    let mut any_pool_usable = false;

    for kind in kinds {
        let lookups = pools.iter().map(|pool| async move {
            let outcome = casino.hierarchy_of(pool, username, kind).await;
            (pool.clone(), outcome)
        });

        // One query per pool, joined; ties broken by pool order below
        let results = join_all(lookups).await;

        for (pool, outcome) in results {
            match outcome {
                Err(WalletError::PoolUnavailable(_)) => {
                    tracing::warn!("skipping pool {} for {}: no credential", pool, username);
                }
                Err(e) => return Err(e),
                Ok(RemoteOutcome::Success(info)) => {
                    any_pool_usable = true;
                    if pool_claims(&pool, &info) {
                        tracing::info!(
                            "{} resolved as {} under pool {} (client id {})",
                            username,
                            kind.as_str(),
                            pool,
                            info.account_id
                        );
                        return Ok(ResolvedAccount {
                            pool,
                            client_id: info.account_id,
                            canonical_username: info.canonical_username,
                            kind,
                            ancestors: info.ancestors,
                        });
                    }
                }
                Ok(other) => {
                    any_pool_usable = true;
                    tracing::debug!(
                        "hierarchy lookup for {} via {} did not succeed: {:?}",
                        username,
                        pool,
                        other.failure_reason()
                    );
                }
            }
        }
    }

    if !any_pool_usable {
        return Err(WalletError::PoolUnavailable(pools.join(",")));
    }

    Err(WalletError::AccountNotFound)
}

//! Agent credential store.
//!
//! Resolves the bearer secret for a casino agent pool: cached value if
//! fresh, otherwise the `app_settings` row, otherwise the static token
//! from the environment. Absence is not an error; it means the pool is
//! unusable right now and callers must treat it as such.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::entities::{app_settings, prelude::*};

const TOKEN_CACHE_TTL_SECS: u64 = 30;

#[derive(Clone)]
pub struct AgentTokenStore {
    db: DatabaseConnection,
    cache: Arc<Cache<String, String>>,
    static_tokens: HashMap<String, String>,
}

impl AgentTokenStore {
    pub fn new(db: DatabaseConnection, static_tokens: HashMap<String, String>) -> Self {
        let cache = Cache::builder()
            .max_capacity(32)
            .time_to_live(Duration::from_secs(TOKEN_CACHE_TTL_SECS))
            .build();

        Self {
            db,
            cache: Arc::new(cache),
            static_tokens,
        }
    }

    /// Setting key holding the override token for a pool.
    pub fn setting_key(pool: &str) -> String {
        format!("casino_token_{}", pool.to_lowercase())
    }

    pub async fn resolve(&self, pool: &str) -> Option<String> {
        let pool = pool.to_lowercase();

        if let Some(token) = self.cache.get(&pool).await {
            tracing::debug!("token cache hit for pool {}", pool);
            return Some(token);
        }

        let stored = match AppSettings::find()
            .filter(app_settings::Column::Key.eq(Self::setting_key(&pool)))
            .one(&self.db)
            .await
        {
            Ok(row) => row.map(|r| r.value),
            Err(e) => {
                // Fall through to the static token rather than failing the call
                tracing::warn!("settings lookup failed for pool {}: {}", pool, e);
                None
            }
        };

        let token = stored.or_else(|| self.static_tokens.get(&pool).cloned());

        match &token {
            Some(t) => {
                self.cache.insert(pool, t.clone()).await;
            }
            None => {
                tracing::warn!("no token available for agent pool {}", pool);
            }
        }

        token
    }

    /// Drop all cached tokens. Called after any out-of-band settings write.
    pub fn invalidate(&self) {
        self.cache.invalidate_all();
    }
}

use std::collections::HashMap;
use std::env;

/// Runtime configuration, read once at startup from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Escrow (peso token) ledger API
    pub escrow_base_url: String,
    pub escrow_api_token: String,
    /// Pooled escrow account the service pays withdrawals out of
    pub escrow_float_account: String,

    /// Casino bridge API
    pub casino_base_url: String,
    /// Agent credential pools, in claim-priority order
    pub agent_pools: Vec<String>,
    /// Static per-pool token fallbacks (`CASINO_TOKEN_<POOL>`)
    pub static_agent_tokens: HashMap<String, String>,

    /// Timeout applied to every outbound remote call
    pub remote_timeout_secs: u64,

    /// Exchange amount band, whole peso-token units
    pub exchange_min_amount: i64,
    pub exchange_max_amount: i64,

    /// Shared secret for operator console routes
    pub operator_token: Option<String>,
    /// Optional webhook for manual-escalation alerts
    pub ops_webhook_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let agent_pools: Vec<String> = env::var("CASINO_AGENT_POOLS")
            .unwrap_or_else(|_| "marcthepogi,teammarc,bossmarc747".to_string())
            .split(',')
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        let mut static_agent_tokens = HashMap::new();
        for pool in &agent_pools {
            let var = format!("CASINO_TOKEN_{}", pool.to_uppercase());
            if let Ok(token) = env::var(&var) {
                static_agent_tokens.insert(pool.clone(), token);
            }
        }

        Self {
            escrow_base_url: env::var("PAYGRAM_API_URL")
                .unwrap_or_else(|_| "https://api.pay-gram.org".to_string()),
            escrow_api_token: env::var("PAYGRAM_API_TOKEN").unwrap_or_default(),
            escrow_float_account: env::var("ESCROW_FLOAT_ACCOUNT")
                .unwrap_or_else(|_| "payverse-escrow".to_string()),
            casino_base_url: env::var("CASINO_API_URL")
                .unwrap_or_else(|_| "https://bridge.747lc.com".to_string()),
            agent_pools,
            static_agent_tokens,
            remote_timeout_secs: parse_env("REMOTE_TIMEOUT_SECS", 30),
            exchange_min_amount: parse_env("EXCHANGE_MIN_AMOUNT", 100),
            exchange_max_amount: parse_env("EXCHANGE_MAX_AMOUNT", 50_000),
            operator_token: env::var("OPERATOR_TOKEN").ok(),
            ops_webhook_url: env::var("OPS_ALERT_WEBHOOK").ok(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

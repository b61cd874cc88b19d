//! Casino bridge client.
//!
//! Every call authenticates as one of the configured agent pools, with the
//! pool secret resolved through the credential store at call time. The get
//! and post primitives bound each request with a timeout and normalize
//! transport errors, HTTP failures and remote-declared error codes into
//! `RemoteOutcome`. A missing pool credential is the one local failure
//! mode, surfaced as `PoolUnavailable`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::WalletError;
use crate::models::casino::AccountKind;
use crate::services::agent_tokens::AgentTokenStore;
use crate::services::remote::{RemoteOutcome, transport_outcome};

// Remote-declared status codes
const REMOTE_OK: i64 = 0;
const REMOTE_AUTH_REJECTED: i64 = 401;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyNode {
    pub client_id: i64,
    pub username: String,
    pub parent_client_id: Option<i64>,
}

/// Hierarchy query result: the account itself plus its ancestor chain,
/// ordered root-first.
#[derive(Debug, Clone)]
pub struct HierarchyInfo {
    pub account_id: i64,
    pub canonical_username: String,
    pub ancestors: Vec<HierarchyNode>,
}

#[derive(Debug, Clone)]
pub struct CasinoTx {
    pub tx_id: String,
}

#[derive(Debug, Clone)]
pub struct CasinoStats {
    pub current_balance: Decimal,
    pub seven_day: Option<serde_json::Value>,
}

/// A chip transfer. Positive amount credits chips, negative debits.
/// The nonce is the saga's idempotency token and passes through untouched.
#[derive(Debug, Clone)]
pub struct ChipTransfer {
    pub username: String,
    pub signed_amount: i64,
    pub as_agent: bool,
    pub nonce: String,
    pub comment: String,
}

/// The casino ledger operations the resolver, verifier and saga depend on.
#[async_trait]
pub trait CasinoLedger: Send + Sync {
    async fn hierarchy_of(
        &self,
        pool: &str,
        username: &str,
        kind: AccountKind,
    ) -> Result<RemoteOutcome<HierarchyInfo>, WalletError>;

    async fn transfer(
        &self,
        pool: &str,
        transfer: ChipTransfer,
    ) -> Result<RemoteOutcome<CasinoTx>, WalletError>;

    async fn statistics_of(
        &self,
        pool: &str,
        username: &str,
    ) -> Result<RemoteOutcome<CasinoStats>, WalletError>;

    async fn send_message(
        &self,
        pool: &str,
        username: &str,
        client_id: i64,
        subject: &str,
        body: &str,
    ) -> Result<RemoteOutcome<()>, WalletError>;
}

#[derive(Clone)]
pub struct CasinoService {
    client: Client,
    base_url: String,
    tokens: AgentTokenStore,
    default_timeout: Duration,
}

// Per-endpoint response structs: third-party field naming is absorbed here.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HierarchyResponse {
    status: i64,
    message: Option<String>,
    hierarchy: Option<Vec<HierarchyNode>>,
    user: Option<HierarchyUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HierarchyUser {
    client_id: i64,
    username: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransferResponse {
    status: i64,
    message: Option<String>,
    transaction_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatisticsResponse {
    status: i64,
    message: Option<String>,
    current_balance: Option<Decimal>,
    seven_day: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageResponse {
    status: i64,
    message: Option<String>,
}

impl CasinoService {
    pub fn new(base_url: String, tokens: AgentTokenStore, timeout_secs: u64) -> Self {
        Self {
            client: Client::new(),
            base_url,
            tokens,
            default_timeout: Duration::from_secs(timeout_secs),
        }
    }

    async fn token_for(&self, pool: &str) -> Result<String, WalletError> {
        self.tokens
            .resolve(pool)
            .await
            .ok_or_else(|| WalletError::PoolUnavailable(pool.to_string()))
    }

    /// POST primitive: pool auth, bounded by `timeout` (default 30s).
    pub async fn post<B, R>(
        &self,
        pool: &str,
        path: &str,
        body: &B,
        timeout: Option<Duration>,
    ) -> Result<RemoteOutcome<R>, WalletError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let token = self.token_for(pool).await?;
        let url = format!("{}{}", self.base_url, path);

        let response = match self
            .client
            .post(&url)
            .bearer_auth(token)
            .timeout(timeout.unwrap_or(self.default_timeout))
            .json(body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return Ok(transport_outcome(e)),
        };

        Ok(Self::read_response(response).await)
    }

    /// GET primitive, same normalization as `post`.
    pub async fn get<R>(
        &self,
        pool: &str,
        path: &str,
        query: &[(&str, &str)],
        timeout: Option<Duration>,
    ) -> Result<RemoteOutcome<R>, WalletError>
    where
        R: DeserializeOwned,
    {
        let token = self.token_for(pool).await?;
        let url = format!("{}{}", self.base_url, path);

        let response = match self
            .client
            .get(&url)
            .bearer_auth(token)
            .timeout(timeout.unwrap_or(self.default_timeout))
            .query(query)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return Ok(transport_outcome(e)),
        };

        Ok(Self::read_response(response).await)
    }

    async fn read_response<R: DeserializeOwned>(response: reqwest::Response) -> RemoteOutcome<R> {
        let status = response.status();
        let text = match response.text().await {
            Ok(t) => t,
            Err(e) => return transport_outcome(e),
        };

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return RemoteOutcome::AuthRejected(text);
        }
        if !status.is_success() {
            return RemoteOutcome::Rejected(format!("casino API error {}: {}", status, text));
        }

        match serde_json::from_str(&text) {
            Ok(parsed) => RemoteOutcome::Success(parsed),
            Err(e) => RemoteOutcome::Rejected(format!("unexpected casino response: {}", e)),
        }
    }

    /// Non-success remote status code, if any, as an outcome.
    fn envelope_failure<T>(status: i64, message: Option<String>) -> Option<RemoteOutcome<T>> {
        match status {
            REMOTE_OK => None,
            REMOTE_AUTH_REJECTED => Some(RemoteOutcome::AuthRejected(message.unwrap_or_default())),
            code => Some(RemoteOutcome::Rejected(
                message.unwrap_or_else(|| format!("casino declined with code {}", code)),
            )),
        }
    }
}

#[async_trait]
impl CasinoLedger for CasinoService {
    async fn hierarchy_of(
        &self,
        pool: &str,
        username: &str,
        kind: AccountKind,
    ) -> Result<RemoteOutcome<HierarchyInfo>, WalletError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Body<'a> {
            username: &'a str,
            is_agent: bool,
        }

        let raw = self
            .post::<_, HierarchyResponse>(
                pool,
                "/Default/GetHierarchy",
                &Body {
                    username,
                    is_agent: kind == AccountKind::Agent,
                },
                None,
            )
            .await?;

        let resp = match raw.split() {
            Ok(r) => r,
            Err(outcome) => return Ok(outcome),
        };

        if let Some(failure) = Self::envelope_failure(resp.status, resp.message) {
            return Ok(failure);
        }

        let user = match resp.user {
            Some(u) => u,
            None => {
                return Ok(RemoteOutcome::Rejected(
                    "hierarchy response missing account".into(),
                ));
            }
        };

        Ok(RemoteOutcome::Success(HierarchyInfo {
            account_id: user.client_id,
            canonical_username: user.username,
            ancestors: resp.hierarchy.unwrap_or_default(),
        }))
    }

    async fn transfer(
        &self,
        pool: &str,
        transfer: ChipTransfer,
    ) -> Result<RemoteOutcome<CasinoTx>, WalletError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Body<'a> {
            username: &'a str,
            amount: i64,
            as_agent: bool,
            nonce: &'a str,
            comment: &'a str,
        }

        tracing::info!(
            "casino transfer {} chips for {} (pool {}, nonce {})",
            transfer.signed_amount,
            transfer.username,
            pool,
            transfer.nonce
        );

        let raw = self
            .post::<_, TransferResponse>(
                pool,
                "/Default/Transfer",
                &Body {
                    username: &transfer.username,
                    amount: transfer.signed_amount,
                    as_agent: transfer.as_agent,
                    nonce: &transfer.nonce,
                    comment: &transfer.comment,
                },
                None,
            )
            .await?;

        let resp = match raw.split() {
            Ok(r) => r,
            Err(outcome) => return Ok(outcome),
        };

        if let Some(failure) = Self::envelope_failure(resp.status, resp.message) {
            return Ok(failure);
        }

        match resp.transaction_id {
            Some(tx_id) => Ok(RemoteOutcome::Success(CasinoTx { tx_id })),
            None => Ok(RemoteOutcome::Rejected(
                "transfer response missing transaction id".into(),
            )),
        }
    }

    async fn statistics_of(
        &self,
        pool: &str,
        username: &str,
    ) -> Result<RemoteOutcome<CasinoStats>, WalletError> {
        let raw = self
            .get::<StatisticsResponse>(
                pool,
                "/Default/GetStatistics",
                &[("username", username)],
                None,
            )
            .await?;

        let resp = match raw.split() {
            Ok(r) => r,
            Err(outcome) => return Ok(outcome),
        };

        if let Some(failure) = Self::envelope_failure(resp.status, resp.message) {
            return Ok(failure);
        }

        match resp.current_balance {
            Some(current_balance) => Ok(RemoteOutcome::Success(CasinoStats {
                current_balance,
                seven_day: resp.seven_day,
            })),
            None => Ok(RemoteOutcome::Rejected(
                "statistics response missing balance".into(),
            )),
        }
    }

    async fn send_message(
        &self,
        pool: &str,
        username: &str,
        client_id: i64,
        subject: &str,
        body: &str,
    ) -> Result<RemoteOutcome<()>, WalletError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Body<'a> {
            username: &'a str,
            client_id: i64,
            subject: &'a str,
            message: &'a str,
        }

        let raw = self
            .post::<_, SendMessageResponse>(
                pool,
                "/Default/SendMessage",
                &Body {
                    username,
                    client_id,
                    subject,
                    message: body,
                },
                None,
            )
            .await?;

        let resp = match raw.split() {
            Ok(r) => r,
            Err(outcome) => return Ok(outcome),
        };

        if let Some(failure) = Self::envelope_failure(resp.status, resp.message) {
            return Ok(failure);
        }

        Ok(RemoteOutcome::Success(()))
    }
}

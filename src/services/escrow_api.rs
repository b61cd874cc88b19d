//! Peso-token escrow ledger client.
//!
//! Thin wrapper over the escrow provider's wallet API: debit and credit a
//! handle's token balance, and read it back. One response struct per
//! endpoint keeps the provider's field naming contained here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::services::remote::{RemoteOutcome, transport_outcome};

#[derive(Debug, Clone)]
pub struct EscrowTx {
    pub tx_id: String,
}

#[derive(Debug, Clone)]
pub struct EscrowBalance {
    pub balance: Decimal,
}

/// The escrow ledger operations the saga depends on.
#[async_trait]
pub trait EscrowLedger: Send + Sync {
    async fn debit(&self, handle: &str, amount: i64) -> RemoteOutcome<EscrowTx>;
    async fn credit(&self, handle: &str, amount: i64) -> RemoteOutcome<EscrowTx>;
    async fn balance_of(&self, handle: &str) -> RemoteOutcome<EscrowBalance>;
}

#[derive(Clone)]
pub struct EscrowService {
    client: Client,
    base_url: String,
    api_token: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct TransferBody<'a> {
    account: &'a str,
    amount: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EscrowTransferResponse {
    status: String,
    message: Option<String>,
    transaction_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EscrowBalanceResponse {
    status: String,
    message: Option<String>,
    balance: Option<Decimal>,
}

impl EscrowService {
    pub fn new(base_url: String, api_token: String, timeout_secs: u64) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_token,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// POST with bearer auth, per-request timeout and normalized outcome.
    async fn post<B, R>(&self, path: &str, body: &B) -> RemoteOutcome<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);

        let response = match self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return transport_outcome(e),
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(t) => t,
            Err(e) => return transport_outcome(e),
        };

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return RemoteOutcome::AuthRejected(text);
        }
        if !status.is_success() {
            return RemoteOutcome::Rejected(format!("escrow API error {}: {}", status, text));
        }

        match serde_json::from_str(&text) {
            Ok(parsed) => RemoteOutcome::Success(parsed),
            Err(e) => RemoteOutcome::Rejected(format!("unexpected escrow response: {}", e)),
        }
    }

    async fn transfer(&self, path: &str, handle: &str, amount: i64) -> RemoteOutcome<EscrowTx> {
        let body = TransferBody {
            account: handle,
            amount,
        };
        let resp = match self.post::<_, EscrowTransferResponse>(path, &body).await.split() {
            Ok(r) => r,
            Err(outcome) => return outcome,
        };

        match resp.status.as_str() {
            "ok" => match resp.transaction_id {
                Some(tx_id) => RemoteOutcome::Success(EscrowTx { tx_id }),
                None => RemoteOutcome::Rejected("escrow response missing transaction id".into()),
            },
            "unauthorized" => RemoteOutcome::AuthRejected(resp.message.unwrap_or_default()),
            _ => RemoteOutcome::Rejected(
                resp.message.unwrap_or_else(|| "escrow transfer declined".into()),
            ),
        }
    }
}

#[async_trait]
impl EscrowLedger for EscrowService {
    async fn debit(&self, handle: &str, amount: i64) -> RemoteOutcome<EscrowTx> {
        tracing::debug!("escrow debit {} from {}", amount, handle);
        self.transfer("/v1/wallet/debit", handle, amount).await
    }

    async fn credit(&self, handle: &str, amount: i64) -> RemoteOutcome<EscrowTx> {
        tracing::debug!("escrow credit {} to {}", amount, handle);
        self.transfer("/v1/wallet/credit", handle, amount).await
    }

    async fn balance_of(&self, handle: &str) -> RemoteOutcome<EscrowBalance> {
        #[derive(Serialize)]
        struct BalanceBody<'a> {
            account: &'a str,
        }

        let resp = match self
            .post::<_, EscrowBalanceResponse>("/v1/wallet/balance", &BalanceBody { account: handle })
            .await
            .split()
        {
            Ok(r) => r,
            Err(outcome) => return outcome,
        };

        match resp.status.as_str() {
            "ok" => match resp.balance {
                Some(balance) => RemoteOutcome::Success(EscrowBalance { balance }),
                None => RemoteOutcome::Rejected("escrow response missing balance".into()),
            },
            "unauthorized" => RemoteOutcome::AuthRejected(resp.message.unwrap_or_default()),
            _ => RemoteOutcome::Rejected(
                resp.message.unwrap_or_else(|| "escrow balance query declined".into()),
            ),
        }
    }
}

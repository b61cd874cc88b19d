//! Terminal-state notifications.
//!
//! Fire-and-forget by contract: a notification failure must never block
//! or roll back a saga, so delivery happens on a detached task and errors
//! are only logged. Manual escalations additionally hit the ops webhook
//! when one is configured.

use reqwest::Client;
use serde_json::json;

use crate::entities::casino_transactions;
use crate::models::exchange::ExchangeStatus;

#[derive(Clone)]
pub struct Notifier {
    client: Client,
    webhook_url: Option<String>,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            webhook_url,
        }
    }

    pub fn exchange_terminal(&self, record: &casino_transactions::Model) {
        tracing::info!(
            "transaction {} reached {} ({} {} for user {})",
            record.id,
            record.status,
            record.direction,
            record.amount,
            record.user_id
        );

        if record.status != ExchangeStatus::ManualRequired.as_str() {
            return;
        }

        let Some(url) = self.webhook_url.clone() else {
            tracing::warn!(
                "manual reconciliation needed for transaction {} (no ops webhook configured)",
                record.id
            );
            return;
        };

        let client = self.client.clone();
        let payload = json!({
            "event": "exchange_manual_required",
            "transaction_id": record.id,
            "reference": record.nonce,
            "user_id": record.user_id,
            "direction": record.direction,
            "amount": record.amount,
            "failure_reason": record.failure_reason,
        });

        tokio::spawn(async move {
            if let Err(e) = client.post(&url).json(&payload).send().await {
                tracing::error!("ops alert delivery failed: {}", e);
            }
        });
    }
}

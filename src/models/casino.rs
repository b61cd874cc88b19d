use serde::{Deserialize, Serialize};

use crate::entities::casino_links;

/// Casino account kind. Agents have a mail channel, players do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Player,
    Agent,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Player => "player",
            AccountKind::Agent => "agent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "player" => Some(AccountKind::Player),
            "agent" => Some(AccountKind::Agent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Unverified,
    Verified,
    Simulated,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Unverified => "unverified",
            LinkStatus::Verified => "verified",
            LinkStatus::Simulated => "simulated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unverified" => Some(LinkStatus::Unverified),
            "verified" => Some(LinkStatus::Verified),
            "simulated" => Some(LinkStatus::Simulated),
            _ => None,
        }
    }

    /// Only these link states may move money.
    pub fn allows_exchange(&self) -> bool {
        matches!(self, LinkStatus::Verified | LinkStatus::Simulated)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectRequest {
    pub casino_username: String,
    pub preferred_kind: Option<AccountKind>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectResponse {
    pub casino_username: String,
    pub account_kind: AccountKind,
    pub challenge: ChallengeKindView,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKindView {
    /// A 6-digit code was mailed to the casino account
    MailedCode,
    /// The caller must submit the account's current chip balance
    CurrentBalance,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    pub casino_username: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkView {
    pub casino_username: String,
    pub casino_client_id: i64,
    pub account_kind: String,
    pub status: String,
    pub linked_at: String,
}

impl From<casino_links::Model> for LinkView {
    fn from(m: casino_links::Model) -> Self {
        Self {
            casino_username: m.casino_username,
            casino_client_id: m.casino_client_id,
            account_kind: m.account_kind,
            status: m.status,
            linked_at: m.created_at.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CasinoBalanceResponse {
    pub casino_username: String,
    pub balance: String,
}

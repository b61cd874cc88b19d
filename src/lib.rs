// src/lib.rs

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use config::AppConfig;
use services::agent_tokens::AgentTokenStore;
use services::casino_api::CasinoService;
use services::escrow_api::EscrowService;
use services::notifications::Notifier;
use services::verification::ChallengeStore;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub tokens: AgentTokenStore,
    pub escrow: EscrowService,
    pub casino: CasinoService,
    pub challenges: ChallengeStore,
    pub notifier: Notifier,
}

pub mod entities {
    pub mod prelude;
    pub mod app_settings;
    pub mod casino_links;
    pub mod casino_transactions;
    pub mod users;
}

pub mod services {
    pub mod agent_resolver;
    pub mod agent_tokens;
    pub mod casino_api;
    pub mod escrow_api;
    pub mod exchange;
    pub mod exchange_store;
    pub mod notifications;
    pub mod pin_gate;
    pub mod remote;
    pub mod verification;
}

pub mod models {
    pub mod admin;
    pub mod casino;
    pub mod common;
    pub mod exchange;
    pub mod security;
}

pub mod handlers {
    pub mod admin;
    pub mod casino;
    pub mod security;
}

pub mod auth;
pub mod config;
pub mod error;

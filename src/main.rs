use axum::{
    Router,
    routing::{get, post, put},
};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::env;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use payverse_backend::config::AppConfig;
use payverse_backend::services::agent_tokens::AgentTokenStore;
use payverse_backend::services::casino_api::CasinoService;
use payverse_backend::services::escrow_api::EscrowService;
use payverse_backend::services::notifications::Notifier;
use payverse_backend::services::verification::ChallengeStore;
use payverse_backend::{AppState, handlers};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,payverse_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Connect to database
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    tracing::info!("Connecting to database...");
    let db = Database::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let config = Arc::new(AppConfig::from_env());
    if config.agent_pools.is_empty() {
        tracing::warn!("no casino agent pools configured; exchange flows will be unavailable");
    }

    let tokens = AgentTokenStore::new(db.clone(), config.static_agent_tokens.clone());
    let escrow = EscrowService::new(
        config.escrow_base_url.clone(),
        config.escrow_api_token.clone(),
        config.remote_timeout_secs,
    );
    let casino = CasinoService::new(
        config.casino_base_url.clone(),
        tokens.clone(),
        config.remote_timeout_secs,
    );
    let notifier = Notifier::new(config.ops_webhook_url.clone());

    let state = AppState {
        db,
        config,
        tokens,
        escrow,
        casino,
        challenges: ChallengeStore::new(),
        notifier,
    };

    // Build router
    let app = Router::new()
        .route("/", get(health))
        .route("/api/casino/connect", post(handlers::casino::connect))
        .route("/api/casino/verify", post(handlers::casino::verify))
        .route(
            "/api/casino/link",
            get(handlers::casino::get_link).delete(handlers::casino::disconnect),
        )
        .route("/api/casino/balance", get(handlers::casino::balance))
        .route("/api/casino/deposit", post(handlers::casino::deposit))
        .route("/api/casino/withdraw", post(handlers::casino::withdraw))
        .route(
            "/api/casino/transactions",
            get(handlers::casino::list_transactions),
        )
        .route(
            "/api/casino/transactions/{id}",
            get(handlers::casino::get_transaction),
        )
        .route("/api/security/pin/setup", post(handlers::security::pin_setup))
        .route("/api/security/pin/change", post(handlers::security::pin_change))
        .route("/api/security/pin/verify", post(handlers::security::pin_verify))
        .route("/api/security/status", get(handlers::security::status))
        .route("/api/admin/casino/pending", get(handlers::admin::pending))
        .route("/api/admin/casino/resolve", post(handlers::admin::resolve))
        .route("/api/admin/settings", put(handlers::admin::upsert_setting))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(5000);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .unwrap();

    tracing::info!("Server listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}

async fn health() -> &'static str {
    "payverse-backend up"
}

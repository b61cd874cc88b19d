//! HTTP surface tests: session extraction and error mapping.

mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    routing::get,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use payverse_backend::AppState;
use payverse_backend::config::AppConfig;
use payverse_backend::handlers;
use payverse_backend::services::agent_tokens::AgentTokenStore;
use payverse_backend::services::casino_api::CasinoService;
use payverse_backend::services::escrow_api::EscrowService;
use payverse_backend::services::notifications::Notifier;
use payverse_backend::services::verification::ChallengeStore;

use crate::common::{create_test_user, setup_test_db};

async fn test_state() -> AppState {
    let db = setup_test_db().await.expect("Failed to connect to test DB");
    let config = Arc::new(AppConfig::from_env());
    let tokens = AgentTokenStore::new(db.clone(), config.static_agent_tokens.clone());
    // Remote endpoints are never reached by these tests
    let escrow = EscrowService::new("http://localhost:9".to_string(), "test".to_string(), 1);
    let casino = CasinoService::new("http://localhost:9".to_string(), tokens.clone(), 1);

    AppState {
        db,
        config,
        tokens,
        escrow,
        casino,
        challenges: ChallengeStore::new(),
        notifier: Notifier::new(None),
    }
}

fn test_router(state: AppState) -> Router {
    Router::new()
        .route("/api/casino/link", get(handlers::casino::get_link))
        .route("/api/security/status", get(handlers::security::status))
        .with_state(state)
}

#[tokio::test]
async fn requests_without_a_session_token_are_unauthorized() {
    let app = test_router(test_state().await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/casino/link")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn a_session_token_resolves_the_user() {
    let state = test_state().await;
    let user = create_test_user(&state.db, None).await.unwrap();
    let token = user.session_token.clone().unwrap();
    let app = test_router(state);

    // Authenticated, but no casino link yet
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/casino/link")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/security/status")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["pin_set"], Value::Bool(false));
    assert_eq!(json["failed_attempts"], Value::from(0));
}

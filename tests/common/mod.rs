use chrono::Utc;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, DbErr, Set};
use sea_orm_migration::MigratorTrait;
use std::env;
use uuid::Uuid;

use payverse_backend::entities::{casino_links, users};
use payverse_backend::models::casino::LinkStatus;
use payverse_backend::services::pin_gate;

/// Set up test database connection and run migrations.
/// Uses TEST_DATABASE_URL environment variable or falls back to default.
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let database_url = env::var("TEST_DATABASE_URL").unwrap_or_else(|_| {
        "postgresql://payverse_user@localhost:5432/payverse_test".to_string()
    });

    let db = Database::connect(&database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Insert a user with a unique username; `pin` is hashed when supplied.
pub async fn create_test_user(
    db: &DatabaseConnection,
    pin: Option<&str>,
) -> Result<users::Model, DbErr> {
    let pin_hash = pin.map(|p| pin_gate::hash_pin(p).expect("pin hashing"));

    users::ActiveModel {
        username: Set(format!("user-{}", Uuid::new_v4())),
        email: Set(None),
        session_token: Set(Some(Uuid::new_v4().to_string())),
        pin_hash: Set(pin_hash),
        pin_failed_attempts: Set(0),
        pin_locked_until: Set(None),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_link(
    db: &DatabaseConnection,
    user_id: i32,
    status: LinkStatus,
) -> Result<casino_links::Model, DbErr> {
    casino_links::ActiveModel {
        user_id: Set(user_id),
        casino_username: Set(format!("casino-{}", user_id)),
        casino_client_id: Set(i64::from(user_id) + 10_000),
        agent_pool: Set("alpha".to_string()),
        account_kind: Set("player".to_string()),
        status: Set(status.as_str().to_string()),
        hierarchy_snapshot: Set(None),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub use sea_orm_migration::prelude::*;

mod m20260601_000001_create_users;
mod m20260601_000002_create_casino_links;
mod m20260601_000003_create_casino_transactions;
mod m20260601_000004_create_app_settings;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260601_000001_create_users::Migration),
            Box::new(m20260601_000002_create_casino_links::Migration),
            Box::new(m20260601_000003_create_casino_transactions::Migration),
            Box::new(m20260601_000004_create_app_settings::Migration),
        ]
    }
}

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CasinoLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CasinoLinks::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CasinoLinks::UserId)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(CasinoLinks::CasinoUsername)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CasinoLinks::CasinoClientId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CasinoLinks::AgentPool)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CasinoLinks::AccountKind)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CasinoLinks::Status)
                            .string()
                            .not_null()
                            .default("unverified"),
                    )
                    .col(ColumnDef::new(CasinoLinks::HierarchySnapshot).json())
                    .col(
                        ColumnDef::new(CasinoLinks::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CasinoLinks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CasinoLinks {
    Table,
    Id,
    UserId,
    CasinoUsername,
    CasinoClientId,
    AgentPool,
    AccountKind,
    Status,
    HierarchySnapshot,
    CreatedAt,
}

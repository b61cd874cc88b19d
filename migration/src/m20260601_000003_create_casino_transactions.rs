use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CasinoTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CasinoTransactions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CasinoTransactions::UserId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CasinoTransactions::Direction)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CasinoTransactions::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CasinoTransactions::Nonce)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(CasinoTransactions::Status)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CasinoTransactions::EscrowTxId).string())
                    .col(ColumnDef::new(CasinoTransactions::CasinoTxId).string())
                    .col(ColumnDef::new(CasinoTransactions::CompensationTxId).string())
                    .col(ColumnDef::new(CasinoTransactions::FailureReason).text())
                    .col(ColumnDef::new(CasinoTransactions::FailedLeg).string())
                    .col(
                        ColumnDef::new(CasinoTransactions::CompensationAttempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(CasinoTransactions::LastCompensationAt).timestamp())
                    .col(ColumnDef::new(CasinoTransactions::Resolution).string())
                    .col(ColumnDef::new(CasinoTransactions::ResolvedBy).integer())
                    .col(
                        ColumnDef::new(CasinoTransactions::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(CasinoTransactions::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Operator tooling queries by status
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_casino_transactions_status")
                    .table(CasinoTransactions::Table)
                    .col(CasinoTransactions::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_casino_transactions_user_id")
                    .table(CasinoTransactions::Table)
                    .col(CasinoTransactions::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CasinoTransactions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CasinoTransactions {
    Table,
    Id,
    UserId,
    Direction,
    Amount,
    Nonce,
    Status,
    EscrowTxId,
    CasinoTxId,
    CompensationTxId,
    FailureReason,
    FailedLeg,
    CompensationAttempts,
    LastCompensationAt,
    Resolution,
    ResolvedBy,
    CreatedAt,
    UpdatedAt,
}

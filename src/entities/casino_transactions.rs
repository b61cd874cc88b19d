//! `SeaORM` Entity for casino_transactions table
//!
//! The chip exchange saga record. Every state transition is written here
//! before the next remote call, so a crash mid-exchange always leaves a
//! row an operator can find and act on.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "casino_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub direction: String,
    pub amount: i64,
    #[sea_orm(unique)]
    pub nonce: String,
    pub status: String,
    pub escrow_tx_id: Option<String>,
    pub casino_tx_id: Option<String>,
    pub compensation_tx_id: Option<String>,
    pub failure_reason: Option<String>,
    pub failed_leg: Option<String>,
    pub compensation_attempts: i32,
    pub last_compensation_at: Option<DateTime>,
    pub resolution: Option<String>,
    pub resolved_by: Option<i32>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! `SeaORM` Entity for casino_links table
//!
//! One row per user: the verified mapping between a wallet user and their
//! casino account, including which agent pool owns the account and the
//! ancestor chain captured at verification time.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "casino_links")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub user_id: i32,
    pub casino_username: String,
    pub casino_client_id: i64,
    pub agent_pool: String,
    pub account_kind: String,
    pub status: String,
    pub hierarchy_snapshot: Option<Json>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

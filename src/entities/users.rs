//! `SeaORM` Entity for users table
//!
//! Only the columns the exchange core needs: the username doubles as the
//! escrow ledger handle, and the PIN fields back the authorization gate.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    pub email: Option<String>,
    #[sea_orm(unique)]
    pub session_token: Option<String>,
    #[serde(skip_serializing)]
    pub pin_hash: Option<String>,
    #[serde(skip_serializing)]
    pub pin_failed_attempts: i32,
    #[serde(skip_serializing)]
    pub pin_locked_until: Option<DateTime>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

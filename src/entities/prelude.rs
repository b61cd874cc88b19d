pub use super::app_settings::Entity as AppSettings;
pub use super::casino_links::Entity as CasinoLinks;
pub use super::casino_transactions::Entity as CasinoTransactions;
pub use super::users::Entity as Users;

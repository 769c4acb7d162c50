pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod ledger;
pub mod registration;

pub use error::LedgerError;

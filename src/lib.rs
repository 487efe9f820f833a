pub mod api;
pub mod config;
pub mod identity;
pub mod ledger;
pub mod models;

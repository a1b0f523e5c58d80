//! Dashboard module
//!
//! Provides an overview page with the ledger summary, spending charts and
//! the latest transactions, sponsors and management funds.

mod aggregation;
mod cards;
mod charts;
mod handlers;
mod tables;

pub use handlers::get_dashboard_page;

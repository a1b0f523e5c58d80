//! Expenses and sponsor income, and the treasurer approval workflow.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Database functions for storing, querying, and reviewing transactions
//! - View handlers for the transaction pages, review endpoints and CSV import

mod bulk;
mod core;
mod create;
mod edit;
mod form;
mod import;
mod page;
mod review;

pub use bulk::{bulk_approve_endpoint, bulk_reject_endpoint};
pub use core::{
    Transaction, create_transaction_table, get_approved_transactions,
    get_pending_transactions, get_recent_approved_transactions, total_amount,
};
pub use create::{create_transaction_endpoint, get_new_transaction_page};
pub use edit::{get_edit_transaction_page, update_transaction_endpoint};
pub use import::{MAX_IMPORT_FILE_SIZE_MB, get_import_page, import_transactions_endpoint};
pub use page::{get_transactions_page, review_buttons};
pub use review::{
    approve_transaction_endpoint, delete_transaction_endpoint, reject_transaction_endpoint,
};

#[cfg(test)]
pub use core::create_transaction;

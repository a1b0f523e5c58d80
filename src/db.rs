//! Creates the application's database schema.

use rusqlite::Connection;

use crate::{
    Error,
    audit::create_audit_log_table,
    auth::{create_email_verification_table, create_login_attempt_table, create_user_table},
    budget::create_budget_table,
    category::{create_category_table, seed_default_categories},
    income::{create_management_fund_table, create_sponsor_table},
    notification::create_notification_table,
    transaction::create_transaction_table,
};

/// Create the tables for all of the domain models and seed the default categories.
///
/// Safe to call on an existing database, tables and seed rows are only
/// created when they are missing.
///
/// # Errors
/// Returns an error if any of the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction = connection.unchecked_transaction()?;

    create_user_table(&transaction)?;
    create_email_verification_table(&transaction)?;
    create_login_attempt_table(&transaction)?;
    create_category_table(&transaction)?;
    seed_default_categories(&transaction)?;
    create_transaction_table(&transaction)?;
    create_management_fund_table(&transaction)?;
    create_sponsor_table(&transaction)?;
    create_budget_table(&transaction)?;
    create_audit_log_table(&transaction)?;
    create_notification_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

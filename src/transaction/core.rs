//! Defines the core data model and database queries for transactions.

use rusqlite::{Connection, Row, params_from_iter, types::Value};
use time::{Date, OffsetDateTime};

use crate::{Error, auth::UserID, database_id::TransactionId, ledger::DateRange};

// ============================================================================
// MODELS
// ============================================================================

/// Money spent on, or received for, the organisation.
///
/// Expenses have negative amounts. Only transactions in the sponsor category
/// may be positive. Expenses count towards the ledger once a treasurer has
/// approved them.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: TransactionId,
    pub title: String,
    pub amount: f64,
    /// The name of the category, e.g. "Venue".
    pub category: String,
    pub date: Date,
    pub approved: bool,
    /// The user who submitted the transaction, if they still exist.
    pub created_by: Option<UserID>,
    /// The username of the user who submitted the transaction.
    pub submitted_by: Option<String>,
    pub created_at: OffsetDateTime,
}

impl Transaction {
    /// Create a new, unapproved transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(title: &str, amount: f64, category: &str, date: Date) -> TransactionBuilder {
        TransactionBuilder {
            title: title.to_owned(),
            amount,
            category: category.to_owned(),
            date,
            approved: false,
            created_by: None,
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// The values are expected to have been validated, see
/// [crate::transaction::validate_transaction].
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    pub title: String,
    /// Negative for expenses, positive for sponsor income.
    pub amount: f64,
    pub category: String,
    pub date: Date,
    pub approved: bool,
    pub created_by: Option<UserID>,
}

impl TransactionBuilder {
    /// Set whether the transaction is approved when it is created.
    pub fn approved(mut self, approved: bool) -> Self {
        self.approved = approved;
        self
    }

    /// Set the user who submitted the transaction.
    pub fn created_by(mut self, user_id: Option<UserID>) -> Self {
        self.created_by = user_id;
        self
    }
}

/// Which transactions to show based on whether they have been approved.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalStatus {
    #[default]
    All,
    Pending,
    Approved,
}

impl ApprovalStatus {
    /// Parse the `status` query parameter. Unknown values show everything.
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("pending") => ApprovalStatus::Pending,
            Some("approved") => ApprovalStatus::Approved,
            _ => ApprovalStatus::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::All => "all",
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
        }
    }
}

/// The filters on the transactions page.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TransactionFilter {
    pub status: ApprovalStatus,
    pub category: Option<String>,
    pub range: DateRange,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the transaction table.
///
/// The category is stored by name so that transactions keep their category
/// when the category is deleted.
///
/// # Errors
/// Returns an error if the table could not be created.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            amount REAL NOT NULL CHECK (amount <> 0),
            category TEXT NOT NULL,
            date TEXT NOT NULL,
            approved INTEGER NOT NULL DEFAULT 0,
            created_by INTEGER,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            FOREIGN KEY(created_by) REFERENCES user(id) ON DELETE SET NULL
        );

        CREATE INDEX IF NOT EXISTS idx_transaction_date ON \"transaction\"(date);
        CREATE INDEX IF NOT EXISTS idx_transaction_category ON \"transaction\"(category);",
    )?;

    Ok(())
}

const SELECT_TRANSACTION: &str = "SELECT t.id, t.title, t.amount, t.category, t.date, t.approved,
    t.created_by, user.username, t.created_at
    FROM \"transaction\" t LEFT JOIN user ON t.created_by = user.id";

/// Create a new transaction in the database from a builder.
///
/// # Errors
/// Returns [Error::SqlError] if the insert failed.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection.execute(
        "INSERT INTO \"transaction\" (title, amount, category, date, approved, created_by)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        (
            &builder.title,
            builder.amount,
            &builder.category,
            builder.date,
            builder.approved,
            builder.created_by.map(|user_id| user_id.as_i64()),
        ),
    )?;

    get_transaction(connection.last_insert_rowid(), connection)
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a transaction.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    connection
        .prepare(&format!("{SELECT_TRANSACTION} WHERE t.id = :id"))?
        .query_row(&[(":id", &id)], map_transaction_row)
        .map_err(Error::from)
}

/// Get the transactions matching `filter`, newest first.
pub fn query_transactions(
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let approved: Option<bool> = match filter.status {
        ApprovalStatus::All => None,
        ApprovalStatus::Pending => Some(false),
        ApprovalStatus::Approved => Some(true),
    };

    connection
        .prepare(&format!(
            "{SELECT_TRANSACTION}
            WHERE (?1 IS NULL OR t.approved = ?1)
            AND (?2 IS NULL OR t.category = ?2)
            AND (?3 IS NULL OR t.date >= ?3)
            AND (?4 IS NULL OR t.date <= ?4)
            ORDER BY t.date DESC, t.id DESC"
        ))?
        .query_map(
            (
                approved,
                filter.category.as_deref(),
                filter.range.start,
                filter.range.end,
            ),
            map_transaction_row,
        )?
        .map(|row| row.map_err(Error::from))
        .collect()
}

/// The approved transactions dated in `range`, oldest first.
pub fn get_approved_transactions(
    range: DateRange,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_TRANSACTION}
            WHERE t.approved = 1
            AND (?1 IS NULL OR t.date >= ?1)
            AND (?2 IS NULL OR t.date <= ?2)
            ORDER BY t.date ASC, t.id ASC"
        ))?
        .query_map((range.start, range.end), map_transaction_row)?
        .map(|row| row.map_err(Error::from))
        .collect()
}

/// The `limit` most recent approved transactions dated in `range`.
pub fn get_recent_approved_transactions(
    range: DateRange,
    limit: u32,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_TRANSACTION}
            WHERE t.approved = 1
            AND (?1 IS NULL OR t.date >= ?1)
            AND (?2 IS NULL OR t.date <= ?2)
            ORDER BY t.date DESC, t.id DESC
            LIMIT ?3"
        ))?
        .query_map((range.start, range.end, limit), map_transaction_row)?
        .map(|row| row.map_err(Error::from))
        .collect()
}

/// Every transaction waiting for approval, oldest first.
pub fn get_pending_transactions(connection: &Connection) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_TRANSACTION} WHERE t.approved = 0 ORDER BY t.date ASC, t.id ASC"
        ))?
        .query_map([], map_transaction_row)?
        .map(|row| row.map_err(Error::from))
        .collect()
}

/// The transactions with the given IDs. Unknown IDs are skipped.
pub fn get_transactions_by_id(
    ids: &[TransactionId],
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let params = ids.iter().map(|id| Value::Integer(*id));

    connection
        .prepare(&format!(
            "{SELECT_TRANSACTION} WHERE t.id IN ({placeholders}) ORDER BY t.id"
        ))?
        .query_map(params_from_iter(params), map_transaction_row)?
        .map(|row| row.map_err(Error::from))
        .collect()
}

/// Overwrite the editable fields of the transaction `id`.
///
/// The creator and creation time are kept.
///
/// # Errors
/// Returns [Error::UpdateMissingTransaction] if `id` does not refer to a transaction.
pub fn update_transaction(
    id: TransactionId,
    builder: &TransactionBuilder,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE \"transaction\"
        SET title = ?1, amount = ?2, category = ?3, date = ?4, approved = ?5,
            updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
        WHERE id = ?6",
        (
            &builder.title,
            builder.amount,
            &builder.category,
            builder.date,
            builder.approved,
            id,
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingTransaction);
    }

    Ok(())
}

/// Mark the transaction `id` as approved.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a transaction.
pub fn approve_transaction(id: TransactionId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE \"transaction\"
        SET approved = 1, updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
        WHERE id = ?1",
        [id],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Delete the transaction `id`.
///
/// # Errors
/// Returns [Error::DeleteMissingTransaction] if `id` does not refer to a transaction.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM \"transaction\" WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    Ok(())
}

/// Map a database row from [SELECT_TRANSACTION] to a [Transaction].
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let created_by: Option<i64> = row.get(6)?;
    let created_at: String = row.get(8)?;
    let created_at = OffsetDateTime::parse(
        &created_at,
        &time::format_description::well_known::Rfc3339,
    )
    .map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, error.into())
    })?;

    Ok(Transaction {
        id: row.get(0)?,
        title: row.get(1)?,
        amount: row.get(2)?,
        category: row.get(3)?,
        date: row.get(4)?,
        approved: row.get(5)?,
        created_by: created_by.map(UserID::new),
        submitted_by: row.get(7)?,
        created_at,
    })
}

/// The sum of the transactions' amounts, zero when there are none.
pub fn total_amount(transactions: &[Transaction]) -> f64 {
    // `Iterator::sum` starts from -0.0, which would be printed as "-0.00".
    transactions
        .iter()
        .fold(0.0, |total, transaction| total + transaction.amount)
}

#[cfg(test)]
pub fn count_transactions(connection: &Connection) -> Result<i64, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| row.get(0))
        .map_err(Error::from)
}

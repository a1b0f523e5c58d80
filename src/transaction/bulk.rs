//! JSON endpoints for approving or rejecting many transactions at once.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    audit::{AuditAction, NewAuditEntry, audit, client_ip},
    auth::UserID,
    database_id::TransactionId,
    html::format_currency,
    notification::SpendingSnapshot,
    transaction::{
        core::{Transaction, get_transactions_by_id},
        review::{notify_approved, notify_rejected},
    },
};

/// The state needed for bulk actions on transactions.
#[derive(Debug, Clone)]
pub struct BulkTransactionState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for BulkTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body, e.g. `{"ids": [1, 2, 3]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkRequest {
    #[serde(default)]
    pub ids: Vec<TransactionId>,
}

/// The response body for bulk actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BulkResponse {
    Success {
        success: bool,
        count: usize,
        message: String,
    },
    Failure {
        success: bool,
        error: String,
    },
}

impl BulkResponse {
    fn success(count: usize, message: String) -> Self {
        BulkResponse::Success {
            success: true,
            count,
            message,
        }
    }

    fn failure(error: &Error) -> Self {
        BulkResponse::Failure {
            success: false,
            error: error.to_string(),
        }
    }
}

fn error_response(error: Error) -> Response {
    let status = match error {
        Error::NoTransactionIds => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, Json(BulkResponse::failure(&error))).into_response()
}

/// Approve every transaction in `ids`. Unknown IDs are skipped.
///
/// Returns the number of transactions that were approved.
fn approve_all(ids: &[TransactionId], connection: &Connection) -> Result<usize, Error> {
    let transaction = connection.unchecked_transaction()?;
    let mut count = 0;

    for id in ids {
        count += transaction.execute(
            "UPDATE \"transaction\"
            SET approved = 1, updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
            WHERE id = ?1",
            [id],
        )?;
    }

    transaction.commit()?;

    Ok(count)
}

/// Delete every transaction in `ids`. Unknown IDs are skipped.
fn delete_all(ids: &[TransactionId], connection: &Connection) -> Result<usize, Error> {
    let transaction = connection.unchecked_transaction()?;
    let mut count = 0;

    for id in ids {
        count += transaction.execute("DELETE FROM \"transaction\" WHERE id = ?1", [id])?;
    }

    transaction.commit()?;

    Ok(count)
}

fn audit_each(
    transactions: &[Transaction],
    action: AuditAction,
    verb: &str,
    user_id: UserID,
    headers: &HeaderMap,
    connection: &Connection,
) {
    let ip_address = client_ip(headers);

    for transaction in transactions {
        audit(
            NewAuditEntry {
                user_id,
                action,
                object_type: "Transaction",
                object_id: transaction.id,
                description: format!(
                    "{verb} '{}' for {} (bulk)",
                    transaction.title,
                    format_currency(transaction.amount)
                ),
                ip_address: ip_address.clone(),
            },
            connection,
        );
    }
}

/// Approve many transactions in one database transaction.
pub async fn bulk_approve_endpoint(
    State(state): State<BulkTransactionState>,
    Extension(user_id): Extension<UserID>,
    headers: HeaderMap,
    Json(request): Json<BulkRequest>,
) -> Response {
    if request.ids.is_empty() {
        return error_response(Error::NoTransactionIds);
    }

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return error_response(Error::DatabaseLockError);
        }
    };

    let transactions = match get_transactions_by_id(&request.ids, &connection) {
        Ok(transactions) => transactions,
        Err(error) => {
            tracing::error!("could not get transactions for bulk approval: {error}");
            return error_response(error);
        }
    };

    let snapshot = match SpendingSnapshot::capture(
        transactions
            .iter()
            .map(|transaction| transaction.category.as_str()),
        &connection,
    ) {
        Ok(snapshot) => snapshot,
        Err(error) => {
            tracing::error!("could not record spending before bulk approval: {error}");
            return error_response(error);
        }
    };

    let count = match approve_all(&request.ids, &connection) {
        Ok(count) => count,
        Err(error) => {
            tracing::error!("could not bulk approve transactions: {error}");
            return error_response(error);
        }
    };

    audit_each(
        &transactions,
        AuditAction::ApproveTransaction,
        "Approved",
        user_id,
        &headers,
        &connection,
    );
    for transaction in transactions.iter().filter(|transaction| !transaction.approved) {
        notify_approved(transaction, &connection);
    }
    snapshot.notify_crossings(&connection);

    Json(BulkResponse::success(
        count,
        format!("{count} transaction(s) approved successfully"),
    ))
    .into_response()
}

/// Reject, and delete, many transactions in one database transaction.
pub async fn bulk_reject_endpoint(
    State(state): State<BulkTransactionState>,
    Extension(user_id): Extension<UserID>,
    headers: HeaderMap,
    Json(request): Json<BulkRequest>,
) -> Response {
    if request.ids.is_empty() {
        return error_response(Error::NoTransactionIds);
    }

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return error_response(Error::DatabaseLockError);
        }
    };

    let transactions = match get_transactions_by_id(&request.ids, &connection) {
        Ok(transactions) => transactions,
        Err(error) => {
            tracing::error!("could not get transactions for bulk rejection: {error}");
            return error_response(error);
        }
    };

    let count = match delete_all(&request.ids, &connection) {
        Ok(count) => count,
        Err(error) => {
            tracing::error!("could not bulk reject transactions: {error}");
            return error_response(error);
        }
    };

    audit_each(
        &transactions,
        AuditAction::RejectTransaction,
        "Rejected",
        user_id,
        &headers,
        &connection,
    );
    for transaction in &transactions {
        notify_rejected(transaction, &connection);
    }

    Json(BulkResponse::success(
        count,
        format!("{count} transaction(s) rejected and deleted successfully"),
    ))
    .into_response()
}

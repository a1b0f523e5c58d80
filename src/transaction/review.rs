//! Treasurer endpoints for approving, rejecting and deleting single transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRefresh;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::Alert,
    audit::{AuditAction, NewAuditEntry, audit, client_ip},
    auth::UserID,
    database_id::TransactionId,
    html::format_currency,
    notification::{NewNotification, NotificationKind, RelatedObject, SpendingSnapshot, notify},
    transaction::core::{Transaction, approve_transaction, delete_transaction, get_transaction},
};

/// The state needed to review transactions.
#[derive(Debug, Clone)]
pub struct ReviewTransactionState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ReviewTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Tell the transaction's creator that it was approved.
pub(super) fn notify_approved(transaction: &Transaction, connection: &Connection) {
    if let Some(creator) = transaction.created_by {
        notify(
            creator,
            NewNotification {
                kind: NotificationKind::TransactionApproved,
                title: "Transaction approved".to_owned(),
                message: format!(
                    "Your transaction '{}' for {} was approved.",
                    transaction.title,
                    format_currency(transaction.amount)
                ),
                related: Some(RelatedObject {
                    object_type: "Transaction",
                    object_id: transaction.id,
                }),
            },
            connection,
        );
    }
}

/// Tell the transaction's creator that it was rejected.
pub(super) fn notify_rejected(transaction: &Transaction, connection: &Connection) {
    if let Some(creator) = transaction.created_by {
        notify(
            creator,
            NewNotification {
                kind: NotificationKind::TransactionRejected,
                title: "Transaction rejected".to_owned(),
                message: format!(
                    "Your transaction '{}' for {} was rejected.",
                    transaction.title,
                    format_currency(transaction.amount)
                ),
                related: Some(RelatedObject {
                    object_type: "Transaction",
                    object_id: transaction.id,
                }),
            },
            connection,
        );
    }
}

/// Approve a transaction, notify its creator and refresh the page.
pub async fn approve_transaction_endpoint(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<ReviewTransactionState>,
    Extension(user_id): Extension<UserID>,
    headers: HeaderMap,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let transaction = match get_transaction(transaction_id, &connection) {
        Ok(transaction) => transaction,
        Err(error @ Error::NotFound) => return error.into_alert_response(),
        Err(error) => {
            tracing::error!("could not get transaction {transaction_id}: {error}");
            return error.into_alert_response();
        }
    };

    if transaction.approved {
        return (
            HxRefresh(true),
            Alert::SuccessSimple {
                message: format!("Transaction '{}' is already approved.", transaction.title),
            },
        )
            .into_response();
    }

    let snapshot = match SpendingSnapshot::capture([transaction.category.as_str()], &connection) {
        Ok(snapshot) => snapshot,
        Err(error) => {
            tracing::error!("could not record spending before approval: {error}");
            return error.into_alert_response();
        }
    };

    if let Err(error) = approve_transaction(transaction_id, &connection) {
        tracing::error!("could not approve transaction {transaction_id}: {error}");
        return error.into_alert_response();
    }

    audit(
        NewAuditEntry {
            user_id,
            action: AuditAction::ApproveTransaction,
            object_type: "Transaction",
            object_id: transaction_id,
            description: format!(
                "Approved '{}' for {}",
                transaction.title,
                format_currency(transaction.amount)
            ),
            ip_address: client_ip(&headers),
        },
        &connection,
    );
    notify_approved(&transaction, &connection);
    snapshot.notify_crossings(&connection);

    (
        HxRefresh(true),
        Alert::SuccessSimple {
            message: format!("Transaction '{}' approved.", transaction.title),
        },
    )
        .into_response()
}

/// Reject a transaction. Rejected transactions are deleted.
pub async fn reject_transaction_endpoint(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<ReviewTransactionState>,
    Extension(user_id): Extension<UserID>,
    headers: HeaderMap,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let transaction = match get_transaction(transaction_id, &connection) {
        Ok(transaction) => transaction,
        Err(Error::NotFound) => return Error::DeleteMissingTransaction.into_alert_response(),
        Err(error) => {
            tracing::error!("could not get transaction {transaction_id}: {error}");
            return error.into_alert_response();
        }
    };

    if let Err(error) = delete_transaction(transaction_id, &connection) {
        tracing::error!("could not reject transaction {transaction_id}: {error}");
        return error.into_alert_response();
    }

    audit(
        NewAuditEntry {
            user_id,
            action: AuditAction::RejectTransaction,
            object_type: "Transaction",
            object_id: transaction_id,
            description: format!(
                "Rejected '{}' for {}",
                transaction.title,
                format_currency(transaction.amount)
            ),
            ip_address: client_ip(&headers),
        },
        &connection,
    );
    notify_rejected(&transaction, &connection);

    Alert::SuccessSimple {
        message: format!(
            "Transaction '{}' has been rejected and deleted.",
            transaction.title
        ),
    }
    .into_response()
}

/// Delete a transaction without notifying its creator.
pub async fn delete_transaction_endpoint(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<ReviewTransactionState>,
    Extension(user_id): Extension<UserID>,
    headers: HeaderMap,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let transaction = match get_transaction(transaction_id, &connection) {
        Ok(transaction) => transaction,
        Err(Error::NotFound) => return Error::DeleteMissingTransaction.into_alert_response(),
        Err(error) => {
            tracing::error!("could not get transaction {transaction_id}: {error}");
            return error.into_alert_response();
        }
    };

    if let Err(error) = delete_transaction(transaction_id, &connection) {
        tracing::error!("could not delete transaction {transaction_id}: {error}");
        return error.into_alert_response();
    }

    audit(
        NewAuditEntry {
            user_id,
            action: AuditAction::DeleteTransaction,
            object_type: "Transaction",
            object_id: transaction_id,
            description: format!(
                "Deleted '{}' for {}",
                transaction.title,
                format_currency(transaction.amount)
            ),
            ip_address: client_ip(&headers),
        },
        &connection,
    );

    Alert::SuccessSimple {
        message: "Transaction deleted successfully".to_owned(),
    }
    .into_response()
}

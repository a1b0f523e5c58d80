//! The page and endpoint for editing a transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::html;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    audit::{AuditAction, NewAuditEntry, audit, client_ip},
    auth::UserID,
    category::get_all_categories,
    database_id::TransactionId,
    endpoints,
    html::{FORM_CONTAINER_STYLE, base, format_currency, rupee_input_styles},
    navigation::{NavBar, get_viewer},
    notification::SpendingSnapshot,
    timezone::local_today,
    transaction::{
        core::{get_transaction, update_transaction},
        form::{TransactionForm, TransactionFormDefaults, transaction_form, validate_transaction},
    },
};

/// The state needed for editing a transaction.
#[derive(Debug, Clone)]
pub struct EditTransactionState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for EditTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Renders the page for editing a transaction.
pub async fn get_edit_transaction_page(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<EditTransactionState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transaction = get_transaction(transaction_id, &connection)?;
    let viewer = get_viewer(user_id, &connection)?;
    let categories = get_all_categories(&connection)
        .inspect_err(|error| tracing::error!("could not get categories: {error}"))?;
    let edit_url = endpoints::format_endpoint(endpoints::EDIT_TRANSACTION_VIEW, transaction_id);
    let nav_bar = NavBar::new(&edit_url, viewer).into_html();
    let update_url = endpoints::format_endpoint(endpoints::TRANSACTION_API, transaction_id);

    let form = transaction_form(
        None,
        Some(&update_url),
        &TransactionFormDefaults {
            title: Some(&transaction.title),
            amount: Some(transaction.amount),
            category: Some(&transaction.category),
            date: transaction.date,
            approved: transaction.approved,
        },
        &categories,
        today,
        true,
        "Update Transaction",
    );

    let title = format!("Edit Transaction: {}", transaction.title);
    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="mb-4 text-xl font-bold" { (title) }
            (form)
        }
    };

    Ok(base(&title, &[rupee_input_styles()], &content).into_response())
}

/// Handles the form submission for editing a transaction.
pub async fn update_transaction_endpoint(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<EditTransactionState>,
    Extension(user_id): Extension<UserID>,
    headers: HeaderMap,
    Form(form): Form<TransactionForm>,
) -> Response {
    let today = match local_today(&state.local_timezone) {
        Ok(today) => today,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let builder = match validate_transaction(
        &form.title,
        form.amount,
        &form.category,
        form.date,
        today,
        &connection,
    ) {
        Ok(builder) => builder.approved(form.approve_now()),
        Err(error) => return error.into_alert_response(),
    };

    let existing = match get_transaction(transaction_id, &connection) {
        Ok(transaction) => transaction,
        Err(Error::NotFound) => return Error::UpdateMissingTransaction.into_alert_response(),
        Err(error) => {
            tracing::error!("could not get transaction {transaction_id}: {error}");
            return error.into_alert_response();
        }
    };

    let snapshot = if builder.approved {
        match SpendingSnapshot::capture(
            [existing.category.as_str(), builder.category.as_str()],
            &connection,
        ) {
            Ok(snapshot) => Some(snapshot),
            Err(error) => {
                tracing::error!("could not record spending before update: {error}");
                return error.into_alert_response();
            }
        }
    } else {
        None
    };

    if let Err(error) = update_transaction(transaction_id, &builder, &connection) {
        tracing::error!("could not update transaction {transaction_id}: {error}");
        return error.into_alert_response();
    }

    audit(
        NewAuditEntry {
            user_id,
            action: AuditAction::UpdateTransaction,
            object_type: "Transaction",
            object_id: transaction_id,
            description: format!(
                "Updated '{}' ({}) to '{}' ({}, {})",
                existing.title,
                format_currency(existing.amount),
                builder.title,
                format_currency(builder.amount),
                builder.category
            ),
            ip_address: client_ip(&headers),
        },
        &connection,
    );

    if let Some(snapshot) = snapshot {
        snapshot.notify_crossings(&connection);
    }

    (
        HxRedirect(endpoints::TRANSACTIONS_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

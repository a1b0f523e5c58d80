//! Budget deletion endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::Alert,
    audit::{AuditAction, NewAuditEntry, audit, client_ip},
    auth::UserID,
    budget::db::{delete_budget, get_budget},
    database_id::BudgetId,
};

/// The state needed for deleting a budget.
#[derive(Debug, Clone)]
pub struct DeleteBudgetState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteBudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Handle budget deletion. Returns a success alert or an error alert.
pub async fn delete_budget_endpoint(
    Path(budget_id): Path<BudgetId>,
    State(state): State<DeleteBudgetState>,
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

    let budget = match get_budget(budget_id, &connection) {
        Ok(budget) => budget,
        Err(Error::NotFound) => return Error::DeleteMissingBudget.into_alert_response(),
        Err(error) => {
            tracing::error!("could not get budget {budget_id}: {error}");
            return error.into_alert_response();
        }
    };

    match delete_budget(budget_id, &connection) {
        Ok(()) => {
            audit(
                NewAuditEntry {
                    user_id,
                    action: AuditAction::DeleteBudget,
                    object_type: "Budget",
                    object_id: budget_id,
                    description: format!("Deleted the {} budget", budget.category_name),
                    ip_address: client_ip(&headers),
                },
                &connection,
            );

            Alert::SuccessSimple {
                message: "Budget deleted successfully".to_owned(),
            }
            .into_response()
        }
        Err(error) => {
            tracing::error!("could not delete budget {budget_id}: {error}");
            error.into_alert_response()
        }
    }
}

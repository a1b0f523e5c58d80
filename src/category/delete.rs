//! Category deletion endpoint.

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
    category::{db::delete_category, get_category},
    database_id::CategoryId,
};

/// The state needed for deleting a category.
#[derive(Debug, Clone)]
pub struct DeleteCategoryState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteCategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Handle category deletion. Returns success alert or error.
pub async fn delete_category_endpoint(
    Path(category_id): Path<CategoryId>,
    State(state): State<DeleteCategoryState>,
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

    let name = match get_category(category_id, &connection) {
        Ok(category) => category.name,
        Err(Error::NotFound) => return Error::DeleteMissingCategory.into_alert_response(),
        Err(error) => {
            tracing::error!("Could not get category {category_id}: {error}");
            return error.into_alert_response();
        }
    };

    match delete_category(category_id, &connection) {
        Ok(_) => {
            audit(
                NewAuditEntry {
                    user_id,
                    action: AuditAction::DeleteCategory,
                    object_type: "Category",
                    object_id: category_id,
                    description: format!("Deleted category '{name}'"),
                    ip_address: client_ip(&headers),
                },
                &connection,
            );

            Alert::SuccessSimple {
                message: "Category deleted successfully".to_owned(),
            }
            .into_response()
        }
        Err(Error::DeleteMissingCategory) => Error::DeleteMissingCategory.into_alert_response(),
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while deleting category {category_id}: {error}"
            );
            error.into_alert_response()
        }
    }
}

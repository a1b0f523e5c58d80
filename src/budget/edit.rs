//! Budget editing page and endpoint.

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
    budget::{
        db::{get_budget, update_budget},
        domain::BudgetForm,
        form::{BudgetFormDefaults, budget_form},
    },
    category::get_all_categories,
    database_id::BudgetId,
    endpoints,
    html::{FORM_CONTAINER_STYLE, base, format_currency, rupee_input_styles},
    navigation::{NavBar, get_viewer},
};

/// The state needed for editing a budget.
#[derive(Debug, Clone)]
pub struct EditBudgetState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditBudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the budget editing page.
pub async fn get_edit_budget_page(
    Path(budget_id): Path<BudgetId>,
    State(state): State<EditBudgetState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let budget = get_budget(budget_id, &connection)?;
    let viewer = get_viewer(user_id, &connection)?;
    let categories = get_all_categories(&connection)
        .inspect_err(|error| tracing::error!("could not get categories: {error}"))?;
    let edit_url = endpoints::format_endpoint(endpoints::EDIT_BUDGET_VIEW, budget_id);
    let nav_bar = NavBar::new(&edit_url, viewer).into_html();
    let update_url = endpoints::format_endpoint(endpoints::BUDGET, budget_id);

    let form = budget_form(
        None,
        Some(&update_url),
        &BudgetFormDefaults {
            category_id: Some(budget.category_id),
            amount: Some(budget.amount),
            start_date: budget.start_date,
            end_date: budget.end_date,
        },
        &categories,
        "Update Budget",
    );

    let title = format!("Edit Budget: {}", budget.category_name);
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

/// Handle budget update form submission.
pub async fn update_budget_endpoint(
    Path(budget_id): Path<BudgetId>,
    State(state): State<EditBudgetState>,
    Extension(user_id): Extension<UserID>,
    headers: HeaderMap,
    Form(form): Form<BudgetForm>,
) -> Response {
    let new_budget = match form.validate() {
        Ok(new_budget) => new_budget,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_budget(budget_id, new_budget, &connection) {
        Ok(()) => {
            audit(
                NewAuditEntry {
                    user_id,
                    action: AuditAction::UpdateBudget,
                    object_type: "Budget",
                    object_id: budget_id,
                    description: format!(
                        "Updated budget {budget_id} to {} from {} to {}",
                        format_currency(new_budget.amount),
                        new_budget.start_date,
                        new_budget.end_date
                    ),
                    ip_address: client_ip(&headers),
                },
                &connection,
            );

            (
                HxRedirect(endpoints::BUDGETS_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error @ (Error::UpdateMissingBudget | Error::DuplicateBudget)) => {
            error.into_alert_response()
        }
        Err(error) => {
            tracing::error!("could not update budget {budget_id}: {error}");
            error.into_alert_response()
        }
    }
}

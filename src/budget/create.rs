//! Budget creation page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::html;
use rusqlite::Connection;
use time::Duration;

use crate::{
    AppState, Error,
    audit::{AuditAction, NewAuditEntry, audit, client_ip},
    auth::UserID,
    budget::{
        db::create_budget,
        domain::BudgetForm,
        form::{BudgetFormDefaults, budget_form},
    },
    category::get_all_categories,
    endpoints,
    html::{FORM_CONTAINER_STYLE, base, format_currency, rupee_input_styles},
    navigation::{NavBar, get_viewer},
    timezone::local_today,
};

/// The state needed for creating a budget.
#[derive(Debug, Clone)]
pub struct CreateBudgetState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateBudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Render the budget creation page.
pub async fn get_new_budget_page(
    State(state): State<CreateBudgetState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let viewer = get_viewer(user_id, &connection)?;
    let categories = get_all_categories(&connection)
        .inspect_err(|error| tracing::error!("could not get categories: {error}"))?;
    let nav_bar = NavBar::new(endpoints::NEW_BUDGET_VIEW, viewer).into_html();

    let form = budget_form(
        Some(endpoints::POST_BUDGET),
        None,
        &BudgetFormDefaults {
            category_id: None,
            amount: None,
            start_date: today,
            end_date: today + Duration::days(90),
        },
        &categories,
        "Create Budget",
    );

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="mb-4 text-xl font-bold" { "Create Budget" }
            (form)
        }
    };

    Ok(base("Create Budget", &[rupee_input_styles()], &content).into_response())
}

/// Handle budget creation form submission.
pub async fn create_budget_endpoint(
    State(state): State<CreateBudgetState>,
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

    match create_budget(new_budget, &connection) {
        Ok(budget) => {
            audit(
                NewAuditEntry {
                    user_id,
                    action: AuditAction::CreateBudget,
                    object_type: "Budget",
                    object_id: budget.id,
                    description: format!(
                        "Set {} budget to {} from {} to {}",
                        budget.category_name,
                        format_currency(budget.amount),
                        budget.start_date,
                        budget.end_date
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
        Err(error @ (Error::DuplicateBudget | Error::NotFound)) => error.into_alert_response(),
        Err(error) => {
            tracing::error!("could not create budget: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod create_budget_tests {
    use axum::{
        Extension, Form,
        extract::State,
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
    };
    use time::macros::date;

    use crate::{
        audit::{AuditAction, get_audit_entries},
        auth::UserID,
        budget::{db::get_all_budgets, domain::BudgetForm},
        category::get_category_by_name,
        endpoints,
        test_utils::{
            assert_form_input, assert_hx_endpoint, assert_hx_redirect, assert_valid_html,
            must_get_form, parse_html_document,
            test_db::{connection_with_treasurer, into_state},
        },
    };

    use super::{CreateBudgetState, create_budget_endpoint, get_new_budget_page};

    fn get_state() -> (CreateBudgetState, UserID, i64) {
        let (connection, treasurer) = connection_with_treasurer();
        let venue = get_category_by_name("Venue", &connection).unwrap();

        (
            CreateBudgetState {
                db_connection: into_state(connection),
                local_timezone: "Etc/UTC".to_owned(),
            },
            treasurer,
            venue.id,
        )
    }

    async fn create(state: &CreateBudgetState, treasurer: UserID, form: BudgetForm) -> Response {
        create_budget_endpoint(
            State(state.clone()),
            Extension(treasurer),
            HeaderMap::new(),
            Form(form),
        )
        .await
        .into_response()
    }

    #[tokio::test]
    async fn new_budget_page_has_form() {
        let (state, treasurer, _) = get_state();

        let response = get_new_budget_page(State(state), Extension(treasurer))
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::POST_BUDGET, "hx-post");
        assert_form_input(&form, "amount", "number");
        assert_form_input(&form, "start_date", "date");
        assert_form_input(&form, "end_date", "date");
    }

    #[tokio::test]
    async fn create_budget_succeeds() {
        let (state, treasurer, venue_id) = get_state();

        let response = create(
            &state,
            treasurer,
            BudgetForm {
                category_id: venue_id,
                amount: 5000.0,
                start_date: date!(2025 - 01 - 01),
                end_date: date!(2025 - 03 - 31),
            },
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::BUDGETS_VIEW);
        let connection = state.db_connection.lock().unwrap();
        assert_eq!(get_all_budgets(&connection).unwrap().len(), 1);
        let entries = get_audit_entries(Some(AuditAction::CreateBudget), 10, &connection).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_budget_is_rejected() {
        let (state, treasurer, venue_id) = get_state();
        let form = || BudgetForm {
            category_id: venue_id,
            amount: 5000.0,
            start_date: date!(2025 - 01 - 01),
            end_date: date!(2025 - 03 - 31),
        };
        create(&state, treasurer, form()).await;

        let response = create(&state, treasurer, form()).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn invalid_period_is_rejected() {
        let (state, treasurer, venue_id) = get_state();

        let response = create(
            &state,
            treasurer,
            BudgetForm {
                category_id: venue_id,
                amount: 5000.0,
                start_date: date!(2025 - 03 - 31),
                end_date: date!(2025 - 01 - 01),
            },
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let connection = state.db_connection.lock().unwrap();
        assert!(get_all_budgets(&connection).unwrap().is_empty());
    }
}

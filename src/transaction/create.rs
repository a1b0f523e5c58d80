//! The page and endpoint for submitting a new transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::html;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::UserID,
    category::get_all_categories,
    endpoints,
    html::{FORM_CONTAINER_STYLE, base, rupee_input_styles},
    navigation::{NavBar, get_viewer},
    notification::SpendingSnapshot,
    timezone::local_today,
    transaction::{
        core::create_transaction,
        form::{TransactionForm, TransactionFormDefaults, transaction_form, validate_transaction},
    },
};

/// The state needed to get or create a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Renders the page for submitting a transaction.
pub async fn get_new_transaction_page(
    State(state): State<CreateTransactionState>,
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
    let is_treasurer = viewer.is_treasurer;
    let nav_bar = NavBar::new(endpoints::NEW_TRANSACTION_VIEW, viewer).into_html();

    let form = transaction_form(
        Some(endpoints::TRANSACTIONS_API),
        None,
        &TransactionFormDefaults {
            title: None,
            amount: None,
            category: None,
            date: today,
            approved: false,
        },
        &categories,
        today,
        is_treasurer,
        "Submit Transaction",
    );

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="mb-4 text-xl font-bold" { "New Transaction" }
            (form)
        }
    };

    Ok(base("New Transaction", &[rupee_input_styles()], &content).into_response())
}

/// A route handler for creating a new transaction, redirects to transactions view on success.
///
/// Members' transactions wait for a treasurer's approval. Treasurers may
/// approve their own transactions when submitting them.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    Extension(user_id): Extension<UserID>,
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
        Ok(builder) => builder,
        Err(error) => return error.into_alert_response(),
    };

    let is_treasurer = match get_viewer(user_id, &connection) {
        Ok(viewer) => viewer.is_treasurer,
        Err(error) => {
            tracing::error!("could not get user {user_id}: {error}");
            return error.into_alert_response();
        }
    };
    let approve_now = is_treasurer && form.approve_now();

    let snapshot = if approve_now {
        match SpendingSnapshot::capture([builder.category.as_str()], &connection) {
            Ok(snapshot) => Some(snapshot),
            Err(error) => {
                tracing::error!("could not record spending before approval: {error}");
                return error.into_alert_response();
            }
        }
    } else {
        None
    };

    if let Err(error) = create_transaction(
        builder.approved(approve_now).created_by(Some(user_id)),
        &connection,
    ) {
        tracing::error!("could not create transaction: {error}");
        return error.into_alert_response();
    }

    if let Some(snapshot) = snapshot {
        snapshot.notify_crossings(&connection);
    }

    (
        HxRedirect(endpoints::TRANSACTIONS_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

#[cfg(test)]
mod create_transaction_tests {
    use axum::{
        Extension, Form,
        extract::State,
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    use time::{Duration, OffsetDateTime};

    use crate::{
        auth::{Role, UserID},
        endpoints,
        test_utils::{
            assert_form_input, assert_hx_endpoint, assert_hx_redirect, assert_valid_html,
            must_get_form, parse_html_document,
            test_db::{connection_with_treasurer, insert_user, into_state},
        },
        transaction::{
            core::{count_transactions, get_transaction},
            create::{CreateTransactionState, create_transaction_endpoint, get_new_transaction_page},
            form::TransactionForm,
        },
    };

    fn get_state() -> (CreateTransactionState, UserID, UserID) {
        let (connection, treasurer) = connection_with_treasurer();
        let member = insert_user("member", Role::Member, &connection);

        (
            CreateTransactionState {
                db_connection: into_state(connection),
                local_timezone: "Etc/UTC".to_owned(),
            },
            treasurer,
            member,
        )
    }

    fn form(amount: f64, category: &str, approve_now: bool) -> TransactionForm {
        TransactionForm {
            title: "Venue deposit".to_owned(),
            amount,
            category: category.to_owned(),
            date: OffsetDateTime::now_utc().date(),
            approve_now: approve_now.then(|| "on".to_owned()),
        }
    }

    async fn submit(state: &CreateTransactionState, user_id: UserID, form: TransactionForm) -> Response {
        create_transaction_endpoint(State(state.clone()), Extension(user_id), Form(form))
            .await
            .into_response()
    }

    #[tokio::test]
    async fn page_shows_approve_checkbox_to_treasurers_only() {
        let (state, treasurer, member) = get_state();

        let response = get_new_transaction_page(State(state.clone()), Extension(treasurer))
            .await
            .unwrap();
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::TRANSACTIONS_API, "hx-post");
        assert_form_input(&form, "title", "text");
        assert_form_input(&form, "amount", "number");
        assert_form_input(&form, "date", "date");
        let checkbox = scraper::Selector::parse("input[name=approve_now]").unwrap();
        assert_eq!(form.select(&checkbox).count(), 1);

        let response = get_new_transaction_page(State(state), Extension(member))
            .await
            .unwrap();
        let html = parse_html_document(response).await;
        assert_eq!(html.select(&checkbox).count(), 0);
    }

    #[tokio::test]
    async fn member_transaction_starts_pending() {
        let (state, _, member) = get_state();

        let response = submit(&state, member, form(-500.0, "Venue", true)).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::TRANSACTIONS_VIEW);
        let connection = state.db_connection.lock().unwrap();
        let transaction = get_transaction(1, &connection).unwrap();
        assert!(!transaction.approved);
        assert_eq!(transaction.created_by, Some(member));
    }

    #[tokio::test]
    async fn treasurer_can_approve_at_creation() {
        let (state, treasurer, _) = get_state();

        submit(&state, treasurer, form(-500.0, "Venue", true)).await;

        let connection = state.db_connection.lock().unwrap();
        assert!(get_transaction(1, &connection).unwrap().approved);
    }

    #[tokio::test]
    async fn positive_expense_is_rejected() {
        let (state, _, member) = get_state();

        let response = submit(&state, member, form(500.0, "Venue", false)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let connection = state.db_connection.lock().unwrap();
        assert_eq!(count_transactions(&connection), Ok(0));
    }

    #[tokio::test]
    async fn future_date_is_rejected() {
        let (state, _, member) = get_state();
        let mut form = form(-500.0, "Venue", false);
        form.date = OffsetDateTime::now_utc().date() + Duration::days(2);

        let response = submit(&state, member, form).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

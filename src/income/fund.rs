//! Pages and endpoints for recording management funds.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use time::Date;

use crate::{
    AppState, Error,
    alert::Alert,
    audit::{AuditAction, NewAuditEntry, audit, client_ip},
    auth::UserID,
    database_id::FundId,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
        format_currency, rupee_input_styles,
    },
    income::{
        db::{create_fund, delete_fund, get_fund, update_fund},
        domain::FundForm,
    },
    navigation::{NavBar, get_viewer},
    notification::{NewNotification, NotificationKind, RelatedObject, notify_all_treasurers},
    timezone::local_today,
};

/// The state needed to record, edit and delete management funds.
#[derive(Debug, Clone)]
pub struct FundState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for FundState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// How the fund form submits and what it shows.
struct FundFormView<'a> {
    hx_method: &'a str,
    endpoint: &'a str,
    amount: Option<f64>,
    date_received: Date,
    max_date: Date,
    submit_text: &'a str,
}

fn fund_form(view: &FundFormView) -> Markup {
    let amount = view.amount.map(|amount| format!("{amount:.2}"));
    let hx_post = (view.hx_method == "post").then_some(view.endpoint);
    let hx_put = (view.hx_method == "put").then_some(view.endpoint);

    html! {
        form
            hx-post=[hx_post]
            hx-put=[hx_put]
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

                div class="input-wrapper w-full"
                {
                    input
                        id="amount"
                        name="amount"
                        type="number"
                        step="0.01"
                        min="0.01"
                        max="1000000"
                        placeholder="5000.00"
                        value=[amount]
                        required
                        autofocus
                        class=(FORM_TEXT_INPUT_STYLE);
                }
            }

            div
            {
                label for="date_received" class=(FORM_LABEL_STYLE) { "Date Received" }

                input
                    id="date_received"
                    name="date_received"
                    type="date"
                    max=(view.max_date)
                    value=(view.date_received)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { (view.submit_text) }
        }
    }
}

fn fund_page(title: &str, nav_bar: Markup, form: Markup) -> Markup {
    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="mb-4 text-xl font-bold" { (title) }
            (form)
        }
    };

    base(title, &[rupee_input_styles()], &content)
}

/// Render the page for recording a new management fund.
pub async fn get_new_fund_page(
    State(state): State<FundState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let viewer = get_viewer(user_id, &connection)?;
    let nav_bar = NavBar::new(endpoints::NEW_FUND_VIEW, viewer).into_html();

    let form = fund_form(&FundFormView {
        hx_method: "post",
        endpoint: endpoints::POST_FUND,
        amount: None,
        date_received: today,
        max_date: today,
        submit_text: "Save Fund",
    });

    Ok(fund_page("Add Management Fund", nav_bar, form).into_response())
}

/// Render the page for editing a management fund.
pub async fn get_edit_fund_page(
    Path(fund_id): Path<FundId>,
    State(state): State<FundState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let fund = get_fund(fund_id, &connection)?;
    let viewer = get_viewer(user_id, &connection)?;
    let edit_url = endpoints::format_endpoint(endpoints::EDIT_FUND_VIEW, fund_id);
    let nav_bar = NavBar::new(&edit_url, viewer).into_html();
    let update_url = endpoints::format_endpoint(endpoints::FUND, fund_id);

    let form = fund_form(&FundFormView {
        hx_method: "put",
        endpoint: &update_url,
        amount: Some(fund.amount),
        date_received: fund.date_received,
        max_date: today,
        submit_text: "Update Fund",
    });
    let title = format!("Edit Management Fund: {}", format_currency(fund.amount));

    Ok(fund_page(&title, nav_bar, form).into_response())
}

/// Record a management fund and tell the treasurers about it.
pub async fn create_fund_endpoint(
    State(state): State<FundState>,
    Extension(user_id): Extension<UserID>,
    headers: HeaderMap,
    Form(form): Form<FundForm>,
) -> Response {
    let new_fund = match local_today(&state.local_timezone).and_then(|today| form.validate(today)) {
        Ok(new_fund) => new_fund,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let fund = match create_fund(new_fund, &connection) {
        Ok(fund) => fund,
        Err(error) => {
            tracing::error!("could not create management fund: {error}");
            return error.into_alert_response();
        }
    };

    let amount = format_currency(fund.amount);

    audit(
        NewAuditEntry {
            user_id,
            action: AuditAction::CreateFund,
            object_type: "ManagementFund",
            object_id: fund.id,
            description: format!("Recorded management fund of {amount} on {}", fund.date_received),
            ip_address: client_ip(&headers),
        },
        &connection,
    );

    notify_all_treasurers(
        NewNotification {
            kind: NotificationKind::FundCreated,
            title: "Management fund recorded".to_owned(),
            message: format!("A management fund of {amount} was received on {}.", fund.date_received),
            related: Some(RelatedObject {
                object_type: "ManagementFund",
                object_id: fund.id,
            }),
        },
        &connection,
    );

    (
        HxRedirect(endpoints::INCOME_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

/// Replace the amount and date of a management fund.
pub async fn update_fund_endpoint(
    Path(fund_id): Path<FundId>,
    State(state): State<FundState>,
    Extension(user_id): Extension<UserID>,
    headers: HeaderMap,
    Form(form): Form<FundForm>,
) -> Response {
    let new_fund = match local_today(&state.local_timezone).and_then(|today| form.validate(today)) {
        Ok(new_fund) => new_fund,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_fund(fund_id, new_fund, &connection) {
        Ok(()) => {
            audit(
                NewAuditEntry {
                    user_id,
                    action: AuditAction::UpdateFund,
                    object_type: "ManagementFund",
                    object_id: fund_id,
                    description: format!(
                        "Updated management fund to {} on {}",
                        format_currency(new_fund.amount),
                        new_fund.date_received
                    ),
                    ip_address: client_ip(&headers),
                },
                &connection,
            );

            (
                HxRedirect(endpoints::INCOME_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(Error::UpdateMissingFund) => Error::UpdateMissingFund.into_alert_response(),
        Err(error) => {
            tracing::error!("could not update management fund {fund_id}: {error}");
            error.into_alert_response()
        }
    }
}

/// Delete a management fund.
pub async fn delete_fund_endpoint(
    Path(fund_id): Path<FundId>,
    State(state): State<FundState>,
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

    let fund = match get_fund(fund_id, &connection) {
        Ok(fund) => fund,
        Err(Error::NotFound) => return Error::DeleteMissingFund.into_alert_response(),
        Err(error) => {
            tracing::error!("could not get management fund {fund_id}: {error}");
            return error.into_alert_response();
        }
    };

    match delete_fund(fund_id, &connection) {
        Ok(()) => {
            let amount = format_currency(fund.amount);

            audit(
                NewAuditEntry {
                    user_id,
                    action: AuditAction::DeleteFund,
                    object_type: "ManagementFund",
                    object_id: fund_id,
                    description: format!("Deleted management fund of {amount}"),
                    ip_address: client_ip(&headers),
                },
                &connection,
            );

            Alert::SuccessSimple {
                message: format!("Management fund of {amount} has been deleted"),
            }
            .into_response()
        }
        Err(error) => {
            tracing::error!("could not delete management fund {fund_id}: {error}");
            error.into_alert_response()
        }
    }
}

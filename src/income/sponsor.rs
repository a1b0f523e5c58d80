//! Pages and endpoints for recording sponsors.

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
    database_id::SponsorId,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
        format_currency, rupee_input_styles,
    },
    income::{
        db::{create_sponsor, delete_sponsor, get_sponsor, update_sponsor},
        domain::{Sponsor, SponsorForm},
    },
    navigation::{NavBar, get_viewer},
    timezone::local_today,
};

/// The state needed to record, edit and delete sponsors.
#[derive(Debug, Clone)]
pub struct SponsorState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for SponsorState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

fn sponsor_form(
    hx_post: Option<&str>,
    hx_put: Option<&str>,
    sponsor: Option<&Sponsor>,
    today: Date,
) -> Markup {
    let name = sponsor.map(|sponsor| sponsor.name.as_str());
    let amount = sponsor.map(|sponsor| format!("{:.2}", sponsor.amount));
    let date_received = sponsor.map_or(today, |sponsor| sponsor.date_received);
    let contact_email = sponsor.and_then(|sponsor| sponsor.contact_email.as_deref());
    let submit_text = if sponsor.is_some() {
        "Update Sponsor"
    } else {
        "Save Sponsor"
    };

    html! {
        form
            hx-post=[hx_post]
            hx-put=[hx_put]
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="name" class=(FORM_LABEL_STYLE) { "Sponsor Name" }

                input
                    id="name"
                    name="name"
                    type="text"
                    minlength="2"
                    placeholder="e.g., Tech Corp Inc."
                    value=[name]
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Sponsorship Amount" }

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
                    max=(today)
                    value=(date_received)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="contact_email" class=(FORM_LABEL_STYLE) { "Contact Email" }

                input
                    id="contact_email"
                    name="contact_email"
                    type="email"
                    placeholder="sponsor@example.com"
                    value=[contact_email]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { (submit_text) }
        }
    }
}

fn sponsor_page(title: &str, nav_bar: Markup, form: Markup) -> Markup {
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

/// Render the page for recording a new sponsor.
pub async fn get_new_sponsor_page(
    State(state): State<SponsorState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let viewer = get_viewer(user_id, &connection)?;
    let nav_bar = NavBar::new(endpoints::NEW_SPONSOR_VIEW, viewer).into_html();
    let form = sponsor_form(Some(endpoints::POST_SPONSOR), None, None, today);

    Ok(sponsor_page("Add New Sponsor", nav_bar, form).into_response())
}

/// Render the page for editing a sponsor.
pub async fn get_edit_sponsor_page(
    Path(sponsor_id): Path<SponsorId>,
    State(state): State<SponsorState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let sponsor = get_sponsor(sponsor_id, &connection)?;
    let viewer = get_viewer(user_id, &connection)?;
    let edit_url = endpoints::format_endpoint(endpoints::EDIT_SPONSOR_VIEW, sponsor_id);
    let nav_bar = NavBar::new(&edit_url, viewer).into_html();
    let update_url = endpoints::format_endpoint(endpoints::SPONSOR, sponsor_id);
    let form = sponsor_form(None, Some(&update_url), Some(&sponsor), today);

    Ok(sponsor_page(&format!("Edit Sponsor: {}", sponsor.name), nav_bar, form).into_response())
}

/// Record a new sponsor.
pub async fn create_sponsor_endpoint(
    State(state): State<SponsorState>,
    Extension(user_id): Extension<UserID>,
    headers: HeaderMap,
    Form(form): Form<SponsorForm>,
) -> Response {
    let new_sponsor = match local_today(&state.local_timezone).and_then(|today| form.validate(today))
    {
        Ok(new_sponsor) => new_sponsor,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_sponsor(new_sponsor, &connection) {
        Ok(sponsor) => {
            audit(
                NewAuditEntry {
                    user_id,
                    action: AuditAction::CreateSponsor,
                    object_type: "Sponsor",
                    object_id: sponsor.id,
                    description: format!(
                        "Added sponsor '{}' ({} tier) for {}",
                        sponsor.name,
                        sponsor.tier(),
                        format_currency(sponsor.amount)
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
        Err(error) => {
            tracing::error!("could not create sponsor: {error}");
            error.into_alert_response()
        }
    }
}

/// Replace the details of a sponsor.
pub async fn update_sponsor_endpoint(
    Path(sponsor_id): Path<SponsorId>,
    State(state): State<SponsorState>,
    Extension(user_id): Extension<UserID>,
    headers: HeaderMap,
    Form(form): Form<SponsorForm>,
) -> Response {
    let new_sponsor = match local_today(&state.local_timezone).and_then(|today| form.validate(today))
    {
        Ok(new_sponsor) => new_sponsor,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let description = format!(
        "Updated sponsor '{}' to {}",
        new_sponsor.name,
        format_currency(new_sponsor.amount)
    );

    match update_sponsor(sponsor_id, new_sponsor, &connection) {
        Ok(()) => {
            audit(
                NewAuditEntry {
                    user_id,
                    action: AuditAction::UpdateSponsor,
                    object_type: "Sponsor",
                    object_id: sponsor_id,
                    description,
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
        Err(Error::UpdateMissingSponsor) => Error::UpdateMissingSponsor.into_alert_response(),
        Err(error) => {
            tracing::error!("could not update sponsor {sponsor_id}: {error}");
            error.into_alert_response()
        }
    }
}

/// Delete a sponsor.
pub async fn delete_sponsor_endpoint(
    Path(sponsor_id): Path<SponsorId>,
    State(state): State<SponsorState>,
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

    let sponsor = match get_sponsor(sponsor_id, &connection) {
        Ok(sponsor) => sponsor,
        Err(Error::NotFound) => return Error::DeleteMissingSponsor.into_alert_response(),
        Err(error) => {
            tracing::error!("could not get sponsor {sponsor_id}: {error}");
            return error.into_alert_response();
        }
    };

    match delete_sponsor(sponsor_id, &connection) {
        Ok(()) => {
            audit(
                NewAuditEntry {
                    user_id,
                    action: AuditAction::DeleteSponsor,
                    object_type: "Sponsor",
                    object_id: sponsor_id,
                    description: format!("Deleted sponsor '{}'", sponsor.name),
                    ip_address: client_ip(&headers),
                },
                &connection,
            );

            Alert::SuccessSimple {
                message: format!("Sponsor \"{}\" has been deleted", sponsor.name),
            }
            .into_response()
        }
        Err(error) => {
            tracing::error!("could not delete sponsor {sponsor_id}: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod sponsor_endpoint_tests {
    use axum::{
        Extension, Form,
        extract::{Path, State},
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
    };
    use time::OffsetDateTime;

    use crate::{
        audit::{AuditAction, get_audit_entries},
        auth::UserID,
        endpoints,
        income::{db::get_sponsor, domain::SponsorForm},
        test_utils::{
            assert_form_input, assert_form_input_with_value, assert_hx_endpoint,
            assert_hx_redirect, assert_valid_html, must_get_form, parse_html_document,
            test_db::{connection_with_treasurer, into_state},
        },
    };

    use super::{
        SponsorState, create_sponsor_endpoint, delete_sponsor_endpoint, get_edit_sponsor_page,
        get_new_sponsor_page, update_sponsor_endpoint,
    };

    fn get_state() -> (SponsorState, UserID) {
        let (connection, treasurer) = connection_with_treasurer();

        (
            SponsorState {
                db_connection: into_state(connection),
                local_timezone: "Etc/UTC".to_owned(),
            },
            treasurer,
        )
    }

    fn form(name: &str, amount: f64) -> Form<SponsorForm> {
        Form(SponsorForm {
            name: name.to_owned(),
            amount,
            date_received: OffsetDateTime::now_utc().date(),
            contact_email: Some("Team@Acme.com".to_owned()),
        })
    }

    async fn create(state: &SponsorState, treasurer: UserID, name: &str, amount: f64) -> Response {
        create_sponsor_endpoint(
            State(state.clone()),
            Extension(treasurer),
            HeaderMap::new(),
            form(name, amount),
        )
        .await
        .into_response()
    }

    #[tokio::test]
    async fn new_sponsor_page_has_form() {
        let (state, treasurer) = get_state();

        let response = get_new_sponsor_page(State(state), Extension(treasurer))
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::POST_SPONSOR, "hx-post");
        assert_form_input(&form, "name", "text");
        assert_form_input(&form, "amount", "number");
        assert_form_input(&form, "date_received", "date");
    }

    #[tokio::test]
    async fn create_sponsor_succeeds() {
        let (state, treasurer) = get_state();

        let response = create(&state, treasurer, "Acme", 250_000.0).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::INCOME_VIEW);
        let connection = state.db_connection.lock().unwrap();
        let sponsor = get_sponsor(1, &connection).unwrap();
        assert_eq!(sponsor.contact_email.as_deref(), Some("team@acme.com"));
        let entries = get_audit_entries(Some(AuditAction::CreateSponsor), 10, &connection).unwrap();
        assert!(
            entries[0]
                .description
                .starts_with("Added sponsor 'Acme' (Gold tier)")
        );
    }

    #[tokio::test]
    async fn create_sponsor_rejects_short_name() {
        let (state, treasurer) = get_state();

        let response = create(&state, treasurer, "A", 100.0).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn edit_page_is_prefilled() {
        let (state, treasurer) = get_state();
        create(&state, treasurer, "Acme", 100.0).await;

        let response = get_edit_sponsor_page(Path(1), State(state), Extension(treasurer))
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(
            &form,
            &endpoints::format_endpoint(endpoints::SPONSOR, 1),
            "hx-put",
        );
        assert_form_input_with_value(&form, "name", "text", "Acme");
    }

    #[tokio::test]
    async fn update_and_delete_sponsor() {
        let (state, treasurer) = get_state();
        create(&state, treasurer, "Acme", 100.0).await;

        let response = update_sponsor_endpoint(
            Path(1),
            State(state.clone()),
            Extension(treasurer),
            HeaderMap::new(),
            form("Acme Ltd", 60_000.0),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            get_sponsor(1, &state.db_connection.lock().unwrap()).unwrap().name,
            "Acme Ltd"
        );

        let response = delete_sponsor_endpoint(
            Path(1),
            State(state.clone()),
            Extension(treasurer),
            HeaderMap::new(),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let response = update_sponsor_endpoint(
            Path(1),
            State(state),
            Extension(treasurer),
            HeaderMap::new(),
            form("Acme Ltd", 60_000.0),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

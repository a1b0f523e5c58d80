//! Category creation page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    audit::{AuditAction, NewAuditEntry, audit, client_ip},
    auth::UserID,
    category::{CategoryName, create_category, domain::CategoryFormData},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
    },
    navigation::{NavBar, get_viewer},
};

/// The state needed for creating a category.
#[derive(Debug, Clone)]
pub struct CreateCategoryState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateCategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the category creation page.
pub async fn get_new_category_page(
    State(state): State<CreateCategoryState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let viewer = get_viewer(user_id, &connection)?;
    let nav_bar = NavBar::new(endpoints::NEW_CATEGORY_VIEW, viewer).into_html();

    Ok(new_category_view(nav_bar).into_response())
}

/// Handle category creation form submission.
pub async fn create_category_endpoint(
    State(state): State<CreateCategoryState>,
    Extension(user_id): Extension<UserID>,
    headers: HeaderMap,
    Form(new_category): Form<CategoryFormData>,
) -> Response {
    let name = match CategoryName::new(&new_category.name) {
        Ok(name) => name,
        Err(error) => {
            return new_category_form_view(&format!("Error: {error}")).into_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_category(name, &connection) {
        Ok(category) => {
            audit(
                NewAuditEntry {
                    user_id,
                    action: AuditAction::CreateCategory,
                    object_type: "Category",
                    object_id: category.id,
                    description: format!("Created category '{}'", category.name),
                    ip_address: client_ip(&headers),
                },
                &connection,
            );

            (
                HxRedirect(endpoints::CATEGORIES_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(Error::DuplicateCategoryName) => Error::DuplicateCategoryName.into_alert_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a category: {error}");

            error.into_alert_response()
        }
    }
}

fn new_category_view(nav_bar: Markup) -> Markup {
    let form = new_category_form_view("");

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE) { (form) }
    };

    base("Create Category", &[], &content)
}

fn new_category_form_view(error_message: &str) -> Markup {
    html! {
        form
            hx-post=(endpoints::POST_CATEGORY)
            hx-target-error="#alert-container"
            hx-swap="outerHTML"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label
                    for="name"
                    class=(FORM_LABEL_STYLE)
                {
                    "Category Name"
                }

                input
                    id="name"
                    type="text"
                    name="name"
                    placeholder="Category Name"
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            @if !error_message.is_empty() {
                p class="text-red-600 dark:text-red-400"
                {
                    (error_message)
                }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create Category" }
        }
    }
}

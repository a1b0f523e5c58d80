//! Category editing page and endpoint.

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

use crate::{
    AppState, Error,
    audit::{AuditAction, NewAuditEntry, audit, client_ip},
    auth::UserID,
    category::{CategoryName, domain::CategoryFormData, get_category, update_category},
    database_id::CategoryId,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
    },
    navigation::{NavBar, get_viewer},
};

/// The state needed for editing a category.
#[derive(Debug, Clone)]
pub struct EditCategoryState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditCategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the category editing page.
pub async fn get_edit_category_page(
    Path(category_id): Path<CategoryId>,
    State(state): State<EditCategoryState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let viewer = get_viewer(user_id, &connection)?;
    let edit_endpoint = endpoints::format_endpoint(endpoints::EDIT_CATEGORY_VIEW, category_id);
    let update_endpoint = endpoints::format_endpoint(endpoints::CATEGORY, category_id);
    let nav_bar = NavBar::new(&edit_endpoint, viewer).into_html();

    match get_category(category_id, &connection) {
        Ok(category) => Ok(edit_category_view(
            nav_bar,
            &update_endpoint,
            category.name.as_ref(),
            "",
        )
        .into_response()),
        Err(error) => {
            let error_message = match error {
                Error::NotFound => "Category not found",
                _ => {
                    tracing::error!("Failed to retrieve category {category_id}: {error}");
                    "Failed to load category"
                }
            };

            Ok(edit_category_view(nav_bar, &update_endpoint, "", error_message).into_response())
        }
    }
}

/// Handle category update form submission.
pub async fn update_category_endpoint(
    Path(category_id): Path<CategoryId>,
    State(state): State<EditCategoryState>,
    Extension(user_id): Extension<UserID>,
    headers: HeaderMap,
    Form(form_data): Form<CategoryFormData>,
) -> Response {
    let update_endpoint = endpoints::format_endpoint(endpoints::CATEGORY, category_id);

    let name = match CategoryName::new(&form_data.name) {
        Ok(name) => name,
        Err(error) => {
            return edit_category_form_view(
                &update_endpoint,
                &form_data.name,
                &format!("Error: {error}"),
            )
            .into_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let description = format!("Renamed category {category_id} to '{name}'");

    match update_category(category_id, name, &connection) {
        Ok(_) => {
            audit(
                NewAuditEntry {
                    user_id,
                    action: AuditAction::UpdateCategory,
                    object_type: "Category",
                    object_id: category_id,
                    description,
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
        Err(error @ (Error::UpdateMissingCategory | Error::DuplicateCategoryName)) => {
            error.into_alert_response()
        }
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while updating category {category_id}: {error}"
            );
            error.into_alert_response()
        }
    }
}

fn edit_category_view(
    nav_bar: Markup,
    update_endpoint: &str,
    category_name: &str,
    error_message: &str,
) -> Markup {
    let form = edit_category_form_view(update_endpoint, category_name, error_message);

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE) { (form) }
    };

    base("Edit Category", &[], &content)
}

fn edit_category_form_view(
    update_category_endpoint: &str,
    category_name: &str,
    error_message: &str,
) -> Markup {
    html! {
        form
            hx-put=(update_category_endpoint)
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
                    value=(category_name)
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

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Update Category" }
        }
    }
}

//! The notifications page and the endpoint for marking notifications as read.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::UserID,
    endpoints,
    html::{BUTTON_SECONDARY_STYLE, PAGE_CONTAINER_STYLE, base},
    navigation::{NavBar, get_viewer},
    notification::{Notification, get_notifications, mark_all_notifications_read},
};

/// The state needed for the notifications page and endpoint.
#[derive(Debug, Clone)]
pub struct NotificationsState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for NotificationsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the user's notifications, newest first.
pub async fn get_notifications_page(
    State(state): State<NotificationsState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let viewer = get_viewer(user_id, &connection)?;
    let notifications = get_notifications(user_id, &connection)
        .inspect_err(|error| tracing::error!("Could not get notifications: {error}"))?;

    let nav_bar = NavBar::new(endpoints::NOTIFICATIONS_VIEW, viewer).into_html();

    Ok(notifications_view(nav_bar, &notifications).into_response())
}

/// Mark all of the user's notifications as read and reload the page.
pub async fn mark_notifications_read_endpoint(
    State(state): State<NotificationsState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match mark_all_notifications_read(user_id, &connection) {
        Ok(count) => {
            tracing::debug!("Marked {count} notifications as read for user {user_id}");
            (
                HxRedirect(endpoints::NOTIFICATIONS_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!("Could not mark notifications as read: {error}");
            error.into_alert_response()
        }
    }
}

fn notification_item(notification: &Notification) -> Markup {
    let style = if notification.is_read {
        "p-4 rounded border border-gray-200 bg-white dark:bg-gray-800 dark:border-gray-700"
    } else {
        "p-4 rounded border border-blue-300 bg-blue-50 dark:bg-blue-900/30 dark:border-blue-700"
    };

    html! {
        li class=(style) data-unread=[(!notification.is_read).then_some("true")]
        {
            div class="flex justify-between gap-4"
            {
                h2 class="font-semibold" { (notification.title) }
                time
                    class="text-xs text-gray-500 dark:text-gray-400 whitespace-nowrap"
                    datetime=(notification.created_at.date())
                {
                    (notification.created_at.date())
                }
            }

            p class="text-sm" { (notification.message) }
        }
    }
}

fn notifications_view(nav_bar: Markup, notifications: &[Notification]) -> Markup {
    let has_unread = notifications.iter().any(|notification| !notification.is_read);

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 w-full max-w-2xl"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Notifications" }

                    @if has_unread {
                        form
                            hx-post=(endpoints::MARK_NOTIFICATIONS_READ)
                            hx-target-error="#alert-container"
                        {
                            button type="submit" class=(BUTTON_SECONDARY_STYLE)
                            {
                                "Mark all as read"
                            }
                        }
                    }
                }

                @if notifications.is_empty() {
                    p class="text-gray-500 dark:text-gray-400" { "You have no notifications." }
                } @else {
                    ul class="space-y-2"
                    {
                        @for notification in notifications {
                            (notification_item(notification))
                        }
                    }
                }
            }
        }
    };

    base("Notifications", &[], &content)
}

//! The treasurer only audit log page.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    audit::{AUDIT_PAGE_LIMIT, AuditAction, AuditEntry, get_audit_entries},
    auth::UserID,
    endpoints,
    html::{
        BADGE_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, TABLE_STYLE, base,
    },
    navigation::{NavBar, get_viewer},
};

/// The state needed for the audit log page.
#[derive(Debug, Clone)]
pub struct AuditLogState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AuditLogState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditLogQuery {
    pub action: Option<String>,
}

/// Render the latest audit entries, optionally filtered by action.
///
/// An unrecognised action is ignored and all entries are shown.
pub async fn get_audit_log_page(
    State(state): State<AuditLogState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<AuditLogQuery>,
) -> Result<Response, Error> {
    let action = query
        .action
        .as_deref()
        .filter(|action| !action.is_empty())
        .and_then(|action| {
            action
                .parse::<AuditAction>()
                .inspect_err(|error| tracing::warn!("Ignoring audit filter: {error}"))
                .ok()
        });

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let viewer = get_viewer(user_id, &connection)?;
    let entries = get_audit_entries(action, AUDIT_PAGE_LIMIT, &connection)
        .inspect_err(|error| tracing::error!("Could not get audit log entries: {error}"))?;

    let nav_bar = NavBar::new(endpoints::AUDIT_LOG_VIEW, viewer).into_html();

    Ok(audit_log_view(nav_bar, &entries, action).into_response())
}

fn action_filter(selected: Option<AuditAction>) -> Markup {
    html! {
        form method="get" action=(endpoints::AUDIT_LOG_VIEW) class="flex items-end gap-4"
        {
            div
            {
                label for="action" class=(FORM_LABEL_STYLE) { "Action" }

                select id="action" name="action" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" selected[selected.is_none()] { "All actions" }

                    @for action in AuditAction::ALL {
                        option value=(action.as_str()) selected[selected == Some(action)]
                        {
                            (action.label())
                        }
                    }
                }
            }

            button type="submit" class="px-4 py-2 bg-blue-500 dark:bg-blue-600 \
                hover:bg-blue-600 text-white rounded"
            {
                "Filter"
            }

            a href=(endpoints::AUDIT_LOG_VIEW) class=(LINK_STYLE) { "Clear" }
        }
    }
}

fn audit_log_view(nav_bar: Markup, entries: &[AuditEntry], action: Option<AuditAction>) -> Markup {
    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 w-full lg:max-w-6xl"
            {
                header class="flex justify-between flex-wrap items-end gap-4"
                {
                    h1 class="text-xl font-bold" { "Audit Log" }
                    (action_filter(action))
                }

                div class="overflow-x-auto"
                {
                    table class=(TABLE_STYLE)
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Time (UTC)" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "User" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Action" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Object" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "IP Address" }
                            }
                        }

                        tbody
                        {
                            @for entry in entries {
                                tr class=(TABLE_ROW_STYLE) data-audit-entry=(entry.id)
                                {
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        (entry.timestamp.date()) " "
                                        (format!("{:02}:{:02}", entry.timestamp.hour(), entry.timestamp.minute()))
                                    }
                                    td class=(TABLE_CELL_STYLE) { (entry.username) }
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        span class=(BADGE_STYLE) { (entry.action.label()) }
                                    }
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        (entry.object_type) " #" (entry.object_id)
                                    }
                                    td class=(TABLE_CELL_STYLE) { (entry.description) }
                                    td class=(TABLE_CELL_STYLE) { (entry.ip_address) }
                                }
                            }

                            @if entries.is_empty() {
                                tr
                                {
                                    td
                                        colspan="6"
                                        class="px-6 py-4 text-center text-gray-500 dark:text-gray-400"
                                    {
                                        "No audit entries yet."
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    base("Audit Log", &[], &content)
}

#[cfg(test)]
mod audit_log_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Query, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use rusqlite::Connection;
    use scraper::Selector;
    use time::OffsetDateTime;

    use crate::{
        audit::{AuditAction, NewAuditEntry, record_audit},
        auth::{PasswordHash, Role, UserID, create_user},
        db::initialize,
        test_utils::{assert_valid_html, parse_html_document},
    };

    use super::{AuditLogQuery, AuditLogState, get_audit_log_page};

    fn get_state() -> (AuditLogState, UserID) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let user = create_user(
            "meera",
            "meera@example.com",
            PasswordHash::new_unchecked("hunter2"),
            Role::Treasurer,
            &connection,
        )
        .unwrap();

        for (action, object_id) in [
            (AuditAction::ApproveTransaction, 1),
            (AuditAction::CreateFund, 2),
        ] {
            record_audit(
                &NewAuditEntry {
                    user_id: user.id,
                    action,
                    object_type: "Transaction",
                    object_id,
                    description: "test".to_owned(),
                    ip_address: "unknown".to_owned(),
                },
                OffsetDateTime::now_utc(),
                &connection,
            )
            .unwrap();
        }

        (
            AuditLogState {
                db_connection: Arc::new(Mutex::new(connection)),
            },
            user.id,
        )
    }

    async fn count_rows(action: Option<&str>) -> usize {
        let (state, user_id) = get_state();

        let response = get_audit_log_page(
            State(state),
            Extension(user_id),
            Query(AuditLogQuery {
                action: action.map(str::to_owned),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let document = parse_html_document(response).await;
        assert_valid_html(&document);

        document
            .select(&Selector::parse("tr[data-audit-entry]").unwrap())
            .count()
    }

    #[tokio::test]
    async fn lists_all_entries() {
        assert_eq!(count_rows(None).await, 2);
    }

    #[tokio::test]
    async fn filters_by_action() {
        assert_eq!(count_rows(Some("create_fund")).await, 1);
    }

    #[tokio::test]
    async fn ignores_unknown_action() {
        assert_eq!(count_rows(Some("bogus")).await, 2);
    }
}

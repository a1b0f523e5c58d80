//! Categories listing page.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::UserID,
    category::{Category, get_all_categories},
    endpoints,
    html::{
        CATEGORY_BADGE_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, TABLE_STYLE, base, edit_delete_action_links,
    },
    navigation::{NavBar, get_viewer},
};

/// The state needed for the categories listing page.
#[derive(Debug, Clone)]
pub struct CategoriesPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoriesPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

struct CategoryRow {
    category: Category,
    transaction_count: u32,
}

/// Render the categories listing page with transaction counts.
pub async fn get_categories_page(
    State(state): State<CategoriesPageState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let viewer = get_viewer(user_id, &connection)?;

    let categories = get_all_categories(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;

    let transactions_per_category = count_transactions_per_category(&connection).inspect_err(
        |error| tracing::error!("Could not count transactions per category: {error}"),
    )?;

    let rows = categories
        .into_iter()
        .map(|category| CategoryRow {
            transaction_count: *transactions_per_category
                .get(category.name.as_ref())
                .unwrap_or(&0),
            category,
        })
        .collect::<Vec<_>>();

    let is_treasurer = viewer.is_treasurer;
    let nav_bar = NavBar::new(endpoints::CATEGORIES_VIEW, viewer).into_html();

    Ok(categories_view(nav_bar, &rows, is_treasurer).into_response())
}

fn count_transactions_per_category(connection: &Connection) -> Result<HashMap<String, u32>, Error> {
    let result: Result<HashMap<String, u32>, rusqlite::Error> = connection
        .prepare("SELECT category, COUNT(1) FROM \"transaction\" GROUP BY category")?
        .query_map((), |row| {
            let category = row.get(0)?;
            let count = row.get(1)?;

            Ok((category, count))
        })?
        .collect();

    result.map_err(Error::from)
}

fn categories_view(nav_bar: Markup, rows: &[CategoryRow], is_treasurer: bool) -> Markup {
    let table_row = |row: &CategoryRow| {
        let edit_url = endpoints::format_endpoint(endpoints::EDIT_CATEGORY_VIEW, row.category.id);
        let delete_url = endpoints::format_endpoint(endpoints::CATEGORY, row.category.id);
        let confirm_message = format!(
            "Are you sure you want to delete '{}'? Its budget will be deleted too.",
            row.category.name
        );

        html!(
            tr class=(TABLE_ROW_STYLE) data-category-row="true"
            {
                td class=(TABLE_CELL_STYLE)
                {
                    span class=(CATEGORY_BADGE_STYLE) { (row.category.name) }
                }

                td class=(TABLE_CELL_STYLE) { (row.transaction_count) }

                @if is_treasurer {
                    td class=(TABLE_CELL_STYLE)
                    {
                        div class="flex gap-4"
                        {
                            (edit_delete_action_links(
                                &edit_url,
                                &delete_url,
                                &confirm_message,
                                "closest tr",
                                "delete",
                            ))
                        }
                    }
                }
            }
        )
    };

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Categories" }

                    @if is_treasurer {
                        a href=(endpoints::NEW_CATEGORY_VIEW) class=(LINK_STYLE)
                        {
                            "Create Category"
                        }
                    }
                }

                table class=(TABLE_STYLE)
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Transactions" }
                            @if is_treasurer {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }
                    }

                    tbody
                    {
                        @for row in rows {
                            (table_row(row))
                        }

                        @if rows.is_empty() {
                            tr
                            {
                                td
                                    colspan="3"
                                    class="px-6 py-4 text-center text-gray-500 dark:text-gray-400"
                                {
                                    "No categories yet."
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Categories", &[], &content)
}

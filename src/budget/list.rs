//! The budgets page, showing how much of each budget has been used and where
//! it is heading.

use std::sync::{Arc, Mutex};

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
    budget::{
        db::get_all_budgets,
        domain::Budget,
        forecast::{BudgetForecast, UNLIMITED_RUNWAY_DAYS, get_budget_forecast},
        tracker::{BudgetUsage, get_budget_usage},
    },
    endpoints,
    html::{
        BADGE_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE,
        TABLE_ROW_STYLE, TABLE_STYLE, base, edit_delete_action_links, format_currency,
    },
    navigation::{NavBar, get_viewer},
    timezone::local_today,
};

/// The state needed for the budgets page.
#[derive(Debug, Clone)]
pub struct BudgetsPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for BudgetsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

struct BudgetRow {
    budget: Budget,
    usage: BudgetUsage,
    forecast: BudgetForecast,
}

/// Render every budget with its usage and forecast.
pub async fn get_budgets_page(
    State(state): State<BudgetsPageState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let viewer = get_viewer(user_id, &connection)?;
    let budgets = get_all_budgets(&connection)
        .inspect_err(|error| tracing::error!("could not get budgets: {error}"))?;

    let rows = budgets
        .into_iter()
        .map(|budget| {
            let usage = get_budget_usage(&budget, &connection)?;
            let forecast = get_budget_forecast(&budget, &usage, today, &connection)?;

            Ok(BudgetRow {
                budget,
                usage,
                forecast,
            })
        })
        .collect::<Result<Vec<_>, Error>>()
        .inspect_err(|error| tracing::error!("could not compute budget usage: {error}"))?;

    let is_treasurer = viewer.is_treasurer;
    let nav_bar = NavBar::new(endpoints::BUDGETS_VIEW, viewer).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full space-y-4 lg:max-w-6xl"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Budgets" }

                    @if is_treasurer {
                        a href=(endpoints::NEW_BUDGET_VIEW) class=(LINK_STYLE) { "Create Budget" }
                    }
                }

                (budgets_table(&rows, is_treasurer))
            }
        }
    };

    Ok(base("Budgets", &[], &content).into_response())
}

fn runway_text(runway_days: i64) -> String {
    if runway_days >= UNLIMITED_RUNWAY_DAYS {
        "No recent spending".to_owned()
    } else {
        format!("{runway_days} days")
    }
}

fn utilization_bar(usage: &BudgetUsage, forecast: &BudgetForecast) -> Markup {
    let width = format!("width: {:.0}%", usage.utilization_percent);

    html! {
        div class="w-32 h-2 bg-gray-200 rounded dark:bg-gray-700"
        {
            div class={ "h-2 rounded " (forecast.risk.color_class()) } style=(width) {}
        }
        span class="text-xs" { (format!("{:.1}%", usage.utilization_percent)) }
    }
}

fn budgets_table(rows: &[BudgetRow], is_treasurer: bool) -> Markup {
    html! {
        div class="overflow-x-auto"
        {
            table class=(TABLE_STYLE)
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Period" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Budget" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Spent" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Remaining" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Used" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Status" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Daily Burn" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Projected" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Suggested" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Runway" }
                        @if is_treasurer {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                        }
                    }
                }

                tbody
                {
                    @for row in rows {
                        tr class=(TABLE_ROW_STYLE) data-budget-row="true"
                        {
                            td class=(TABLE_CELL_STYLE) { (row.budget.category_name) }
                            td class=(TABLE_CELL_STYLE)
                            {
                                (row.budget.start_date) " to " (row.budget.end_date)
                            }
                            td class=(TABLE_CELL_STYLE) { (format_currency(row.usage.amount)) }
                            td class=(TABLE_CELL_STYLE) { (format_currency(row.usage.spent)) }
                            td class=(TABLE_CELL_STYLE) { (format_currency(row.usage.remaining)) }
                            td class=(TABLE_CELL_STYLE) { (utilization_bar(&row.usage, &row.forecast)) }
                            td class=(TABLE_CELL_STYLE)
                            {
                                span
                                    class={ (BADGE_STYLE) " " (row.forecast.risk.color_class()) }
                                    data-risk=(row.forecast.risk)
                                {
                                    (row.forecast.risk.label())
                                }
                            }
                            td class=(TABLE_CELL_STYLE) { (format_currency(row.forecast.daily_burn)) }
                            td class=(TABLE_CELL_STYLE) { (format_currency(row.forecast.projected_total)) }
                            td class=(TABLE_CELL_STYLE) { (format_currency(row.forecast.suggested_budget)) }
                            td class=(TABLE_CELL_STYLE) { (runway_text(row.forecast.runway_days)) }

                            @if is_treasurer {
                                td class=(TABLE_CELL_STYLE)
                                {
                                    div class="flex gap-4"
                                    {
                                        (edit_delete_action_links(
                                            &endpoints::format_endpoint(endpoints::EDIT_BUDGET_VIEW, row.budget.id),
                                            &endpoints::format_endpoint(endpoints::BUDGET, row.budget.id),
                                            &format!(
                                                "Are you sure you want to delete the {} budget?",
                                                row.budget.category_name
                                            ),
                                            "closest tr",
                                            "delete",
                                        ))
                                    }
                                }
                            }
                        }
                    }

                    @if rows.is_empty() {
                        tr
                        {
                            td colspan="12" class="px-6 py-4 text-center" { "No budgets set yet." }
                        }
                    }
                }
            }
        }
    }
}

//! Dashboard HTTP handler and view rendering.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::{Date, Duration};

use crate::{
    AppState, Error,
    auth::UserID,
    budget::get_organisation_runway,
    dashboard::{
        aggregation::monthly_spending,
        cards::summary_cards_view,
        charts::{
            DashboardChart, category_spending_chart, charts_script, charts_view,
            income_split_chart, monthly_spending_chart,
        },
        tables::{funds_table, pending_transactions_table, recent_transactions_table, sponsors_table},
    },
    endpoints,
    html::{HeadElement, base, date_filter_form},
    income::{SponsorOrder, get_funds, get_sponsors},
    ledger::{DateRange, DateRangeQuery, get_ledger_summary, spending_by_category},
    navigation::{NavBar, get_viewer},
    timezone::local_today,
    transaction::{
        get_approved_transactions, get_pending_transactions, get_recent_approved_transactions,
    },
};

/// How far back the spending trend goes when no start date is given.
const TREND_PERIOD_DAYS: i64 = 180;
/// The number of approved transactions listed under "Recent Transactions".
const RECENT_TRANSACTION_LIMIT: u32 = 10;

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading the ledger.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The date range of the monthly spending chart and its subtitle.
///
/// Open bounds fall back to the last 180 days up to `today`.
fn trend_range(range: DateRange, today: Date) -> (Date, Date, String) {
    let end = range.end.unwrap_or(today);

    match range.start {
        Some(start) => (start, end, format!("{start} to {end}")),
        None => (
            end - Duration::days(TREND_PERIOD_DAYS),
            end,
            format!("Last {TREND_PERIOD_DAYS} days"),
        ),
    }
}

/// Display the organisation's finances, optionally filtered by date.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone)?;
    let range = query.to_range();

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let viewer = get_viewer(user_id, &connection)?;

    let summary = get_ledger_summary(range, &connection)
        .inspect_err(|error| tracing::error!("could not get ledger summary: {error}"))?;
    let runway = get_organisation_runway(&summary, today, &connection)
        .inspect_err(|error| tracing::error!("could not calculate runway: {error}"))?;
    let category_spending = spending_by_category(range, &connection)
        .inspect_err(|error| tracing::error!("could not get spending by category: {error}"))?;

    let (trend_start, trend_end, trend_subtext) = trend_range(range, today);
    let trend_transactions = get_approved_transactions(
        DateRange::new(Some(trend_start), Some(trend_end)),
        &connection,
    )
    .inspect_err(|error| tracing::error!("could not get transactions for trend: {error}"))?;
    let trend = monthly_spending(&trend_transactions, trend_start, trend_end);

    let recent = get_recent_approved_transactions(range, RECENT_TRANSACTION_LIMIT, &connection)
        .inspect_err(|error| tracing::error!("could not get recent transactions: {error}"))?;
    let pending = get_pending_transactions(&connection)
        .inspect_err(|error| tracing::error!("could not get pending transactions: {error}"))?;
    let sponsors = get_sponsors(range, SponsorOrder::LargestFirst, &connection)
        .inspect_err(|error| tracing::error!("could not get sponsors: {error}"))?;
    let funds = get_funds(range, &connection)
        .inspect_err(|error| tracing::error!("could not get management funds: {error}"))?;

    let charts = [
        DashboardChart {
            id: "category-spending-chart",
            options: category_spending_chart(&category_spending).to_string(),
        },
        DashboardChart {
            id: "income-split-chart",
            options: income_split_chart(&summary).to_string(),
        },
        DashboardChart {
            id: "monthly-spending-chart",
            options: monthly_spending_chart(&trend, &trend_subtext).to_string(),
        },
    ];

    let is_treasurer = viewer.is_treasurer;
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW, viewer).into_html();

    let content = html! {
        (nav_bar)

        div
            id="dashboard-content"
            class="flex flex-col items-center px-2 lg:px-6 lg:py-8 mx-auto
                max-w-screen-xl text-gray-900 dark:text-white"
        {
            div class="w-full flex flex-wrap justify-between items-end"
            {
                h1 class="text-2xl font-bold mb-4" { "Dashboard" }
                (date_filter_form(endpoints::DASHBOARD_VIEW, range.start, range.end))
            }

            (summary_cards_view(&summary, &runway))
            (charts_view(&charts))

            div class="w-full grid grid-cols-1 xl:grid-cols-2 gap-8 mb-8"
            {
                (recent_transactions_table(&recent))
                (pending_transactions_table(&pending, is_treasurer))
                (sponsors_table(&sponsors))
                (funds_table(&funds))
            }
        }
    };

    Ok(dashboard_view(&content, &charts).into_response())
}

fn dashboard_view(content: &Markup, charts: &[DashboardChart]) -> Markup {
    let scripts = [
        HeadElement::ScriptLink("/static/echarts.6.0.0.min.js".to_owned()),
        charts_script(charts),
    ];

    base("Dashboard", &scripts, content)
}

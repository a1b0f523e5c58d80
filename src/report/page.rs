//! The printable finance report.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::UserID,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, CATEGORY_BADGE_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, TABLE_STYLE, base,
        date_filter_form, format_currency,
    },
    income::{Sponsor, SponsorOrder, SponsorTier, get_sponsors, tier_badge},
    ledger::{DateRange, DateRangeQuery, LedgerSummary, get_ledger_summary},
    navigation::{NavBar, get_viewer},
    transaction::{Transaction, get_approved_transactions, total_amount},
};

/// The state needed for the report page.
#[derive(Debug, Clone)]
pub struct ReportState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ReportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the finance report for the requested date range.
pub async fn get_report_page(
    State(state): State<ReportState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Response, Error> {
    let range = query.to_range();

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let viewer = get_viewer(user_id, &connection)?;
    let summary = get_ledger_summary(range, &connection)
        .inspect_err(|error| tracing::error!("could not get ledger summary: {error}"))?;
    let sponsors = get_sponsors(range, SponsorOrder::LargestFirst, &connection)
        .inspect_err(|error| tracing::error!("could not get sponsors: {error}"))?;
    let transactions = get_approved_transactions(range, &connection)
        .inspect_err(|error| tracing::error!("could not get approved transactions: {error}"))?;

    let is_treasurer = viewer.is_treasurer;
    let nav_bar = NavBar::new(endpoints::REPORT_VIEW, viewer).into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full flex flex-wrap justify-between items-end print:hidden"
            {
                h1 class="text-2xl font-bold mb-4" { "Finance Report" }
                (date_filter_form(endpoints::REPORT_VIEW, range.start, range.end))
            }

            (report_actions(range, is_treasurer))
            p class="w-full mb-4 text-sm text-gray-600 dark:text-gray-400" data-period
            {
                (period_label(range))
            }
            (summary_view(&summary))
            (sponsor_tiers_view(&sponsors))
            (transactions_view(&transactions))
        }
    };

    Ok(base("Finance Report", &[], &content).into_response())
}

/// Describes the reporting period, e.g. "2025-01-01 to 2025-03-31".
fn period_label(range: DateRange) -> String {
    match (range.start, range.end) {
        (Some(start), Some(end)) => format!("{start} to {end}"),
        (Some(start), None) => format!("From {start}"),
        (None, Some(end)) => format!("Up to {end}"),
        (None, None) => "All time".to_owned(),
    }
}

fn report_actions(range: DateRange, is_treasurer: bool) -> Markup {
    let with_query = |endpoint: &str| match range.query_string() {
        query if query.is_empty() => endpoint.to_owned(),
        query => format!("{endpoint}?{query}"),
    };

    html! {
        div class="w-full flex gap-4 items-center mb-4 print:hidden"
        {
            button type="button" onclick="window.print()" class={ (BUTTON_PRIMARY_STYLE) " max-w-32" }
            {
                "Print"
            }

            @if is_treasurer {
                a href=(with_query(endpoints::EXPORT_TRANSACTIONS_CSV)) class=(LINK_STYLE) data-export
                {
                    "Download transactions.csv"
                }
                a href=(with_query(endpoints::EXPORT_TRANSACTIONS_XLSX)) class=(LINK_STYLE) data-export
                {
                    "Download transactions.xlsx"
                }
                a href=(with_query(endpoints::EXPORT_REPORT_CSV)) class=(LINK_STYLE) data-export
                {
                    "Download report.csv"
                }
                a href=(with_query(endpoints::EXPORT_REPORT_PDF)) class=(LINK_STYLE) data-export
                {
                    "Download report.pdf"
                }
                a href=(with_query(endpoints::EXPORT_BUNDLE_ZIP)) class=(LINK_STYLE) data-export
                {
                    "Download all (.zip)"
                }
            }
        }
    }
}

fn summary_view(summary: &LedgerSummary) -> Markup {
    let rows = [
        ("management-funds", "Management Funds", summary.management_funds),
        ("sponsors", "Sponsors", summary.sponsors),
        ("total-income", "Total Income", summary.total_income),
        ("total-spent", "Total Spent", summary.total_spent),
        ("net", "Net", summary.remaining),
    ];

    html! {
        section id="report-summary" class="w-full mb-8"
        {
            h2 class="text-xl font-semibold mb-2" { "Summary" }

            table class=(TABLE_STYLE)
            {
                tbody
                {
                    @for (id, label, amount) in rows {
                        tr id=(id) class=(TABLE_ROW_STYLE)
                        {
                            th scope="row" class=(TABLE_CELL_STYLE) { (label) }
                            td class={ (TABLE_CELL_STYLE) " text-right" } data-value
                            {
                                (format_currency(amount))
                            }
                        }
                    }
                }
            }
        }
    }
}

fn sponsor_tiers_view(sponsors: &[Sponsor]) -> Markup {
    let tier_totals = [SponsorTier::Gold, SponsorTier::Silver, SponsorTier::Bronze].map(|tier| {
        let (count, total) = sponsors
            .iter()
            .filter(|sponsor| sponsor.tier() == tier)
            .fold((0, 0.0), |(count, total), sponsor| {
                (count + 1, total + sponsor.amount)
            });

        (tier, count, total)
    });

    html! {
        section id="report-sponsors" class="w-full mb-8"
        {
            h2 class="text-xl font-semibold mb-2" { "Sponsor Tiers" }

            table class=(TABLE_STYLE)
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Tier" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Sponsors" }
                        th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Amount" }
                    }
                }

                tbody
                {
                    @for (tier, count, total) in tier_totals {
                        tr class=(TABLE_ROW_STYLE) data-tier-row=(tier.label())
                        {
                            td class=(TABLE_CELL_STYLE) { (tier_badge(tier)) }
                            td class=(TABLE_CELL_STYLE) data-count { (count) }
                            td class={ (TABLE_CELL_STYLE) " text-right" } { (format_currency(total)) }
                        }
                    }
                }
            }
        }
    }
}

fn transactions_view(transactions: &[Transaction]) -> Markup {
    let total = total_amount(transactions);

    html! {
        section id="report-transactions" class="w-full mb-8"
        {
            h2 class="text-xl font-semibold mb-2" { "Approved Transactions" }

            table class=(TABLE_STYLE)
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Title" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Submitted By" }
                        th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Amount" }
                    }
                }

                tbody
                {
                    @for transaction in transactions {
                        tr class=(TABLE_ROW_STYLE) data-transaction-row
                        {
                            td class=(TABLE_CELL_STYLE) { (transaction.date) }
                            td class=(TABLE_CELL_STYLE) { (transaction.title) }
                            td class=(TABLE_CELL_STYLE)
                            {
                                span class=(CATEGORY_BADGE_STYLE) { (transaction.category) }
                            }
                            td class=(TABLE_CELL_STYLE)
                            {
                                (transaction.submitted_by.as_deref().unwrap_or("-"))
                            }
                            td class={ (TABLE_CELL_STYLE) " text-right" }
                            {
                                (format_currency(transaction.amount))
                            }
                        }
                    }

                    @if transactions.is_empty() {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td colspan="5" class={ (TABLE_CELL_STYLE) " text-center" }
                            {
                                "No approved transactions in this period."
                            }
                        }
                    }
                }

                tfoot
                {
                    tr class="font-semibold"
                    {
                        th scope="row" colspan="4" class=(TABLE_CELL_STYLE)
                        {
                            "Total (" (transactions.len()) " transactions)"
                        }
                        td class={ (TABLE_CELL_STYLE) " text-right" } data-total
                        {
                            (format_currency(total))
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod report_page_tests {
    use axum::{
        Extension,
        extract::{Query, State},
        http::StatusCode,
    };
    use scraper::{Html, Selector};
    use time::macros::date;

    use crate::{
        auth::{Role, UserID},
        html::format_currency,
        income::{NewFund, NewSponsor, create_fund, create_sponsor},
        ledger::{DateRange, DateRangeQuery},
        test_utils::{
            assert_valid_html, parse_html_document, select_text,
            test_db::{connection_with_treasurer, insert_user, into_state},
        },
        transaction::{Transaction, create_transaction},
    };

    use super::{ReportState, get_report_page, period_label};

    fn get_state() -> (ReportState, UserID, UserID) {
        let (connection, treasurer) = connection_with_treasurer();
        let member = insert_user("member", Role::Member, &connection);

        create_fund(
            NewFund {
                amount: 20000.0,
                date_received: date!(2025 - 01 - 05),
            },
            &connection,
        )
        .unwrap();
        for (name, amount) in [("Gold Co", 300000.0), ("Silver Co", 60000.0), ("Tiny Co", 500.0)] {
            create_sponsor(
                NewSponsor {
                    name: name.to_owned(),
                    amount,
                    date_received: date!(2025 - 01 - 10),
                    contact_email: None,
                },
                &connection,
            )
            .unwrap();
        }
        create_transaction(
            Transaction::build("Stage", -5000.0, "Venue", date!(2025 - 02 - 01)).approved(true),
            &connection,
        )
        .unwrap();
        create_transaction(
            Transaction::build("Flyers", -500.0, "Marketing", date!(2025 - 01 - 15))
                .approved(true),
            &connection,
        )
        .unwrap();
        create_transaction(
            Transaction::build("Snacks", -200.0, "Other", date!(2025 - 01 - 20)),
            &connection,
        )
        .unwrap();

        (
            ReportState {
                db_connection: into_state(connection),
            },
            treasurer,
            member,
        )
    }

    async fn get_page(state: ReportState, user_id: UserID, query: DateRangeQuery) -> Html {
        let response = get_report_page(State(state), Extension(user_id), Query(query))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        parse_html_document(response).await
    }

    #[tokio::test]
    async fn shows_summary_and_approved_transactions_in_date_order() {
        let (state, treasurer, _) = get_state();

        let html = get_page(state, treasurer, DateRangeQuery::default()).await;

        assert_valid_html(&html);
        assert_eq!(
            select_text(&html, "#total-income [data-value]"),
            vec![format_currency(380500.0)]
        );
        assert_eq!(
            select_text(&html, "#total-spent [data-value]"),
            vec![format_currency(5500.0)]
        );
        assert_eq!(
            select_text(&html, "#net [data-value]"),
            vec![format_currency(375000.0)]
        );
        assert_eq!(
            select_text(&html, "tr[data-transaction-row] td:nth-child(2)"),
            vec!["Flyers", "Stage"]
        );
        assert_eq!(
            select_text(&html, "[data-total]"),
            vec![format_currency(-5500.0)]
        );
    }

    #[tokio::test]
    async fn counts_sponsors_per_tier() {
        let (state, treasurer, _) = get_state();

        let html = get_page(state, treasurer, DateRangeQuery::default()).await;

        for tier in ["Gold", "Silver", "Bronze"] {
            assert_eq!(
                select_text(&html, &format!("tr[data-tier-row=\"{tier}\"] [data-count]")),
                vec!["1"],
                "wrong sponsor count for {tier}"
            );
        }
    }

    #[tokio::test]
    async fn export_links_are_for_treasurers_only() {
        let (state, treasurer, member) = get_state();
        let export_links = Selector::parse("a[data-export]").unwrap();

        let html = get_page(state.clone(), treasurer, DateRangeQuery::default()).await;
        assert_eq!(html.select(&export_links).count(), 5);

        let html = get_page(state, member, DateRangeQuery::default()).await;
        assert_eq!(html.select(&export_links).count(), 0);
    }

    #[tokio::test]
    async fn date_range_limits_transactions() {
        let (state, treasurer, _) = get_state();

        let html = get_page(
            state,
            treasurer,
            DateRangeQuery {
                start_date: Some("2025-02-01".to_owned()),
                end_date: Some("2025-02-28".to_owned()),
            },
        )
        .await;

        assert_eq!(
            select_text(&html, "tr[data-transaction-row] td:nth-child(2)"),
            vec!["Stage"]
        );
        assert_eq!(
            select_text(&html, "[data-period]"),
            vec!["2025-02-01 to 2025-02-28"]
        );
    }

    #[tokio::test]
    async fn empty_period_totals_zero() {
        let (state, treasurer, _) = get_state();

        let html = get_page(
            state,
            treasurer,
            DateRangeQuery {
                start_date: Some("2024-01-01".to_owned()),
                end_date: Some("2024-01-31".to_owned()),
            },
        )
        .await;

        let total = select_text(&html, "[data-total]");
        assert_eq!(total, vec![format_currency(0.0)]);
        assert!(!total[0].starts_with('-'), "{total:?}");
    }

    #[test]
    fn open_ended_periods_are_described() {
        assert_eq!(period_label(DateRange::ALL), "All time");
        assert_eq!(
            period_label(DateRange::new(Some(date!(2025 - 01 - 01)), None)),
            "From 2025-01-01"
        );
    }
}

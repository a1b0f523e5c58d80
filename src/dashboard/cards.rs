//! Cards for the headline figures at the top of the dashboard.

use maud::{Markup, html};

use crate::{
    budget::{OrganisationRunway, UNLIMITED_RUNWAY_DAYS},
    html::{format_currency, format_currency_rounded},
    ledger::LedgerSummary,
};

const CARD_STYLE: &str = "bg-white dark:bg-gray-800 border border-gray-200 \
    dark:border-gray-700 rounded-lg p-4 shadow-md flex flex-col justify-between";

fn card(id: &str, title: &str, value: &str, detail: Option<Markup>) -> Markup {
    html! {
        div id=(id) class=(CARD_STYLE)
        {
            h4 class="text-sm font-medium text-gray-600 dark:text-gray-400" { (title) }
            p class="mt-2 text-2xl font-bold" data-value { (value) }

            @if let Some(detail) = detail {
                div class="mt-2 text-sm text-gray-600 dark:text-gray-400" { (detail) }
            }
        }
    }
}

fn runway_text(runway: &OrganisationRunway) -> String {
    if runway.runway_days >= UNLIMITED_RUNWAY_DAYS {
        "No recent spending".to_owned()
    } else {
        format!("{} days", runway.runway_days)
    }
}

/// Renders total income, total spent, remaining funds and the runway.
pub(super) fn summary_cards_view(summary: &LedgerSummary, runway: &OrganisationRunway) -> Markup {
    let remaining_style = if summary.remaining < 0.0 {
        "text-red-600 dark:text-red-400"
    } else {
        "text-green-600 dark:text-green-400"
    };

    html! {
        section id="summary" class="w-full mb-8"
        {
            div class="grid grid-cols-1 sm:grid-cols-2 lg:grid-cols-4 gap-4"
            {
                (card(
                    "total-income",
                    "Total Income",
                    &format_currency(summary.total_income),
                    Some(html! {
                        p { "Management funds: " (format_currency(summary.management_funds)) }
                        p { "Sponsors: " (format_currency(summary.sponsors)) }
                    }),
                ))
                (card("total-spent", "Total Spent", &format_currency(summary.total_spent), None))
                (card(
                    "remaining",
                    "Remaining",
                    &format_currency(summary.remaining),
                    Some(html! { span class=(remaining_style) { "Income minus approved expenses" } }),
                ))
                (card(
                    "runway",
                    "Runway",
                    &runway_text(runway),
                    Some(html! { "Burning " (format_currency_rounded(runway.daily_burn)) " per day" }),
                ))
            }
        }
    }
}

//! Table views for the dashboard's transactions, sponsors and funds.

use maud::{Markup, html};

use crate::{
    endpoints,
    html::{
        CATEGORY_BADGE_STYLE, LINK_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        TABLE_STYLE, format_currency,
    },
    income::{ManagementFund, Sponsor, tier_badge},
    transaction::{Transaction, review_buttons},
};

fn section_header(title: &str, link: Option<(&str, &str)>) -> Markup {
    html! {
        div class="flex justify-between items-baseline mb-4"
        {
            h3 class="text-xl font-semibold" { (title) }

            @if let Some((url, text)) = link {
                a href=(url) class=(LINK_STYLE) { (text) }
            }
        }
    }
}

fn empty_row(column_count: usize, message: &str) -> Markup {
    html! {
        tr class=(TABLE_ROW_STYLE)
        {
            td colspan=(column_count) class={(TABLE_CELL_STYLE) " text-center"} { (message) }
        }
    }
}

/// The most recent approved transactions.
pub(super) fn recent_transactions_table(transactions: &[Transaction]) -> Markup {
    html! {
        section id="recent-transactions" class="w-full"
        {
            (section_header("Recent Transactions", Some((endpoints::TRANSACTIONS_VIEW, "View all"))))

            div class="overflow-x-auto rounded-lg shadow"
            {
                table class=(TABLE_STYLE)
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Title" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                            th scope="col" class={(TABLE_CELL_STYLE) " text-right"} { "Amount" }
                        }
                    }

                    tbody
                    {
                        @for transaction in transactions {
                            tr class=(TABLE_ROW_STYLE) data-recent-row
                            {
                                td class=(TABLE_CELL_STYLE) { (transaction.date) }
                                td class=(TABLE_CELL_STYLE) { (transaction.title) }
                                td class=(TABLE_CELL_STYLE)
                                {
                                    span class=(CATEGORY_BADGE_STYLE) { (transaction.category) }
                                }
                                td class={(TABLE_CELL_STYLE) " text-right"}
                                {
                                    (format_currency(transaction.amount))
                                }
                            }
                        }

                        @if transactions.is_empty() {
                            (empty_row(4, "No approved transactions yet."))
                        }
                    }
                }
            }
        }
    }
}

/// Transactions waiting for approval, with review buttons for treasurers.
pub(super) fn pending_transactions_table(transactions: &[Transaction], is_treasurer: bool) -> Markup {
    let column_count = if is_treasurer { 5 } else { 4 };

    html! {
        section id="pending-transactions" class="w-full"
        {
            (section_header("Pending Approval", None))

            div class="overflow-x-auto rounded-lg shadow"
            {
                table class=(TABLE_STYLE)
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Title" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Submitted By" }
                            th scope="col" class={(TABLE_CELL_STYLE) " text-right"} { "Amount" }

                            @if is_treasurer {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }
                    }

                    tbody
                    {
                        @for transaction in transactions {
                            tr class=(TABLE_ROW_STYLE) data-pending-row
                            {
                                td class=(TABLE_CELL_STYLE) { (transaction.date) }
                                td class=(TABLE_CELL_STYLE) { (transaction.title) }
                                td class=(TABLE_CELL_STYLE)
                                {
                                    (transaction.submitted_by.as_deref().unwrap_or("-"))
                                }
                                td class={(TABLE_CELL_STYLE) " text-right"}
                                {
                                    (format_currency(transaction.amount))
                                }

                                @if is_treasurer {
                                    td class={(TABLE_CELL_STYLE) " flex gap-4"}
                                    {
                                        (review_buttons(transaction))
                                    }
                                }
                            }
                        }

                        @if transactions.is_empty() {
                            (empty_row(column_count, "Nothing is waiting for approval."))
                        }
                    }
                }
            }
        }
    }
}

/// Sponsors with their tier, largest first.
pub(super) fn sponsors_table(sponsors: &[Sponsor]) -> Markup {
    html! {
        section id="sponsors" class="w-full"
        {
            (section_header("Sponsors", Some((endpoints::INCOME_VIEW, "Manage income"))))

            div class="overflow-x-auto rounded-lg shadow"
            {
                table class=(TABLE_STYLE)
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Tier" }
                            th scope="col" class={(TABLE_CELL_STYLE) " text-right"} { "Amount" }
                        }
                    }

                    tbody
                    {
                        @for sponsor in sponsors {
                            tr class=(TABLE_ROW_STYLE) data-sponsor-row
                            {
                                td class=(TABLE_CELL_STYLE) { (sponsor.name) }
                                td class=(TABLE_CELL_STYLE) { (tier_badge(sponsor.tier())) }
                                td class={(TABLE_CELL_STYLE) " text-right"}
                                {
                                    (format_currency(sponsor.amount))
                                }
                            }
                        }

                        @if sponsors.is_empty() {
                            (empty_row(3, "No sponsors yet."))
                        }
                    }
                }
            }
        }
    }
}

pub(super) fn funds_table(funds: &[ManagementFund]) -> Markup {
    html! {
        section id="funds" class="w-full"
        {
            (section_header("Management Funds", None))

            div class="overflow-x-auto rounded-lg shadow"
            {
                table class=(TABLE_STYLE)
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Date Received" }
                            th scope="col" class={(TABLE_CELL_STYLE) " text-right"} { "Amount" }
                        }
                    }

                    tbody
                    {
                        @for fund in funds {
                            tr class=(TABLE_ROW_STYLE) data-fund-row
                            {
                                td class=(TABLE_CELL_STYLE) { (fund.date_received) }
                                td class={(TABLE_CELL_STYLE) " text-right"}
                                {
                                    (format_currency(fund.amount))
                                }
                            }
                        }

                        @if funds.is_empty() {
                            (empty_row(2, "No management funds yet."))
                        }
                    }
                }
            }
        }
    }
}

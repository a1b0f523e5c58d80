//! The transactions table with status, category and date filters.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, PreEscaped, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::UserID,
    category::{Category, get_all_categories},
    endpoints,
    html::{
        APPROVED_BADGE_STYLE, BUTTON_DELETE_STYLE, CATEGORY_BADGE_STYLE, FORM_CHECKBOX_STYLE,
        FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, HeadElement, LINK_STYLE, PAGE_CONTAINER_STYLE,
        PENDING_BADGE_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, TABLE_STYLE,
        base, format_currency,
    },
    ledger::{DateRange, parse_date},
    navigation::{NavBar, get_viewer},
    transaction::core::{ApprovalStatus, Transaction, TransactionFilter, query_transactions},
};

/// The state needed for the transactions page.
#[derive(Debug, Clone)]
pub struct TransactionsPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query parameters of the filter form. Blank or malformed values are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionsQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl TransactionsQuery {
    fn to_filter(&self) -> TransactionFilter {
        TransactionFilter {
            status: ApprovalStatus::from_query(self.status.as_deref()),
            category: self
                .category
                .as_deref()
                .map(str::trim)
                .filter(|category| !category.is_empty() && *category != "all")
                .map(str::to_owned),
            range: DateRange::new(
                self.start_date.as_deref().and_then(parse_date),
                self.end_date.as_deref().and_then(parse_date),
            ),
        }
    }
}

const BULK_ACTION_SCRIPT: &str = r#"
function selectedTransactionIds() {
    return Array.from(document.querySelectorAll('input[name="transaction_id"]:checked'))
        .map((checkbox) => Number(checkbox.value));
}

function toggleAllTransactions(source) {
    document.querySelectorAll('input[name="transaction_id"]')
        .forEach((checkbox) => { checkbox.checked = source.checked; });
}

async function bulkAction(url, confirmMessage) {
    const ids = selectedTransactionIds();

    if (ids.length === 0) {
        alert('Select at least one transaction.');
        return;
    }

    if (!confirm(confirmMessage.replace('{count}', ids.length))) {
        return;
    }

    const response = await fetch(url, {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify({ ids }),
    });
    const result = await response.json();

    if (result.success) {
        window.location.reload();
    } else {
        alert(result.error);
    }
}
"#;

/// Render the transactions table, newest first.
pub async fn get_transactions_page(
    State(state): State<TransactionsPageState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Response, Error> {
    let filter = query.to_filter();

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let viewer = get_viewer(user_id, &connection)?;
    let categories = get_all_categories(&connection)
        .inspect_err(|error| tracing::error!("could not get categories: {error}"))?;
    let transactions = query_transactions(&filter, &connection)
        .inspect_err(|error| tracing::error!("could not query transactions: {error}"))?;

    let is_treasurer = viewer.is_treasurer;
    let nav_bar = NavBar::new(endpoints::TRANSACTIONS_VIEW, viewer).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full space-y-4 lg:max-w-6xl"
            {
                header class="flex justify-between flex-wrap items-end gap-4"
                {
                    h1 class="text-xl font-bold" { "Transactions" }

                    div class="flex gap-4"
                    {
                        a href=(endpoints::NEW_TRANSACTION_VIEW) class=(LINK_STYLE) { "New Transaction" }

                        @if is_treasurer {
                            a href=(endpoints::IMPORT_VIEW) class=(LINK_STYLE) { "Import CSV" }
                        }
                    }
                }

                (filter_form(&filter, &categories))

                @if is_treasurer {
                    div class="flex gap-4"
                    {
                        button
                            type="button"
                            class=(LINK_STYLE)
                            onclick={
                                "bulkAction('" (endpoints::BULK_APPROVE_TRANSACTIONS)
                                "', 'Approve {count} transaction(s)?')"
                            }
                        {
                            "Approve selected"
                        }

                        button
                            type="button"
                            class=(BUTTON_DELETE_STYLE)
                            onclick={
                                "bulkAction('" (endpoints::BULK_REJECT_TRANSACTIONS)
                                "', 'Reject and delete {count} transaction(s)?')"
                            }
                        {
                            "Reject selected"
                        }
                    }
                }

                (transactions_table(&transactions, is_treasurer))
            }
        }
    };

    let head_elements = if is_treasurer {
        vec![HeadElement::ScriptSource(PreEscaped(
            BULK_ACTION_SCRIPT.to_owned(),
        ))]
    } else {
        vec![]
    };

    Ok(base("Transactions", &head_elements, &content).into_response())
}

fn filter_form(filter: &TransactionFilter, categories: &[Category]) -> Markup {
    let statuses = [
        (ApprovalStatus::All, "All"),
        (ApprovalStatus::Pending, "Pending"),
        (ApprovalStatus::Approved, "Approved"),
    ];

    html! {
        form
            method="get"
            action=(endpoints::TRANSACTIONS_VIEW)
            class="flex flex-wrap items-end gap-4"
        {
            div
            {
                label for="status" class=(FORM_LABEL_STYLE) { "Status" }
                select id="status" name="status" class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for (status, label) in statuses {
                        option value=(status.as_str()) selected[filter.status == status] { (label) }
                    }
                }
            }

            div
            {
                label for="category" class=(FORM_LABEL_STYLE) { "Category" }
                select id="category" name="category" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="all" selected[filter.category.is_none()] { "All" }

                    @for category in categories {
                        option
                            value=(category.name)
                            selected[filter.category.as_deref() == Some(category.name.as_ref())]
                        {
                            (category.name)
                        }
                    }
                }
            }

            div
            {
                label for="start_date" class=(FORM_LABEL_STYLE) { "From" }
                input
                    id="start_date"
                    type="date"
                    name="start_date"
                    value=[filter.range.start.map(|date| date.to_string())]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="end_date" class=(FORM_LABEL_STYLE) { "To" }
                input
                    id="end_date"
                    type="date"
                    name="end_date"
                    value=[filter.range.end.map(|date| date.to_string())]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div class="flex gap-2"
            {
                button type="submit" class="px-4 py-2 bg-blue-500 dark:bg-blue-600 \
                    hover:bg-blue-600 text-white rounded"
                {
                    "Filter"
                }

                a href=(endpoints::TRANSACTIONS_VIEW) class=(LINK_STYLE) { "Clear" }
            }
        }
    }
}

/// The approve and reject buttons for a pending transaction.
pub fn review_buttons(transaction: &Transaction) -> Markup {
    let approve_url = endpoints::format_endpoint(endpoints::APPROVE_TRANSACTION, transaction.id);
    let reject_url = endpoints::format_endpoint(endpoints::REJECT_TRANSACTION, transaction.id);

    html! {
        button
            type="button"
            hx-post=(approve_url)
            hx-target-error="#alert-container"
            hx-swap="none"
            class=(LINK_STYLE)
        {
            "Approve"
        }

        button
            type="button"
            hx-post=(reject_url)
            hx-confirm={ "Reject and delete '" (transaction.title) "'?" }
            hx-target="closest tr"
            hx-target-error="#alert-container"
            hx-swap="delete"
            class=(BUTTON_DELETE_STYLE)
        {
            "Reject"
        }
    }
}

/// A badge showing whether the transaction has been approved.
fn status_badge(approved: bool) -> Markup {
    html! {
        @if approved {
            span class=(APPROVED_BADGE_STYLE) data-status="approved" { "Approved" }
        } @else {
            span class=(PENDING_BADGE_STYLE) data-status="pending" { "Pending" }
        }
    }
}

fn transactions_table(transactions: &[Transaction], is_treasurer: bool) -> Markup {
    let column_count = if is_treasurer { 8 } else { 6 };

    html! {
        div class="overflow-x-auto"
        {
            table class=(TABLE_STYLE)
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        @if is_treasurer {
                            th scope="col" class=(TABLE_CELL_STYLE)
                            {
                                input
                                    type="checkbox"
                                    aria-label="Select all"
                                    onclick="toggleAllTransactions(this)"
                                    class=(FORM_CHECKBOX_STYLE);
                            }
                        }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Title" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Submitted By" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Status" }
                        @if is_treasurer {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                        }
                    }
                }

                tbody
                {
                    @for transaction in transactions {
                        tr class=(TABLE_ROW_STYLE) data-transaction-row="true"
                        {
                            @if is_treasurer {
                                td class=(TABLE_CELL_STYLE)
                                {
                                    input
                                        type="checkbox"
                                        name="transaction_id"
                                        value=(transaction.id)
                                        class=(FORM_CHECKBOX_STYLE);
                                }
                            }
                            td class=(TABLE_CELL_STYLE) { (transaction.date) }
                            td class=(TABLE_CELL_STYLE) { (transaction.title) }
                            td class=(TABLE_CELL_STYLE)
                            {
                                span class=(CATEGORY_BADGE_STYLE) { (transaction.category) }
                            }
                            td class=(TABLE_CELL_STYLE) { (format_currency(transaction.amount)) }
                            td class=(TABLE_CELL_STYLE)
                            {
                                (transaction.submitted_by.as_deref().unwrap_or("N/A"))
                            }
                            td class=(TABLE_CELL_STYLE) { (status_badge(transaction.approved)) }

                            @if is_treasurer {
                                td class=(TABLE_CELL_STYLE)
                                {
                                    div class="flex gap-4"
                                    {
                                        @if !transaction.approved {
                                            (review_buttons(transaction))
                                        }

                                        a
                                            href=(endpoints::format_endpoint(endpoints::EDIT_TRANSACTION_VIEW, transaction.id))
                                            class=(LINK_STYLE)
                                        {
                                            "Edit"
                                        }

                                        button
                                            type="button"
                                            hx-delete=(endpoints::format_endpoint(endpoints::TRANSACTION_API, transaction.id))
                                            hx-confirm={ "Are you sure you want to delete '" (transaction.title) "'?" }
                                            hx-target="closest tr"
                                            hx-target-error="#alert-container"
                                            hx-swap="delete"
                                            class=(BUTTON_DELETE_STYLE)
                                        {
                                            "Delete"
                                        }
                                    }
                                }
                            }
                        }
                    }

                    @if transactions.is_empty() {
                        tr
                        {
                            td colspan=(column_count) class="px-6 py-4 text-center"
                            {
                                "No transactions match the filters."
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod transactions_page_tests {
    use axum::{
        Extension,
        extract::{Query, State},
    };
    use scraper::{Html, Selector};
    use time::macros::date;

    use crate::{
        auth::{Role, UserID},
        test_utils::{
            assert_valid_html, parse_html_document,
            test_db::{connection_with_treasurer, insert_user, into_state},
        },
        transaction::core::{Transaction, create_transaction},
    };

    use super::{TransactionsPageState, TransactionsQuery, get_transactions_page};

    fn get_state() -> (TransactionsPageState, UserID, UserID) {
        let (connection, treasurer) = connection_with_treasurer();
        let member = insert_user("member", Role::Member, &connection);
        for (title, category, date, approved) in [
            ("Posters", "Marketing", date!(2025 - 01 - 05), true),
            ("Mic hire", "Logistics", date!(2025 - 01 - 10), false),
            ("Hall hire", "Venue", date!(2025 - 02 - 01), true),
        ] {
            create_transaction(
                Transaction::build(title, -100.0, category, date)
                    .approved(approved)
                    .created_by(Some(member)),
                &connection,
            )
            .unwrap();
        }

        (
            TransactionsPageState {
                db_connection: into_state(connection),
            },
            treasurer,
            member,
        )
    }

    fn row_count(html: &Html) -> usize {
        let selector = Selector::parse("tr[data-transaction-row]").unwrap();
        html.select(&selector).count()
    }

    #[tokio::test]
    async fn lists_all_transactions() {
        let (state, treasurer, _) = get_state();

        let response = get_transactions_page(
            State(state),
            Extension(treasurer),
            Query(TransactionsQuery::default()),
        )
        .await
        .unwrap();

        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert_eq!(row_count(&html), 3);
        let approve = Selector::parse("button[hx-post*='/approve']").unwrap();
        assert_eq!(html.select(&approve).count(), 1);
    }

    #[tokio::test]
    async fn filters_by_status_category_and_dates() {
        let (state, treasurer, _) = get_state();

        let pending = get_transactions_page(
            State(state.clone()),
            Extension(treasurer),
            Query(TransactionsQuery {
                status: Some("pending".to_owned()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(row_count(&parse_html_document(pending).await), 1);

        let venue = get_transactions_page(
            State(state.clone()),
            Extension(treasurer),
            Query(TransactionsQuery {
                category: Some("Venue".to_owned()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(row_count(&parse_html_document(venue).await), 1);

        let january = get_transactions_page(
            State(state),
            Extension(treasurer),
            Query(TransactionsQuery {
                start_date: Some("2025-01-01".to_owned()),
                end_date: Some("2025-01-31".to_owned()),
                status: Some("all".to_owned()),
                category: Some("all".to_owned()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(row_count(&parse_html_document(january).await), 2);
    }

    #[tokio::test]
    async fn members_do_not_see_review_controls() {
        let (state, _, member) = get_state();

        let response = get_transactions_page(
            State(state),
            Extension(member),
            Query(TransactionsQuery::default()),
        )
        .await
        .unwrap();

        let html = parse_html_document(response).await;
        assert_eq!(row_count(&html), 3);
        let controls = Selector::parse("button[hx-post], button[hx-delete], input[name=transaction_id]")
            .unwrap();
        assert_eq!(html.select(&controls).count(), 0);
    }
}

//! The income page listing management funds and sponsors.

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
    endpoints,
    html::{
        BADGE_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE,
        TABLE_ROW_STYLE, TABLE_STYLE, base, edit_delete_action_links, format_currency,
    },
    income::{
        db::{SponsorOrder, get_funds, get_sponsors},
        domain::{ManagementFund, Sponsor},
        tier::SponsorTier,
    },
    ledger::DateRange,
    navigation::{NavBar, get_viewer},
};

/// The state needed for the income page.
#[derive(Debug, Clone)]
pub struct IncomePageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for IncomePageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the list of funds and sponsors, newest first.
pub async fn get_income_page(
    State(state): State<IncomePageState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let viewer = get_viewer(user_id, &connection)?;
    let funds = get_funds(DateRange::ALL, &connection)
        .inspect_err(|error| tracing::error!("could not get management funds: {error}"))?;
    let sponsors = get_sponsors(DateRange::ALL, SponsorOrder::NewestFirst, &connection)
        .inspect_err(|error| tracing::error!("could not get sponsors: {error}"))?;

    let is_treasurer = viewer.is_treasurer;
    let nav_bar = NavBar::new(endpoints::INCOME_VIEW, viewer).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full space-y-4 lg:max-w-5xl"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Management Funds" }

                    @if is_treasurer {
                        a href=(endpoints::NEW_FUND_VIEW) class=(LINK_STYLE) { "Add Fund" }
                    }
                }

                (funds_table(&funds, is_treasurer))
            }

            section class="w-full mt-8 space-y-4 lg:max-w-5xl"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h2 class="text-xl font-bold" { "Sponsors" }

                    @if is_treasurer {
                        a href=(endpoints::NEW_SPONSOR_VIEW) class=(LINK_STYLE) { "Add Sponsor" }
                    }
                }

                (sponsors_table(&sponsors, is_treasurer))
            }
        }
    };

    Ok(base("Income", &[], &content).into_response())
}

fn funds_table(funds: &[ManagementFund], is_treasurer: bool) -> Markup {
    html! {
        table class=(TABLE_STYLE)
        {
            thead class=(TABLE_HEADER_STYLE)
            {
                tr
                {
                    th scope="col" class=(TABLE_CELL_STYLE) { "Date Received" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                    @if is_treasurer {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                    }
                }
            }

            tbody
            {
                @for fund in funds {
                    tr class=(TABLE_ROW_STYLE) data-fund-row="true"
                    {
                        td class=(TABLE_CELL_STYLE) { (fund.date_received) }
                        td class=(TABLE_CELL_STYLE) { (format_currency(fund.amount)) }

                        @if is_treasurer {
                            td class=(TABLE_CELL_STYLE)
                            {
                                div class="flex gap-4"
                                {
                                    (edit_delete_action_links(
                                        &endpoints::format_endpoint(endpoints::EDIT_FUND_VIEW, fund.id),
                                        &endpoints::format_endpoint(endpoints::FUND, fund.id),
                                        &format!(
                                            "Are you sure you want to delete the management fund of {}?",
                                            format_currency(fund.amount)
                                        ),
                                        "closest tr",
                                        "delete",
                                    ))
                                }
                            }
                        }
                    }
                }

                @if funds.is_empty() {
                    tr
                    {
                        td colspan="3" class="px-6 py-4 text-center" { "No management funds recorded yet." }
                    }
                }
            }
        }
    }
}

/// A badge with the sponsor's tier.
pub fn tier_badge(tier: SponsorTier) -> Markup {
    html! {
        span class={ (BADGE_STYLE) " " (tier.badge_class()) } data-tier=(tier.label()) { (tier.label()) }
    }
}

fn sponsors_table(sponsors: &[Sponsor], is_treasurer: bool) -> Markup {
    html! {
        table class=(TABLE_STYLE)
        {
            thead class=(TABLE_HEADER_STYLE)
            {
                tr
                {
                    th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Tier" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Date Received" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Contact" }
                    @if is_treasurer {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                    }
                }
            }

            tbody
            {
                @for sponsor in sponsors {
                    tr class=(TABLE_ROW_STYLE) data-sponsor-row="true"
                    {
                        td class=(TABLE_CELL_STYLE) { (sponsor.name) }
                        td class=(TABLE_CELL_STYLE) { (tier_badge(sponsor.tier())) }
                        td class=(TABLE_CELL_STYLE) { (format_currency(sponsor.amount)) }
                        td class=(TABLE_CELL_STYLE) { (sponsor.date_received) }
                        td class=(TABLE_CELL_STYLE)
                        {
                            @if let Some(email) = &sponsor.contact_email {
                                a href={ "mailto:" (email) } class=(LINK_STYLE) { (email) }
                            }
                        }

                        @if is_treasurer {
                            td class=(TABLE_CELL_STYLE)
                            {
                                div class="flex gap-4"
                                {
                                    (edit_delete_action_links(
                                        &endpoints::format_endpoint(endpoints::EDIT_SPONSOR_VIEW, sponsor.id),
                                        &endpoints::format_endpoint(endpoints::SPONSOR, sponsor.id),
                                        &format!("Are you sure you want to delete the sponsor '{}'?", sponsor.name),
                                        "closest tr",
                                        "delete",
                                    ))
                                }
                            }
                        }
                    }
                }

                @if sponsors.is_empty() {
                    tr
                    {
                        td colspan="6" class="px-6 py-4 text-center" { "No sponsors recorded yet." }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod income_page_tests {
    use axum::{Extension, extract::State, http::StatusCode};
    use scraper::Selector;
    use time::macros::date;

    use crate::{
        auth::Role,
        income::{
            db::{create_fund, create_sponsor},
            domain::{NewFund, NewSponsor},
        },
        test_utils::{
            assert_valid_html, parse_html_document,
            test_db::{connection_with_treasurer, insert_user, into_state},
        },
    };

    use super::{IncomePageState, get_income_page};

    #[tokio::test]
    async fn lists_funds_and_sponsors_with_tiers() {
        let (connection, treasurer) = connection_with_treasurer();
        create_fund(
            NewFund {
                amount: 1000.0,
                date_received: date!(2025 - 01 - 01),
            },
            &connection,
        )
        .unwrap();
        for (name, amount) in [("Big Co", 200_000.0), ("Mid Co", 60_000.0), ("Small Co", 10.0)] {
            create_sponsor(
                NewSponsor {
                    name: name.to_owned(),
                    amount,
                    date_received: date!(2025 - 01 - 02),
                    contact_email: None,
                },
                &connection,
            )
            .unwrap();
        }
        let state = IncomePageState {
            db_connection: into_state(connection),
        };

        let response = get_income_page(State(state), Extension(treasurer))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let fund_rows = Selector::parse("tr[data-fund-row]").unwrap();
        assert_eq!(html.select(&fund_rows).count(), 1);
        let tiers: Vec<String> = html
            .select(&Selector::parse("[data-tier]").unwrap())
            .map(|badge| badge.value().attr("data-tier").unwrap().to_owned())
            .collect();
        assert_eq!(tiers.len(), 3);
        for tier in ["Gold", "Silver", "Bronze"] {
            assert!(tiers.iter().any(|got| got == tier), "missing {tier} badge");
        }
        let delete_buttons = Selector::parse("button[hx-delete]").unwrap();
        assert_eq!(html.select(&delete_buttons).count(), 4);
    }

    #[tokio::test]
    async fn members_cannot_see_controls() {
        let (connection, _) = connection_with_treasurer();
        let member = insert_user("member", Role::Member, &connection);
        create_fund(
            NewFund {
                amount: 1000.0,
                date_received: date!(2025 - 01 - 01),
            },
            &connection,
        )
        .unwrap();
        let state = IncomePageState {
            db_connection: into_state(connection),
        };

        let response = get_income_page(State(state), Extension(member)).await.unwrap();

        let html = parse_html_document(response).await;
        let delete_buttons = Selector::parse("button[hx-delete]").unwrap();
        assert_eq!(html.select(&delete_buttons).count(), 0);
    }
}

//! Income from management funds and sponsors.

mod db;
mod domain;
mod fund;
mod page;
mod sponsor;
mod tier;

pub use db::{
    SponsorOrder, create_fund, create_management_fund_table, create_sponsor,
    create_sponsor_table, get_funds, get_sponsors,
};
pub use domain::{ManagementFund, NewFund, NewSponsor, Sponsor};
pub use fund::{
    create_fund_endpoint, delete_fund_endpoint, get_edit_fund_page, get_new_fund_page,
    update_fund_endpoint,
};
pub use page::{get_income_page, tier_badge};
pub use sponsor::{
    create_sponsor_endpoint, delete_sponsor_endpoint, get_edit_sponsor_page,
    get_new_sponsor_page, update_sponsor_endpoint,
};
pub use tier::SponsorTier;

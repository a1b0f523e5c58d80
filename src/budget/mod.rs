//! Spending limits per category, with usage tracking and forecasts.

mod create;
mod db;
mod delete;
mod domain;
mod edit;
mod forecast;
mod form;
mod list;
mod tracker;

pub use create::{create_budget_endpoint, get_new_budget_page};
pub use db::{create_budget_table, get_budget_for_category};
pub use delete::delete_budget_endpoint;
pub use domain::Budget;
pub use edit::{get_edit_budget_page, update_budget_endpoint};
pub use forecast::{OrganisationRunway, UNLIMITED_RUNWAY_DAYS, get_organisation_runway};
pub use list::get_budgets_page;
pub use tracker::get_budget_spent;

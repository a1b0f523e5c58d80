//! Expense categories and their management pages.

mod create;
mod db;
mod delete;
mod domain;
mod edit;
mod list;

pub use create::{create_category_endpoint, get_new_category_page};
pub use db::{
    create_category, create_category_table, get_all_categories, get_category,
    get_category_by_name, seed_default_categories, update_category,
};
pub use delete::delete_category_endpoint;
pub use domain::{Category, CategoryName, DEFAULT_CATEGORIES, SPONSOR_CATEGORY};
pub use edit::{get_edit_category_page, update_category_endpoint};
pub use list::get_categories_page;

//! Validation and the HTML form shared by the create and edit pages.

use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::Date;

use crate::{
    Error,
    category::{Category, SPONSOR_CATEGORY, get_category_by_name},
    html::{BUTTON_PRIMARY_STYLE, FORM_CHECKBOX_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE},
    transaction::core::{Transaction, TransactionBuilder},
};

/// The shortest title allowed after trimming whitespace.
pub const MIN_TITLE_LENGTH: usize = 3;
/// The longest title allowed.
pub const MAX_TITLE_LENGTH: usize = 100;

/// The form data for creating or editing a transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionForm {
    pub title: String,
    pub amount: f64,
    pub category: String,
    pub date: Date,
    /// Set by the "approve now" checkbox, only honoured for treasurers.
    #[serde(default)]
    pub approve_now: Option<String>,
}

impl TransactionForm {
    pub fn approve_now(&self) -> bool {
        self.approve_now.is_some()
    }
}

/// Check a transaction's fields and build the transaction if they are valid.
///
/// The title is trimmed. Expenses must be negative, only the sponsor
/// category takes positive amounts.
///
/// # Errors
/// Returns:
/// - [Error::InvalidTitle] if the title is shorter than 3 or longer than 100 characters,
/// - [Error::ZeroAmount] if the amount is zero,
/// - [Error::InvalidAmount] if the amount is not a finite number,
/// - [Error::FutureDate] if `date` is after `today`,
/// - [Error::InvalidCategory] if `category` is not the name of a category,
/// - [Error::PositiveExpense] if a positive amount is used for an expense category.
pub fn validate_transaction(
    title: &str,
    amount: f64,
    category: &str,
    date: Date,
    today: Date,
    connection: &Connection,
) -> Result<TransactionBuilder, Error> {
    let title = title.trim();
    let title_length = title.chars().count();

    if title_length == 0 {
        return Err(Error::InvalidTitle(
            "Transaction title cannot be empty.".to_owned(),
        ));
    }

    if title_length < MIN_TITLE_LENGTH {
        return Err(Error::InvalidTitle(format!(
            "Transaction title must be at least {MIN_TITLE_LENGTH} characters long."
        )));
    }

    if title_length > MAX_TITLE_LENGTH {
        return Err(Error::InvalidTitle(format!(
            "Transaction title must be at most {MAX_TITLE_LENGTH} characters long."
        )));
    }

    if !amount.is_finite() {
        return Err(Error::InvalidAmount("Amount must be a number".to_owned()));
    }

    if amount == 0.0 {
        return Err(Error::ZeroAmount);
    }

    if date > today {
        return Err(Error::FutureDate(date));
    }

    let category = match get_category_by_name(category.trim(), connection) {
        Ok(category) => category,
        Err(Error::NotFound) => return Err(Error::InvalidCategory(category.trim().to_owned())),
        Err(error) => return Err(error),
    };

    if amount > 0.0 && !category.name.is_sponsor() {
        return Err(Error::PositiveExpense(amount));
    }

    Ok(Transaction::build(
        title,
        amount,
        category.name.as_ref(),
        date,
    ))
}

/// The values shown in the transaction form.
pub struct TransactionFormDefaults<'a> {
    pub title: Option<&'a str>,
    pub amount: Option<f64>,
    pub category: Option<&'a str>,
    pub date: Date,
    pub approved: bool,
}

/// The transaction form. Exactly one of `hx_post` and `hx_put` should be set.
///
/// The "approve now" checkbox is only shown to treasurers.
pub fn transaction_form(
    hx_post: Option<&str>,
    hx_put: Option<&str>,
    defaults: &TransactionFormDefaults,
    categories: &[Category],
    max_date: Date,
    show_approve: bool,
    submit_text: &str,
) -> Markup {
    let amount = defaults.amount.map(|amount| format!("{amount:.2}"));

    html! {
        form
            hx-post=[hx_post]
            hx-put=[hx_put]
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="title" class=(FORM_LABEL_STYLE) { "Title" }

                input
                    id="title"
                    name="title"
                    type="text"
                    minlength=(MIN_TITLE_LENGTH)
                    maxlength=(MAX_TITLE_LENGTH)
                    placeholder="e.g. Venue deposit"
                    value=[defaults.title]
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

                div class="input-wrapper w-full"
                {
                    input
                        id="amount"
                        name="amount"
                        type="number"
                        step="0.01"
                        placeholder="-0.00"
                        value=[amount]
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                p class="mt-1 text-xs text-gray-500 dark:text-gray-400"
                {
                    "Enter expenses as negative numbers. Only the "
                    (SPONSOR_CATEGORY)
                    " category takes positive amounts."
                }
            }

            div
            {
                label for="category" class=(FORM_LABEL_STYLE) { "Category" }

                select id="category" name="category" required class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for category in categories {
                        option
                            value=(category.name)
                            selected[defaults.category == Some(category.name.as_ref())]
                        {
                            (category.name)
                        }
                    }
                }
            }

            div
            {
                label for="date" class=(FORM_LABEL_STYLE) { "Date" }

                input
                    id="date"
                    name="date"
                    type="date"
                    max=(max_date)
                    value=(defaults.date)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            @if show_approve {
                div class="flex items-center gap-2"
                {
                    input
                        id="approve_now"
                        name="approve_now"
                        type="checkbox"
                        checked[defaults.approved]
                        class=(FORM_CHECKBOX_STYLE);

                    label for="approve_now" class="text-sm" { "Approve now" }
                }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { (submit_text) }
        }
    }
}

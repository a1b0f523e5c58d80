use maud::{Markup, html};
use time::Date;

use crate::{
    category::Category,
    database_id::CategoryId,
    html::{BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE},
};

/// The values shown in the budget form.
pub struct BudgetFormDefaults {
    pub category_id: Option<CategoryId>,
    pub amount: Option<f64>,
    pub start_date: Date,
    pub end_date: Date,
}

/// The budget form. Exactly one of `hx_post` and `hx_put` should be set.
pub fn budget_form(
    hx_post: Option<&str>,
    hx_put: Option<&str>,
    defaults: &BudgetFormDefaults,
    categories: &[Category],
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
                label for="category_id" class=(FORM_LABEL_STYLE) { "Category" }

                select id="category_id" name="category_id" required class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for category in categories {
                        option
                            value=(category.id)
                            selected[defaults.category_id == Some(category.id)]
                        {
                            (category.name)
                        }
                    }
                }
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
                        min="0"
                        placeholder="0.00"
                        value=[amount]
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }
            }

            div class="grid grid-cols-2 gap-4"
            {
                div
                {
                    label for="start_date" class=(FORM_LABEL_STYLE) { "Start Date" }

                    input
                        id="start_date"
                        name="start_date"
                        type="date"
                        value=(defaults.start_date)
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="end_date" class=(FORM_LABEL_STYLE) { "End Date" }

                    input
                        id="end_date"
                        name="end_date"
                        type="date"
                        value=(defaults.end_date)
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { (submit_text) }
        }
    }
}

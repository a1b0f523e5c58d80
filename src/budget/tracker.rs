//! How much of a budget has been used.

use rusqlite::Connection;

use crate::{Error, budget::domain::Budget, ledger::sum_approved_expenses};

/// Spending against a budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetUsage {
    pub amount: f64,
    pub spent: f64,
    pub remaining: f64,
    /// The share of the budget that has been spent, from 0 to 100.
    pub utilization_percent: f64,
    pub is_exceeded: bool,
}

impl BudgetUsage {
    pub fn new(amount: f64, spent: f64) -> Self {
        let utilization_percent = if amount == 0.0 {
            0.0
        } else {
            (spent / amount * 100.0).min(100.0)
        };

        Self {
            amount,
            spent,
            remaining: amount - spent,
            utilization_percent,
            is_exceeded: spent > amount,
        }
    }
}

/// Approved expenses in the budget's category dated within its period.
pub fn get_budget_spent(budget: &Budget, connection: &Connection) -> Result<f64, Error> {
    sum_approved_expenses(
        budget.period(),
        Some(budget.category_name.as_ref()),
        connection,
    )
}

pub fn get_budget_usage(budget: &Budget, connection: &Connection) -> Result<BudgetUsage, Error> {
    let spent = get_budget_spent(budget, connection)?;

    Ok(BudgetUsage::new(budget.amount, spent))
}

#[cfg(test)]
mod budget_usage_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        budget::{db::create_budget, domain::NewBudget},
        category::get_category_by_name,
        db::initialize,
    };

    use super::{BudgetUsage, get_budget_usage};

    #[test]
    fn zero_budget_has_zero_utilization() {
        for spent in [0.0, 10.0, 1e9] {
            assert_eq!(BudgetUsage::new(0.0, spent).utilization_percent, 0.0);
        }
    }

    #[test]
    fn remaining_is_amount_minus_spent() {
        for (amount, spent) in [(100.0, 0.0), (100.0, 40.0), (100.0, 250.0), (0.0, 5.0)] {
            assert_eq!(BudgetUsage::new(amount, spent).remaining, amount - spent);
        }
    }

    #[test]
    fn utilization_is_capped_at_one_hundred() {
        let usage = BudgetUsage::new(100.0, 250.0);

        assert_eq!(usage.utilization_percent, 100.0);
        assert!(usage.is_exceeded);
    }

    #[test]
    fn spending_exactly_the_budget_is_not_exceeded() {
        let usage = BudgetUsage::new(100.0, 100.0);

        assert_eq!(usage.utilization_percent, 100.0);
        assert!(!usage.is_exceeded);
    }

    #[test]
    fn counts_only_approved_expenses_in_category_and_period() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let venue = get_category_by_name("Venue", &connection).unwrap();
        let budget = create_budget(
            NewBudget {
                category_id: venue.id,
                amount: 1000.0,
                start_date: date!(2025 - 01 - 01),
                end_date: date!(2025 - 01 - 31),
            },
            &connection,
        )
        .unwrap();
        connection
            .execute_batch(
                "INSERT INTO \"transaction\" (title, amount, category, date, approved) VALUES
                    ('counted', -300, 'Venue', '2025-01-01', 1),
                    ('counted', -100, 'Venue', '2025-01-31', 1),
                    ('pending', -50, 'Venue', '2025-01-15', 0),
                    ('other category', -70, 'Marketing', '2025-01-15', 1),
                    ('outside period', -90, 'Venue', '2025-02-01', 1);",
            )
            .unwrap();

        let usage = get_budget_usage(&budget, &connection).unwrap();

        assert_eq!(usage.spent, 400.0);
        assert_eq!(usage.remaining, 600.0);
        assert_eq!(usage.utilization_percent, 40.0);
    }
}

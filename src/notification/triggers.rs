//! Notifications fired when approving expenses crosses a spending limit.
//!
//! Take a [SpendingSnapshot] before approving and call
//! [SpendingSnapshot::notify_crossings] afterwards. Only crossings notify, so
//! a budget that is already over its amount does not notify again.

use rusqlite::Connection;

use crate::{
    Error,
    budget::{Budget, get_budget_for_category, get_budget_spent},
    html::format_currency,
    ledger::{DateRange, LedgerSummary, get_ledger_summary},
    notification::{NewNotification, NotificationKind, RelatedObject, notify_all_treasurers},
};

/// The share of total income below which the remaining funds count as low.
pub const FUND_LOW_FRACTION: f64 = 0.10;

fn is_fund_low(summary: &LedgerSummary) -> bool {
    summary.total_income > 0.0 && summary.remaining < summary.total_income * FUND_LOW_FRACTION
}

/// The ledger and budget figures before a set of approvals.
#[derive(Debug, Clone)]
pub struct SpendingSnapshot {
    ledger: LedgerSummary,
    budgets: Vec<(Budget, f64)>,
}

impl SpendingSnapshot {
    /// Record the ledger and the spending of the budgets for `categories`.
    ///
    /// Categories without a budget are skipped.
    pub fn capture<'a>(
        categories: impl IntoIterator<Item = &'a str>,
        connection: &Connection,
    ) -> Result<Self, Error> {
        let ledger = get_ledger_summary(DateRange::ALL, connection)?;
        let mut budgets: Vec<(Budget, f64)> = Vec::new();

        for category in categories {
            if budgets
                .iter()
                .any(|(budget, _)| budget.category_name.as_ref() == category)
            {
                continue;
            }

            if let Some(budget) = get_budget_for_category(category, connection)? {
                let spent = get_budget_spent(&budget, connection)?;
                budgets.push((budget, spent));
            }
        }

        Ok(Self { ledger, budgets })
    }

    /// Notify treasurers about any budget that went over its amount and about
    /// the remaining funds dropping below [FUND_LOW_FRACTION] of income.
    ///
    /// Failures are logged and otherwise ignored since the approval has
    /// already happened.
    pub fn notify_crossings(&self, connection: &Connection) {
        for (budget, spent_before) in &self.budgets {
            let spent_after = match get_budget_spent(budget, connection) {
                Ok(spent) => spent,
                Err(error) => {
                    tracing::error!(
                        "could not get spending for the {} budget: {error}",
                        budget.category_name
                    );
                    continue;
                }
            };

            if *spent_before <= budget.amount && spent_after > budget.amount {
                notify_all_treasurers(
                    NewNotification {
                        kind: NotificationKind::BudgetExceeded,
                        title: format!("{} budget exceeded", budget.category_name),
                        message: format!(
                            "{} of the {} budget of {} has been spent.",
                            format_currency(spent_after),
                            budget.category_name,
                            format_currency(budget.amount)
                        ),
                        related: Some(RelatedObject {
                            object_type: "Budget",
                            object_id: budget.id,
                        }),
                    },
                    connection,
                );
            }
        }

        let ledger_after = match get_ledger_summary(DateRange::ALL, connection) {
            Ok(summary) => summary,
            Err(error) => {
                tracing::error!("could not get the ledger summary: {error}");
                return;
            }
        };

        if !is_fund_low(&self.ledger) && is_fund_low(&ledger_after) {
            notify_all_treasurers(
                NewNotification {
                    kind: NotificationKind::FundLow,
                    title: "Funds running low".to_owned(),
                    message: format!(
                        "Only {} of {} income remains.",
                        format_currency(ledger_after.remaining),
                        format_currency(ledger_after.total_income)
                    ),
                    related: None,
                },
                connection,
            );
        }
    }
}

#[cfg(test)]
mod trigger_tests {
    use rusqlite::{Connection, params};
    use time::macros::date;

    use crate::{
        auth::{Role, UserID},
        notification::{NotificationKind, get_notifications},
        test_utils::test_db::{connection_with_treasurer, insert_user},
    };

    use super::SpendingSnapshot;

    fn insert_expense(amount: f64, category: &str, approved: bool, connection: &Connection) -> i64 {
        connection
            .execute(
                "INSERT INTO \"transaction\" (title, amount, category, date, approved)
                VALUES ('Expense', ?1, ?2, '2025-01-10', ?3)",
                params![amount, category, approved],
            )
            .unwrap();
        connection.last_insert_rowid()
    }

    fn approve(id: i64, connection: &Connection) {
        connection
            .execute(
                "UPDATE \"transaction\" SET approved = 1 WHERE id = ?1",
                [id],
            )
            .unwrap();
    }

    fn kinds(user_id: UserID, connection: &Connection) -> Vec<NotificationKind> {
        get_notifications(user_id, connection)
            .unwrap()
            .into_iter()
            .map(|notification| notification.kind)
            .collect()
    }

    #[test]
    fn budget_exceeded_fires_once_on_crossing() {
        let (connection, treasurer) = connection_with_treasurer();
        let member = insert_user("member", Role::Member, &connection);
        connection
            .execute(
                "INSERT INTO budget (category_id, amount, start_date, end_date)
                SELECT id, 100.0, ?1, ?2 FROM category WHERE name = 'Venue'",
                params![date!(2025 - 01 - 01), date!(2025 - 01 - 31)],
            )
            .unwrap();
        connection
            .execute(
                "INSERT INTO management_fund (amount, date_received) VALUES (100000, '2025-01-01')",
                [],
            )
            .unwrap();

        let first = insert_expense(-80.0, "Venue", false, &connection);
        let snapshot = SpendingSnapshot::capture(["Venue"], &connection).unwrap();
        approve(first, &connection);
        snapshot.notify_crossings(&connection);
        assert!(kinds(treasurer, &connection).is_empty());

        let second = insert_expense(-50.0, "Venue", false, &connection);
        let snapshot = SpendingSnapshot::capture(["Venue"], &connection).unwrap();
        approve(second, &connection);
        snapshot.notify_crossings(&connection);
        assert_eq!(kinds(treasurer, &connection), vec![NotificationKind::BudgetExceeded]);
        assert!(kinds(member, &connection).is_empty());

        let third = insert_expense(-10.0, "Venue", false, &connection);
        let snapshot = SpendingSnapshot::capture(["Venue"], &connection).unwrap();
        approve(third, &connection);
        snapshot.notify_crossings(&connection);
        assert_eq!(kinds(treasurer, &connection).len(), 1);
    }

    #[test]
    fn fund_low_fires_when_remaining_drops_below_ten_percent() {
        let (connection, treasurer) = connection_with_treasurer();
        connection
            .execute(
                "INSERT INTO management_fund (amount, date_received) VALUES (1000, '2025-01-01')",
                [],
            )
            .unwrap();

        let expense = insert_expense(-950.0, "Venue", false, &connection);
        let snapshot = SpendingSnapshot::capture(["Venue"], &connection).unwrap();
        approve(expense, &connection);
        snapshot.notify_crossings(&connection);

        assert_eq!(kinds(treasurer, &connection), vec![NotificationKind::FundLow]);
    }

    #[test]
    fn no_fund_low_without_income() {
        let (connection, treasurer) = connection_with_treasurer();

        let expense = insert_expense(-50.0, "Venue", false, &connection);
        let snapshot = SpendingSnapshot::capture(["Venue"], &connection).unwrap();
        approve(expense, &connection);
        snapshot.notify_crossings(&connection);

        assert!(kinds(treasurer, &connection).is_empty());
    }
}

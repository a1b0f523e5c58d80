//! Sums income and approved spending over an optional date range.
//!
//! Every aggregate treats an empty result as zero, so a fresh database
//! reports zero income, zero spending and nothing remaining.

use rusqlite::Connection;
use serde::Deserialize;
use time::{Date, macros::format_description};

use crate::Error;

/// An inclusive date range where either bound may be open.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<Date>,
    pub end: Option<Date>,
}

impl DateRange {
    /// A range with no bounds, matching every date.
    pub const ALL: Self = Self {
        start: None,
        end: None,
    };

    pub fn new(start: Option<Date>, end: Option<Date>) -> Self {
        Self { start, end }
    }

    /// The query string for links that keep the current filter, e.g. `start_date=2025-01-01`.
    pub fn query_string(&self) -> String {
        let mut params = Vec::new();

        if let Some(start) = self.start {
            params.push(format!("start_date={start}"));
        }

        if let Some(end) = self.end {
            params.push(format!("end_date={end}"));
        }

        params.join("&")
    }
}

/// The `start_date` and `end_date` query parameters of a date filter form.
///
/// The form submits empty strings for blank inputs, so the dates are parsed
/// leniently: anything that is not a `YYYY-MM-DD` date is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl DateRangeQuery {
    pub fn to_range(&self) -> DateRange {
        DateRange {
            start: self.start_date.as_deref().and_then(parse_date),
            end: self.end_date.as_deref().and_then(parse_date),
        }
    }
}

/// Parse a `YYYY-MM-DD` date, returning `None` if `text` is blank or malformed.
pub fn parse_date(text: &str) -> Option<Date> {
    let text = text.trim();

    if text.is_empty() {
        return None;
    }

    Date::parse(text, format_description!("[year]-[month]-[day]")).ok()
}

/// The headline figures of the organisation's finances.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct LedgerSummary {
    pub management_funds: f64,
    pub sponsors: f64,
    pub total_income: f64,
    pub total_spent: f64,
    pub remaining: f64,
}

impl LedgerSummary {
    pub fn new(management_funds: f64, sponsors: f64, total_spent: f64) -> Self {
        let total_income = management_funds + sponsors;

        Self {
            management_funds,
            sponsors,
            total_income,
            total_spent,
            remaining: total_income - total_spent,
        }
    }

    /// The figures with the labels used in exports, income first.
    pub fn figures(&self) -> [(&'static str, f64); 5] {
        [
            ("Management Funds", self.management_funds),
            ("Sponsors", self.sponsors),
            ("Total Income", self.total_income),
            ("Total Spent", self.total_spent),
            ("Remaining", self.remaining),
        ]
    }
}

/// Sum management funds and sponsors received in `range` and the approved
/// expenses dated in `range`.
///
/// # Errors
/// Returns [Error::SqlError] if any of the queries fail.
pub fn get_ledger_summary(range: DateRange, connection: &Connection) -> Result<LedgerSummary, Error> {
    let management_funds = sum_income("management_fund", range, connection)?;
    let sponsors = sum_income("sponsor", range, connection)?;
    let total_spent = sum_approved_expenses(range, None, connection)?;

    Ok(LedgerSummary::new(management_funds, sponsors, total_spent))
}

fn sum_income(table: &str, range: DateRange, connection: &Connection) -> Result<f64, Error> {
    let query = format!(
        "SELECT COALESCE(SUM(amount), 0.0) FROM {table}
        WHERE (?1 IS NULL OR date_received >= ?1) AND (?2 IS NULL OR date_received <= ?2)"
    );

    connection
        .query_row(&query, (range.start, range.end), |row| row.get(0))
        .map_err(Error::from)
}

/// The absolute value of approved expenses dated in `range`, optionally
/// limited to a single category.
pub fn sum_approved_expenses(
    range: DateRange,
    category: Option<&str>,
    connection: &Connection,
) -> Result<f64, Error> {
    let total: f64 = connection.query_row(
        "SELECT COALESCE(SUM(amount), 0.0) FROM \"transaction\"
        WHERE approved = 1 AND amount < 0
            AND (?1 IS NULL OR date >= ?1) AND (?2 IS NULL OR date <= ?2)
            AND (?3 IS NULL OR category = ?3)",
        (range.start, range.end, category),
        |row| row.get(0),
    )?;

    Ok(total.abs())
}

/// The date of the first approved expense, if there is one.
pub fn earliest_approved_expense_date(connection: &Connection) -> Result<Option<Date>, Error> {
    connection
        .query_row(
            "SELECT MIN(date) FROM \"transaction\" WHERE approved = 1 AND amount < 0",
            [],
            |row| row.get(0),
        )
        .map_err(Error::from)
}

/// Approved spending per category in `range`, largest first.
pub fn spending_by_category(
    range: DateRange,
    connection: &Connection,
) -> Result<Vec<(String, f64)>, Error> {
    connection
        .prepare(
            "SELECT category, ABS(SUM(amount)) AS spent FROM \"transaction\"
            WHERE approved = 1 AND amount < 0
                AND (?1 IS NULL OR date >= ?1) AND (?2 IS NULL OR date <= ?2)
            GROUP BY category
            ORDER BY spent DESC, category ASC",
        )?
        .query_map((range.start, range.end), |row| Ok((row.get(0)?, row.get(1)?)))?
        .map(|maybe_row| maybe_row.map_err(Error::from))
        .collect()
}

#[cfg(test)]
mod ledger_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::db::initialize;

    use super::{
        DateRange, DateRangeQuery, LedgerSummary, earliest_approved_expense_date,
        get_ledger_summary, parse_date, spending_by_category, sum_approved_expenses,
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    fn insert_transaction(
        amount: f64,
        category: &str,
        date: &str,
        approved: bool,
        connection: &Connection,
    ) {
        connection
            .execute(
                "INSERT INTO \"transaction\" (title, amount, category, date, approved)
                VALUES ('Test', ?1, ?2, ?3, ?4)",
                (amount, category, date, approved),
            )
            .unwrap();
    }

    #[test]
    fn empty_database_is_all_zero() {
        let connection = get_test_connection();

        let summary = get_ledger_summary(DateRange::ALL, &connection).unwrap();

        assert_eq!(summary, LedgerSummary::default());
    }

    #[test]
    fn remaining_is_income_minus_spent() {
        let summary = LedgerSummary::new(6000.0, 4000.0, 3000.0);

        assert_eq!(summary.total_income, 10000.0);
        assert_eq!(summary.remaining, 7000.0);
    }

    #[test]
    fn sums_income_and_approved_expenses_only() {
        let connection = get_test_connection();
        connection
            .execute_batch(
                "INSERT INTO management_fund (amount, date_received) VALUES (6000, '2025-01-01');
                INSERT INTO sponsor (name, amount, date_received) VALUES ('Acme', 4000, '2025-01-05');",
            )
            .unwrap();
        insert_transaction(-1000.0, "Venue", "2025-01-10", true, &connection);
        insert_transaction(-2000.0, "Marketing", "2025-01-11", true, &connection);
        insert_transaction(-500.0, "Marketing", "2025-01-12", false, &connection);
        insert_transaction(750.0, "Sponsor", "2025-01-12", true, &connection);

        let summary = get_ledger_summary(DateRange::ALL, &connection).unwrap();

        assert_eq!(summary.management_funds, 6000.0);
        assert_eq!(summary.sponsors, 4000.0);
        assert_eq!(summary.total_spent, 3000.0);
        assert_eq!(summary.remaining, 7000.0);
    }

    #[test]
    fn filters_by_inclusive_date_range() {
        let connection = get_test_connection();
        connection
            .execute_batch(
                "INSERT INTO management_fund (amount, date_received) VALUES (100, '2025-01-01');
                INSERT INTO management_fund (amount, date_received) VALUES (200, '2025-02-01');
                INSERT INTO management_fund (amount, date_received) VALUES (400, '2025-03-01');",
            )
            .unwrap();
        insert_transaction(-10.0, "Venue", "2025-02-01", true, &connection);
        insert_transaction(-20.0, "Venue", "2025-03-02", true, &connection);

        let range = DateRange::new(Some(date!(2025 - 02 - 01)), Some(date!(2025 - 03 - 01)));
        let summary = get_ledger_summary(range, &connection).unwrap();
        assert_eq!(summary.management_funds, 600.0);
        assert_eq!(summary.total_spent, 10.0);

        let open_start = DateRange::new(None, Some(date!(2025 - 01 - 31)));
        let summary = get_ledger_summary(open_start, &connection).unwrap();
        assert_eq!(summary.management_funds, 100.0);
        assert_eq!(summary.total_spent, 0.0);
    }

    #[test]
    fn sums_expenses_for_one_category() {
        let connection = get_test_connection();
        insert_transaction(-10.0, "Venue", "2025-02-01", true, &connection);
        insert_transaction(-20.0, "Marketing", "2025-02-02", true, &connection);

        let spent = sum_approved_expenses(DateRange::ALL, Some("Venue"), &connection).unwrap();

        assert_eq!(spent, 10.0);
    }

    #[test]
    fn groups_spending_by_category() {
        let connection = get_test_connection();
        insert_transaction(-10.0, "Venue", "2025-02-01", true, &connection);
        insert_transaction(-20.0, "Marketing", "2025-02-02", true, &connection);
        insert_transaction(-5.0, "Marketing", "2025-02-03", true, &connection);

        let spending = spending_by_category(DateRange::ALL, &connection).unwrap();

        assert_eq!(
            spending,
            vec![("Marketing".to_owned(), 25.0), ("Venue".to_owned(), 10.0)]
        );
    }

    #[test]
    fn finds_earliest_approved_expense() {
        let connection = get_test_connection();
        assert_eq!(earliest_approved_expense_date(&connection).unwrap(), None);

        insert_transaction(-10.0, "Venue", "2025-02-01", false, &connection);
        insert_transaction(-10.0, "Venue", "2025-03-01", true, &connection);

        assert_eq!(
            earliest_approved_expense_date(&connection).unwrap(),
            Some(date!(2025 - 03 - 01))
        );
    }

    #[test]
    fn blank_and_malformed_query_dates_are_ignored() {
        let query = DateRangeQuery {
            start_date: Some("".to_owned()),
            end_date: Some("not-a-date".to_owned()),
        };

        assert_eq!(query.to_range(), DateRange::ALL);
        assert_eq!(parse_date("2025-01-31"), Some(date!(2025 - 01 - 31)));
    }
}

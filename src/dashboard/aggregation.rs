//! Groups approved spending by month for the trend chart.

use std::collections::BTreeMap;

use time::{Date, Month};

use crate::transaction::Transaction;

/// Formats a month as a short label, e.g. "Jan 2025".
pub(super) fn month_label(month: Date) -> String {
    let name = match month.month() {
        Month::January => "Jan",
        Month::February => "Feb",
        Month::March => "Mar",
        Month::April => "Apr",
        Month::May => "May",
        Month::June => "Jun",
        Month::July => "Jul",
        Month::August => "Aug",
        Month::September => "Sep",
        Month::October => "Oct",
        Month::November => "Nov",
        Month::December => "Dec",
    };

    format!("{name} {}", month.year())
}

fn first_of_month(date: Date) -> Date {
    date - time::Duration::days(i64::from(date.day()) - 1)
}

fn next_month(month: Date) -> Option<Date> {
    let (year, next) = match month.month() {
        Month::December => (month.year() + 1, Month::January),
        other => (month.year(), other.next()),
    };

    Date::from_calendar_date(year, next, 1).ok()
}

/// Sums the expenses in `transactions` for every month from `start` to
/// `end`, oldest first.
///
/// Months without spending are included with a total of zero so the chart
/// has no gaps. Income and anything dated outside of the range is ignored.
pub(super) fn monthly_spending(
    transactions: &[Transaction],
    start: Date,
    end: Date,
) -> Vec<(String, f64)> {
    let mut totals: BTreeMap<Date, f64> = BTreeMap::new();
    let last_month = first_of_month(end);
    let mut month = Some(first_of_month(start));

    while let Some(current) = month.filter(|current| *current <= last_month) {
        totals.insert(current, 0.0);
        month = next_month(current);
    }

    for transaction in transactions {
        if transaction.amount >= 0.0 || transaction.date < start || transaction.date > end {
            continue;
        }

        if let Some(total) = totals.get_mut(&first_of_month(transaction.date)) {
            *total += transaction.amount.abs();
        }
    }

    totals
        .into_iter()
        .map(|(month, total)| (month_label(month), total))
        .collect()
}

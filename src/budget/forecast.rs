//! Projects recent spending forward to the end of a period.
//!
//! The burn rate is the average daily spend over the last 30 days (or fewer,
//! if the period started less than 30 days ago). It drives the projected
//! total, the suggested budget and the runway.

use std::fmt::Display;

use rusqlite::Connection;
use time::{Date, Duration};

use crate::{
    Error,
    budget::{domain::Budget, tracker::BudgetUsage},
    ledger::{DateRange, LedgerSummary, earliest_approved_expense_date, sum_approved_expenses},
};

/// The number of days of recent spending used for the burn rate.
pub const BURN_WINDOW_DAYS: i64 = 30;
/// The buffer added on top of projected spending for the suggested budget.
pub const SUGGESTED_BUFFER: f64 = 1.2;
/// The runway reported when nothing is being spent.
pub const UNLIMITED_RUNWAY_DAYS: i64 = 999;

/// How close a budget is to running out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub fn from_utilization(utilization_percent: f64) -> Self {
        if utilization_percent >= 100.0 {
            RiskLevel::Critical
        } else if utilization_percent >= 80.0 {
            RiskLevel::High
        } else if utilization_percent >= 60.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// The status shown to users.
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "exceeded",
            RiskLevel::High => "warning",
            RiskLevel::Medium => "moderate",
            RiskLevel::Low => "good",
        }
    }

    /// Tailwind classes for the status badge and utilization bar.
    pub fn color_class(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "bg-red-600 text-white",
            RiskLevel::High => "bg-orange-500 text-white",
            RiskLevel::Medium => "bg-yellow-400 text-black",
            RiskLevel::Low => "bg-green-600 text-white",
        }
    }
}

impl Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RiskLevel::Critical => "critical",
            RiskLevel::High => "high",
            RiskLevel::Medium => "medium",
            RiskLevel::Low => "low",
        };

        f.write_str(name)
    }
}

/// The days that count towards the burn rate on `today` for a period starting
/// on `start` and ending on `end` (open ends are unbounded).
///
/// Returns `None` when the window does not overlap the period.
pub fn trailing_window(start: Date, end: Option<Date>, today: Date) -> Option<DateRange> {
    let window_start = (today - Duration::days(BURN_WINDOW_DAYS - 1)).max(start);
    let window_end = end.map_or(today, |end| end.min(today));

    (window_start <= window_end).then_some(DateRange::new(Some(window_start), Some(window_end)))
}

/// Average daily spend, given the spending in the trailing window.
///
/// Zero when `today` is before `start`.
pub fn daily_burn(trailing_spend: f64, start: Date, today: Date) -> f64 {
    if today < start {
        return 0.0;
    }

    let days_elapsed = ((today - start).whole_days() + 1).max(1);

    trailing_spend / days_elapsed.min(BURN_WINDOW_DAYS) as f64
}

/// Whole days the remaining funds last at `daily_burn`.
pub fn runway_days(remaining_funds: f64, daily_burn: f64) -> i64 {
    if daily_burn <= 0.0 {
        return UNLIMITED_RUNWAY_DAYS;
    }

    (remaining_funds / daily_burn).floor().max(0.0) as i64
}

/// A budget's spending projected to the end of its period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetForecast {
    pub daily_burn: f64,
    pub days_remaining: i64,
    pub projected_additional: f64,
    pub projected_total: f64,
    pub suggested_budget: f64,
    pub risk: RiskLevel,
    pub runway_days: i64,
}

impl BudgetForecast {
    /// Project `usage` forward from `today` given the spending in the
    /// trailing window.
    pub fn new(
        usage: &BudgetUsage,
        start: Date,
        end: Date,
        today: Date,
        trailing_spend: f64,
    ) -> Self {
        let daily_burn = daily_burn(trailing_spend, start, today);
        let days_remaining = (end - today).whole_days().max(0);
        let projected_additional = daily_burn * days_remaining as f64;
        let projected_total = usage.spent + projected_additional;

        Self {
            daily_burn,
            days_remaining,
            projected_additional,
            projected_total,
            suggested_budget: projected_total * SUGGESTED_BUFFER,
            risk: RiskLevel::from_utilization(usage.utilization_percent),
            runway_days: runway_days(usage.remaining, daily_burn),
        }
    }
}

/// Forecast the budget's spending using the approved expenses in its category.
pub fn get_budget_forecast(
    budget: &Budget,
    usage: &BudgetUsage,
    today: Date,
    connection: &Connection,
) -> Result<BudgetForecast, Error> {
    let trailing_spend = match trailing_window(budget.start_date, Some(budget.end_date), today) {
        Some(window) => {
            sum_approved_expenses(window, Some(budget.category_name.as_ref()), connection)?
        }
        None => 0.0,
    };

    Ok(BudgetForecast::new(
        usage,
        budget.start_date,
        budget.end_date,
        today,
        trailing_spend,
    ))
}

/// How long the organisation's remaining funds last at its current burn rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrganisationRunway {
    pub daily_burn: f64,
    pub runway_days: i64,
}

/// Compute the runway for `summary`, measuring the burn rate from the first
/// approved expense.
pub fn get_organisation_runway(
    summary: &LedgerSummary,
    today: Date,
    connection: &Connection,
) -> Result<OrganisationRunway, Error> {
    let Some(first_expense) = earliest_approved_expense_date(connection)? else {
        return Ok(OrganisationRunway {
            daily_burn: 0.0,
            runway_days: UNLIMITED_RUNWAY_DAYS,
        });
    };

    let trailing_spend = match trailing_window(first_expense, None, today) {
        Some(window) => sum_approved_expenses(window, None, connection)?,
        None => 0.0,
    };
    let daily_burn = daily_burn(trailing_spend, first_expense, today);

    Ok(OrganisationRunway {
        daily_burn,
        runway_days: runway_days(summary.remaining, daily_burn),
    })
}

//! Per-category budgets and the rules for setting them.

use serde::Deserialize;
use time::Date;

use crate::{
    Error,
    category::CategoryName,
    database_id::{BudgetId, CategoryId},
    ledger::DateRange,
};

/// The amount a category may spend over a period.
#[derive(Debug, Clone, PartialEq)]
pub struct Budget {
    pub id: BudgetId,
    pub category_id: CategoryId,
    pub category_name: CategoryName,
    pub amount: f64,
    pub start_date: Date,
    pub end_date: Date,
}

impl Budget {
    pub fn period(&self) -> DateRange {
        DateRange::new(Some(self.start_date), Some(self.end_date))
    }
}

/// A validated budget that has not been stored yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewBudget {
    pub category_id: CategoryId,
    pub amount: f64,
    pub start_date: Date,
    pub end_date: Date,
}

/// The form data for creating or editing a budget.
#[derive(Debug, Deserialize)]
pub struct BudgetForm {
    pub category_id: CategoryId,
    pub amount: f64,
    pub start_date: Date,
    pub end_date: Date,
}

impl BudgetForm {
    /// # Errors
    /// Returns [Error::NegativeBudget] if the amount is below zero and
    /// [Error::InvalidDateRange] if the period ends before it starts.
    pub fn validate(&self) -> Result<NewBudget, Error> {
        if self.amount.is_nan() || self.amount < 0.0 {
            return Err(Error::NegativeBudget);
        }

        if self.start_date > self.end_date {
            return Err(Error::InvalidDateRange);
        }

        Ok(NewBudget {
            category_id: self.category_id,
            amount: self.amount,
            start_date: self.start_date,
            end_date: self.end_date,
        })
    }
}

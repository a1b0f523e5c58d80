//! Database operations for budgets.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    budget::domain::{Budget, NewBudget},
    category::CategoryName,
    database_id::BudgetId,
};

/// Create the budget table. Each category has at most one budget.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY,
            category_id INTEGER NOT NULL UNIQUE,
            amount REAL NOT NULL CHECK (amount >= 0),
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            CHECK (start_date <= end_date),
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

const SELECT_BUDGET: &str = "SELECT budget.id, budget.category_id, category.name, budget.amount,
    budget.start_date, budget.end_date
    FROM budget INNER JOIN category ON budget.category_id = category.id";

/// # Errors
/// Returns [Error::DuplicateBudget] if the category already has a budget and
/// [Error::NotFound] if the category does not exist.
pub fn create_budget(budget: NewBudget, connection: &Connection) -> Result<Budget, Error> {
    connection
        .query_row(
            "SELECT 1 FROM category WHERE id = ?1",
            [budget.category_id],
            |_| Ok(()),
        )
        .inspect_err(|error| {
            tracing::debug!("no category {} for new budget: {error}", budget.category_id)
        })?;

    connection.execute(
        "INSERT INTO budget (category_id, amount, start_date, end_date) VALUES (?1, ?2, ?3, ?4)",
        (
            budget.category_id,
            budget.amount,
            budget.start_date,
            budget.end_date,
        ),
    )?;

    get_budget(connection.last_insert_rowid(), connection)
}

pub fn get_budget(id: BudgetId, connection: &Connection) -> Result<Budget, Error> {
    connection
        .prepare(&format!("{SELECT_BUDGET} WHERE budget.id = :id"))?
        .query_row(&[(":id", &id)], map_row)
        .map_err(Error::from)
}

/// The budget for the category called `category_name`, if it has one.
pub fn get_budget_for_category(
    category_name: &str,
    connection: &Connection,
) -> Result<Option<Budget>, Error> {
    match connection
        .prepare(&format!("{SELECT_BUDGET} WHERE category.name = :name"))?
        .query_row(&[(":name", &category_name)], map_row)
    {
        Ok(budget) => Ok(Some(budget)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// All budgets ordered by category name.
pub fn get_all_budgets(connection: &Connection) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(&format!("{SELECT_BUDGET} ORDER BY category.name ASC"))?
        .query_map([], map_row)?
        .map(|maybe_budget| maybe_budget.map_err(Error::from))
        .collect()
}

/// # Errors
/// Returns [Error::UpdateMissingBudget] if there is no budget with `id` and
/// [Error::DuplicateBudget] if the new category already has a budget.
pub fn update_budget(id: BudgetId, budget: NewBudget, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE budget SET category_id = ?1, amount = ?2, start_date = ?3, end_date = ?4
        WHERE id = ?5",
        (
            budget.category_id,
            budget.amount,
            budget.start_date,
            budget.end_date,
            id,
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingBudget);
    }

    Ok(())
}

/// # Errors
/// Returns [Error::DeleteMissingBudget] if there is no budget with `id`.
pub fn delete_budget(id: BudgetId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM budget WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingBudget);
    }

    Ok(())
}

fn map_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    let category_name: String = row.get(2)?;

    Ok(Budget {
        id: row.get(0)?,
        category_id: row.get(1)?,
        category_name: CategoryName::new_unchecked(&category_name),
        amount: row.get(3)?,
        start_date: row.get(4)?,
        end_date: row.get(5)?,
    })
}

//! Database operations for management funds and sponsors.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    database_id::{FundId, SponsorId},
    income::domain::{ManagementFund, NewFund, NewSponsor, Sponsor},
    ledger::DateRange,
};

pub fn create_management_fund_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS management_fund (
            id INTEGER PRIMARY KEY,
            amount REAL NOT NULL,
            date_received TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_management_fund_date ON management_fund(date_received);",
    )?;

    Ok(())
}

pub fn create_sponsor_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS sponsor (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            amount REAL NOT NULL,
            date_received TEXT NOT NULL,
            contact_email TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_sponsor_date ON sponsor(date_received);",
    )?;

    Ok(())
}

pub fn create_fund(fund: NewFund, connection: &Connection) -> Result<ManagementFund, Error> {
    connection.execute(
        "INSERT INTO management_fund (amount, date_received) VALUES (?1, ?2)",
        (fund.amount, fund.date_received),
    )?;

    Ok(ManagementFund {
        id: connection.last_insert_rowid(),
        amount: fund.amount,
        date_received: fund.date_received,
    })
}

pub fn get_fund(id: FundId, connection: &Connection) -> Result<ManagementFund, Error> {
    connection
        .prepare("SELECT id, amount, date_received FROM management_fund WHERE id = :id")?
        .query_row(&[(":id", &id)], map_fund_row)
        .map_err(Error::from)
}

/// Funds received in `range`, newest first.
pub fn get_funds(range: DateRange, connection: &Connection) -> Result<Vec<ManagementFund>, Error> {
    connection
        .prepare(
            "SELECT id, amount, date_received FROM management_fund
            WHERE (?1 IS NULL OR date_received >= ?1) AND (?2 IS NULL OR date_received <= ?2)
            ORDER BY date_received DESC, id DESC",
        )?
        .query_map((range.start, range.end), map_fund_row)?
        .map(|maybe_fund| maybe_fund.map_err(Error::from))
        .collect()
}

/// Replace a fund's amount and date.
///
/// # Errors
/// Returns [Error::UpdateMissingFund] if there is no fund with `id`.
pub fn update_fund(id: FundId, fund: NewFund, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE management_fund SET amount = ?1, date_received = ?2 WHERE id = ?3",
        (fund.amount, fund.date_received, id),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingFund);
    }

    Ok(())
}

/// # Errors
/// Returns [Error::DeleteMissingFund] if there is no fund with `id`.
pub fn delete_fund(id: FundId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM management_fund WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingFund);
    }

    Ok(())
}

pub fn create_sponsor(sponsor: NewSponsor, connection: &Connection) -> Result<Sponsor, Error> {
    connection.execute(
        "INSERT INTO sponsor (name, amount, date_received, contact_email)
        VALUES (?1, ?2, ?3, ?4)",
        (
            &sponsor.name,
            sponsor.amount,
            sponsor.date_received,
            &sponsor.contact_email,
        ),
    )?;

    Ok(Sponsor {
        id: connection.last_insert_rowid(),
        name: sponsor.name,
        amount: sponsor.amount,
        date_received: sponsor.date_received,
        contact_email: sponsor.contact_email,
    })
}

pub fn get_sponsor(id: SponsorId, connection: &Connection) -> Result<Sponsor, Error> {
    connection
        .prepare(
            "SELECT id, name, amount, date_received, contact_email FROM sponsor WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_sponsor_row)
        .map_err(Error::from)
}

/// The order to list sponsors in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SponsorOrder {
    NewestFirst,
    LargestFirst,
}

/// Sponsors who paid in `range`.
pub fn get_sponsors(
    range: DateRange,
    order: SponsorOrder,
    connection: &Connection,
) -> Result<Vec<Sponsor>, Error> {
    let order_clause = match order {
        SponsorOrder::NewestFirst => "ORDER BY date_received DESC, id DESC",
        SponsorOrder::LargestFirst => "ORDER BY amount DESC, name ASC",
    };

    let query = format!(
        "SELECT id, name, amount, date_received, contact_email FROM sponsor
        WHERE (?1 IS NULL OR date_received >= ?1) AND (?2 IS NULL OR date_received <= ?2)
        {order_clause}"
    );

    connection
        .prepare(&query)?
        .query_map((range.start, range.end), map_sponsor_row)?
        .map(|maybe_sponsor| maybe_sponsor.map_err(Error::from))
        .collect()
}

/// # Errors
/// Returns [Error::UpdateMissingSponsor] if there is no sponsor with `id`.
pub fn update_sponsor(id: SponsorId, sponsor: NewSponsor, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE sponsor SET name = ?1, amount = ?2, date_received = ?3, contact_email = ?4
        WHERE id = ?5",
        (
            &sponsor.name,
            sponsor.amount,
            sponsor.date_received,
            &sponsor.contact_email,
            id,
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingSponsor);
    }

    Ok(())
}

/// # Errors
/// Returns [Error::DeleteMissingSponsor] if there is no sponsor with `id`.
pub fn delete_sponsor(id: SponsorId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM sponsor WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingSponsor);
    }

    Ok(())
}

fn map_fund_row(row: &Row) -> Result<ManagementFund, rusqlite::Error> {
    Ok(ManagementFund {
        id: row.get(0)?,
        amount: row.get(1)?,
        date_received: row.get(2)?,
    })
}

fn map_sponsor_row(row: &Row) -> Result<Sponsor, rusqlite::Error> {
    Ok(Sponsor {
        id: row.get(0)?,
        name: row.get(1)?,
        amount: row.get(2)?,
        date_received: row.get(3)?,
        contact_email: row.get(4)?,
    })
}

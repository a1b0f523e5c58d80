//! Records log-in attempts and limits how often one client may guess passwords.

use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use crate::Error;

/// The number of failed attempts allowed from one IP address within
/// [LOG_IN_ATTEMPT_WINDOW] before further attempts are refused.
pub const MAX_FAILED_LOG_IN_ATTEMPTS: u32 = 5;
/// How far back failed attempts are counted.
pub const LOG_IN_ATTEMPT_WINDOW: Duration = Duration::seconds(300);

pub fn create_login_attempt_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS login_attempt (
            id INTEGER PRIMARY KEY,
            username TEXT NOT NULL,
            ip_address TEXT NOT NULL,
            success INTEGER NOT NULL,
            timestamp TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_login_attempt_ip ON login_attempt(ip_address, timestamp);",
    )?;

    Ok(())
}

/// Append a log-in attempt made at `timestamp`.
pub fn record_login_attempt(
    username: &str,
    ip_address: &str,
    success: bool,
    timestamp: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO login_attempt (username, ip_address, success, timestamp)
        VALUES (?1, ?2, ?3, ?4)",
        (username, ip_address, success, timestamp),
    )?;

    Ok(())
}

/// Whether `ip_address` has used up its failed attempts in the window ending at `now`.
pub fn is_rate_limited(
    ip_address: &str,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<bool, Error> {
    let window_start = now - LOG_IN_ATTEMPT_WINDOW;
    let failed_attempts: u32 = connection.query_row(
        "SELECT COUNT(*) FROM login_attempt
        WHERE ip_address = ?1 AND success = 0 AND timestamp > ?2",
        (ip_address, window_start),
        |row| row.get(0),
    )?;

    Ok(failed_attempts >= MAX_FAILED_LOG_IN_ATTEMPTS)
}

//! Database operations for the audit log.

use std::{fmt::Display, str::FromStr};

use axum::http::HeaderMap;
use rusqlite::{Connection, Row};
use time::OffsetDateTime;

use crate::{Error, auth::UserID};

/// A treasurer action that is recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditAction {
    ApproveTransaction,
    RejectTransaction,
    DeleteTransaction,
    UpdateTransaction,
    CreateFund,
    UpdateFund,
    DeleteFund,
    CreateSponsor,
    UpdateSponsor,
    DeleteSponsor,
    CreateCategory,
    UpdateCategory,
    DeleteCategory,
    CreateBudget,
    UpdateBudget,
    DeleteBudget,
    ImportData,
    ExportData,
}

impl AuditAction {
    /// Every action, in the order they are listed in the audit page filter.
    pub const ALL: [AuditAction; 18] = [
        AuditAction::ApproveTransaction,
        AuditAction::RejectTransaction,
        AuditAction::DeleteTransaction,
        AuditAction::UpdateTransaction,
        AuditAction::CreateFund,
        AuditAction::UpdateFund,
        AuditAction::DeleteFund,
        AuditAction::CreateSponsor,
        AuditAction::UpdateSponsor,
        AuditAction::DeleteSponsor,
        AuditAction::CreateCategory,
        AuditAction::UpdateCategory,
        AuditAction::DeleteCategory,
        AuditAction::CreateBudget,
        AuditAction::UpdateBudget,
        AuditAction::DeleteBudget,
        AuditAction::ImportData,
        AuditAction::ExportData,
    ];

    /// The name stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::ApproveTransaction => "approve_transaction",
            AuditAction::RejectTransaction => "reject_transaction",
            AuditAction::DeleteTransaction => "delete_transaction",
            AuditAction::UpdateTransaction => "update_transaction",
            AuditAction::CreateFund => "create_fund",
            AuditAction::UpdateFund => "update_fund",
            AuditAction::DeleteFund => "delete_fund",
            AuditAction::CreateSponsor => "create_sponsor",
            AuditAction::UpdateSponsor => "update_sponsor",
            AuditAction::DeleteSponsor => "delete_sponsor",
            AuditAction::CreateCategory => "create_category",
            AuditAction::UpdateCategory => "update_category",
            AuditAction::DeleteCategory => "delete_category",
            AuditAction::CreateBudget => "create_budget",
            AuditAction::UpdateBudget => "update_budget",
            AuditAction::DeleteBudget => "delete_budget",
            AuditAction::ImportData => "import_data",
            AuditAction::ExportData => "export_data",
        }
    }

    /// A human readable label, e.g. "Approved Transaction".
    pub fn label(&self) -> &'static str {
        match self {
            AuditAction::ApproveTransaction => "Approved Transaction",
            AuditAction::RejectTransaction => "Rejected Transaction",
            AuditAction::DeleteTransaction => "Deleted Transaction",
            AuditAction::UpdateTransaction => "Updated Transaction",
            AuditAction::CreateFund => "Created Fund",
            AuditAction::UpdateFund => "Updated Fund",
            AuditAction::DeleteFund => "Deleted Fund",
            AuditAction::CreateSponsor => "Created Sponsor",
            AuditAction::UpdateSponsor => "Updated Sponsor",
            AuditAction::DeleteSponsor => "Deleted Sponsor",
            AuditAction::CreateCategory => "Created Category",
            AuditAction::UpdateCategory => "Updated Category",
            AuditAction::DeleteCategory => "Deleted Category",
            AuditAction::CreateBudget => "Created Budget",
            AuditAction::UpdateBudget => "Updated Budget",
            AuditAction::DeleteBudget => "Deleted Budget",
            AuditAction::ImportData => "Imported Data",
            AuditAction::ExportData => "Exported Data",
        }
    }
}

impl Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuditAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| format!("unknown audit action \"{s}\""))
    }
}

/// What happened, to which object, and from where.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub user_id: UserID,
    pub action: AuditAction,
    pub object_type: &'static str,
    pub object_id: i64,
    pub description: String,
    pub ip_address: String,
}

/// A stored audit log entry with the username of the user who acted.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub id: i64,
    pub username: String,
    pub action: AuditAction,
    pub object_type: String,
    pub object_id: i64,
    pub description: String,
    pub timestamp: OffsetDateTime,
    pub ip_address: String,
}

/// The number of entries shown on the audit page.
pub const AUDIT_PAGE_LIMIT: u32 = 200;

pub fn create_audit_log_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS audit_log (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            action TEXT NOT NULL,
            object_type TEXT NOT NULL,
            object_id INTEGER NOT NULL,
            description TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            ip_address TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_audit_log_action ON audit_log(action, timestamp);
        CREATE INDEX IF NOT EXISTS idx_audit_log_user ON audit_log(user_id, timestamp);",
    )?;

    Ok(())
}

/// Append `entry` to the audit log with the time `timestamp`.
pub fn record_audit(
    entry: &NewAuditEntry,
    timestamp: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO audit_log
            (user_id, action, object_type, object_id, description, timestamp, ip_address)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            entry.user_id.as_i64(),
            entry.action.as_str(),
            entry.object_type,
            entry.object_id,
            &entry.description,
            timestamp,
            &entry.ip_address,
        ),
    )?;

    tracing::info!(
        "Audit logged: user {} {} on {} {}",
        entry.user_id,
        entry.action,
        entry.object_type,
        entry.object_id
    );

    Ok(())
}

/// Record `entry` now, logging rather than returning any failure.
///
/// The action being audited has already happened, so a failure to write the
/// audit entry must not turn a successful request into an error.
pub fn audit(entry: NewAuditEntry, connection: &Connection) {
    if let Err(error) = record_audit(&entry, OffsetDateTime::now_utc(), connection) {
        tracing::error!("Failed to log audit action {}: {error}", entry.action);
    }
}

/// The latest entries, newest first, optionally only those for `action`.
pub fn get_audit_entries(
    action: Option<AuditAction>,
    limit: u32,
    connection: &Connection,
) -> Result<Vec<AuditEntry>, Error> {
    connection
        .prepare(
            "SELECT audit_log.id, user.username, action, object_type, object_id, description,
                timestamp, ip_address
            FROM audit_log
            INNER JOIN user ON user.id = audit_log.user_id
            WHERE ?1 IS NULL OR action = ?1
            ORDER BY timestamp DESC, audit_log.id DESC
            LIMIT ?2",
        )?
        .query_map((action.map(|action| action.as_str()), limit), map_row)?
        .map(|maybe_entry| maybe_entry.map_err(Error::from))
        .collect()
}

fn map_row(row: &Row) -> Result<AuditEntry, rusqlite::Error> {
    let raw_action: String = row.get(2)?;
    let action = raw_action.parse().map_err(|error: String| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, error.into())
    })?;

    Ok(AuditEntry {
        id: row.get(0)?,
        username: row.get(1)?,
        action,
        object_type: row.get(3)?,
        object_id: row.get(4)?,
        description: row.get(5)?,
        timestamp: row.get(6)?,
        ip_address: row.get(7)?,
    })
}

/// The client's IP address as reported by a reverse proxy.
///
/// Uses the first address in `X-Forwarded-For`, then `X-Real-IP`, and
/// falls back to "unknown".
pub fn client_ip(headers: &HeaderMap) -> String {
    let forwarded_for = headers
        .get("x-forwarded-for")
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    if let Some(ip) = forwarded_for {
        return ip.to_owned();
    }

    headers
        .get("x-real-ip")
        .and_then(|header| header.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or("unknown")
        .to_owned()
}

#[cfg(test)]
mod audit_action_tests {
    use super::AuditAction;

    #[test]
    fn parses_every_action_name() {
        for action in AuditAction::ALL {
            assert_eq!(action.as_str().parse::<AuditAction>(), Ok(action));
        }
    }

    #[test]
    fn rejects_unknown_action() {
        assert!("drop_tables".parse::<AuditAction>().is_err());
    }
}

#[cfg(test)]
mod client_ip_tests {
    use axum::http::HeaderMap;

    use super::client_ip;

    #[test]
    fn uses_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "10.0.0.2".parse().unwrap());

        assert_eq!(client_ip(&headers), "203.0.113.7");
    }

    #[test]
    fn falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "10.0.0.2".parse().unwrap());

        assert_eq!(client_ip(&headers), "10.0.0.2");
    }

    #[test]
    fn unknown_without_headers() {
        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }
}

#[cfg(test)]
mod audit_log_query_tests {
    use rusqlite::Connection;
    use time::{Duration, OffsetDateTime};

    use crate::{
        auth::{PasswordHash, Role, UserID, create_user},
        db::initialize,
    };

    use super::{AuditAction, NewAuditEntry, get_audit_entries, record_audit};

    fn get_connection_with_user() -> (Connection, UserID) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let user = create_user(
            "treasurer",
            "treasurer@example.com",
            PasswordHash::new_unchecked("hunter2"),
            Role::Treasurer,
            &connection,
        )
        .unwrap();

        (connection, user.id)
    }

    fn entry(user_id: UserID, action: AuditAction, object_id: i64) -> NewAuditEntry {
        NewAuditEntry {
            user_id,
            action,
            object_type: "Transaction",
            object_id,
            description: format!("entry {object_id}"),
            ip_address: "10.0.0.1".to_owned(),
        }
    }

    #[test]
    fn lists_newest_first_with_username() {
        let (connection, user_id) = get_connection_with_user();
        let now = OffsetDateTime::now_utc();
        record_audit(
            &entry(user_id, AuditAction::ApproveTransaction, 1),
            now - Duration::minutes(5),
            &connection,
        )
        .unwrap();
        record_audit(&entry(user_id, AuditAction::RejectTransaction, 2), now, &connection)
            .unwrap();

        let entries = get_audit_entries(None, 200, &connection).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].object_id, 2);
        assert_eq!(entries[0].username, "treasurer");
        assert_eq!(entries[1].action, AuditAction::ApproveTransaction);
    }

    #[test]
    fn filters_by_action() {
        let (connection, user_id) = get_connection_with_user();
        let now = OffsetDateTime::now_utc();
        record_audit(&entry(user_id, AuditAction::ApproveTransaction, 1), now, &connection)
            .unwrap();
        record_audit(&entry(user_id, AuditAction::ExportData, 0), now, &connection).unwrap();

        let entries =
            get_audit_entries(Some(AuditAction::ExportData), 200, &connection).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::ExportData);
    }

    #[test]
    fn respects_limit() {
        let (connection, user_id) = get_connection_with_user();
        let now = OffsetDateTime::now_utc();
        for id in 0..5 {
            record_audit(&entry(user_id, AuditAction::CreateFund, id), now, &connection).unwrap();
        }

        let entries = get_audit_entries(None, 3, &connection).unwrap();

        assert_eq!(entries.len(), 3);
    }
}

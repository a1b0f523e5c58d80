//! Database operations for notifications.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row};
use time::OffsetDateTime;

use crate::{
    Error,
    auth::{UserID, get_treasurer_ids},
};

/// The event a notification tells the user about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    TransactionApproved,
    TransactionRejected,
    BudgetExceeded,
    FundCreated,
    FundLow,
}

impl NotificationKind {
    const ALL: [NotificationKind; 5] = [
        NotificationKind::TransactionApproved,
        NotificationKind::TransactionRejected,
        NotificationKind::BudgetExceeded,
        NotificationKind::FundCreated,
        NotificationKind::FundLow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::TransactionApproved => "transaction_approved",
            NotificationKind::TransactionRejected => "transaction_rejected",
            NotificationKind::BudgetExceeded => "budget_exceeded",
            NotificationKind::FundCreated => "fund_created",
            NotificationKind::FundLow => "fund_low",
        }
    }
}

impl Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown notification kind \"{s}\""))
    }
}

/// The record a notification refers to, e.g. ("Transaction", 12).
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedObject {
    pub object_type: &'static str,
    pub object_id: i64,
}

/// A notification that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub related: Option<RelatedObject>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: i64,
    pub user_id: UserID,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: OffsetDateTime,
    pub related_object_type: Option<String>,
    pub related_object_id: Option<i64>,
}

pub fn create_notification_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS notification (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            kind TEXT NOT NULL,
            title TEXT NOT NULL,
            message TEXT NOT NULL,
            is_read INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            related_object_type TEXT,
            related_object_id INTEGER,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_notification_user ON notification(user_id, is_read);",
    )?;

    Ok(())
}

/// Store `notification` for `user_id`.
pub fn create_notification(
    user_id: UserID,
    notification: &NewNotification,
    created_at: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    let (related_object_type, related_object_id) = match &notification.related {
        Some(related) => (Some(related.object_type), Some(related.object_id)),
        None => (None, None),
    };

    connection.execute(
        "INSERT INTO notification
            (user_id, kind, title, message, created_at, related_object_type, related_object_id)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            user_id.as_i64(),
            notification.kind.as_str(),
            &notification.title,
            &notification.message,
            created_at,
            related_object_type,
            related_object_id,
        ),
    )?;

    Ok(())
}

/// Send `notification` to every treasurer.
pub fn notify_treasurers(
    notification: &NewNotification,
    created_at: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    for treasurer_id in get_treasurer_ids(connection)? {
        create_notification(treasurer_id, notification, created_at, connection)?;
    }

    Ok(())
}

/// Store `notification` for `user_id` now, logging rather than returning any failure.
pub fn notify(user_id: UserID, notification: NewNotification, connection: &Connection) {
    if let Err(error) =
        create_notification(user_id, &notification, OffsetDateTime::now_utc(), connection)
    {
        tracing::error!(
            "Failed to create {} notification for user {user_id}: {error}",
            notification.kind
        );
    }
}

/// Send `notification` to all treasurers now, logging rather than returning any failure.
pub fn notify_all_treasurers(notification: NewNotification, connection: &Connection) {
    if let Err(error) = notify_treasurers(&notification, OffsetDateTime::now_utc(), connection) {
        tracing::error!(
            "Failed to create {} notification for treasurers: {error}",
            notification.kind
        );
    }
}

/// The number of notifications `user_id` has not read yet.
pub fn count_unread_notifications(user_id: UserID, connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row(
            "SELECT COUNT(*) FROM notification WHERE user_id = ?1 AND is_read = 0",
            (user_id.as_i64(),),
            |row| row.get(0),
        )
        .map_err(Error::from)
}

/// All of the user's notifications, newest first.
pub fn get_notifications(user_id: UserID, connection: &Connection) -> Result<Vec<Notification>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, kind, title, message, is_read, created_at,
                related_object_type, related_object_id
            FROM notification
            WHERE user_id = ?1
            ORDER BY created_at DESC, id DESC",
        )?
        .query_map((user_id.as_i64(),), map_row)?
        .map(|maybe_notification| maybe_notification.map_err(Error::from))
        .collect()
}

/// Mark every notification belonging to `user_id` as read, returning how many changed.
pub fn mark_all_notifications_read(user_id: UserID, connection: &Connection) -> Result<usize, Error> {
    connection
        .execute(
            "UPDATE notification SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
            (user_id.as_i64(),),
        )
        .map_err(Error::from)
}

fn map_row(row: &Row) -> Result<Notification, rusqlite::Error> {
    let raw_kind: String = row.get(2)?;
    let kind = raw_kind.parse().map_err(|error: String| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, error.into())
    })?;

    Ok(Notification {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        kind,
        title: row.get(3)?,
        message: row.get(4)?,
        is_read: row.get(5)?,
        created_at: row.get(6)?,
        related_object_type: row.get(7)?,
        related_object_id: row.get(8)?,
    })
}

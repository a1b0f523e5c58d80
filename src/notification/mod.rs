//! In-app notifications about approvals, budgets and funds.

mod db;
mod page;
mod triggers;

pub use db::{
    NewNotification, Notification, NotificationKind, RelatedObject, count_unread_notifications,
    create_notification, create_notification_table, get_notifications,
    mark_all_notifications_read, notify, notify_all_treasurers,
};
pub use page::{get_notifications_page, mark_notifications_read_endpoint};
pub use triggers::SpendingSnapshot;

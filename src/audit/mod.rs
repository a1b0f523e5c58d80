//! The append-only record of treasurer actions.

mod db;
mod page;

pub use db::{
    AUDIT_PAGE_LIMIT, AuditAction, AuditEntry, NewAuditEntry, audit, client_ip,
    create_audit_log_table, get_audit_entries,
};
pub use page::get_audit_log_page;

#[cfg(test)]
pub use db::record_audit;

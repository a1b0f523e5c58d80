//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/funds/{fund_id}/edit', use [format_endpoint].

/// The root route which redirects to the dashboard or log in page.
pub const ROOT: &str = "/";
/// The landing page for logged in users.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The page for displaying transactions.
pub const TRANSACTIONS_VIEW: &str = "/transactions";
/// The page for submitting a new transaction.
pub const NEW_TRANSACTION_VIEW: &str = "/transactions/new";
/// The page for editing an existing transaction.
pub const EDIT_TRANSACTION_VIEW: &str = "/transactions/{transaction_id}/edit";
/// The page for importing transactions from a CSV or Excel file.
pub const IMPORT_VIEW: &str = "/transactions/import";
/// The page listing management funds and sponsors.
pub const INCOME_VIEW: &str = "/income";
/// The page for recording a new management fund.
pub const NEW_FUND_VIEW: &str = "/funds/new";
/// The page for editing a management fund.
pub const EDIT_FUND_VIEW: &str = "/funds/{fund_id}/edit";
/// The page for recording a new sponsor.
pub const NEW_SPONSOR_VIEW: &str = "/sponsors/new";
/// The page for editing a sponsor.
pub const EDIT_SPONSOR_VIEW: &str = "/sponsors/{sponsor_id}/edit";
/// The page for listing all categories.
pub const CATEGORIES_VIEW: &str = "/categories";
/// The page for creating a new category.
pub const NEW_CATEGORY_VIEW: &str = "/categories/new";
/// The page for editing an existing category.
pub const EDIT_CATEGORY_VIEW: &str = "/categories/{category_id}/edit";
/// The page for listing budgets and their forecasts.
pub const BUDGETS_VIEW: &str = "/budgets";
/// The page for creating a new budget.
pub const NEW_BUDGET_VIEW: &str = "/budgets/new";
/// The page for editing an existing budget.
pub const EDIT_BUDGET_VIEW: &str = "/budgets/{budget_id}/edit";
/// The printable finance report.
pub const REPORT_VIEW: &str = "/report";
/// The CSV export of approved transactions.
pub const EXPORT_TRANSACTIONS_CSV: &str = "/export/transactions.csv";
/// The Excel export of approved transactions.
pub const EXPORT_TRANSACTIONS_XLSX: &str = "/export/transactions.xlsx";
/// The CSV export of the finance summary.
pub const EXPORT_REPORT_CSV: &str = "/export/report.csv";
/// The PDF finance report.
pub const EXPORT_REPORT_PDF: &str = "/export/report.pdf";
/// A ZIP file with every export.
pub const EXPORT_BUNDLE_ZIP: &str = "/export/finance_export.zip";
/// The audit log page.
pub const AUDIT_LOG_VIEW: &str = "/audit";
/// The page listing the user's notifications.
pub const NOTIFICATIONS_VIEW: &str = "/notifications";
/// The route for getting the registration page.
pub const REGISTER_VIEW: &str = "/register";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The route for confirming an email address.
pub const VERIFY_EMAIL: &str = "/verify_email";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to register a new member.
pub const REGISTER_API: &str = "/api/register";
/// The route to create a transaction.
pub const TRANSACTIONS_API: &str = "/api/transactions";
/// The route to update a transaction.
pub const TRANSACTION_API: &str = "/api/transactions/{transaction_id}";
/// The route to approve a transaction.
pub const APPROVE_TRANSACTION: &str = "/api/transactions/{transaction_id}/approve";
/// The route to reject, and delete, a transaction.
pub const REJECT_TRANSACTION: &str = "/api/transactions/{transaction_id}/reject";
/// The route to approve many transactions at once.
pub const BULK_APPROVE_TRANSACTIONS: &str = "/api/transactions/bulk_approve";
/// The route to reject many transactions at once.
pub const BULK_REJECT_TRANSACTIONS: &str = "/api/transactions/bulk_reject";
/// The route to upload a CSV file of transactions.
pub const IMPORT_API: &str = "/api/import";
/// The route to create a management fund.
pub const POST_FUND: &str = "/api/funds";
/// The route to update or delete a management fund.
pub const FUND: &str = "/api/funds/{fund_id}";
/// The route to create a sponsor.
pub const POST_SPONSOR: &str = "/api/sponsors";
/// The route to update or delete a sponsor.
pub const SPONSOR: &str = "/api/sponsors/{sponsor_id}";
/// The route to create a category.
pub const POST_CATEGORY: &str = "/api/categories";
/// The route to update or delete a category.
pub const CATEGORY: &str = "/api/categories/{category_id}";
/// The route to create a budget.
pub const POST_BUDGET: &str = "/api/budgets";
/// The route to update or delete a budget.
pub const BUDGET: &str = "/api/budgets/{budget_id}";
/// The route to mark all of the user's notifications as read.
pub const MARK_NOTIFICATIONS_READ: &str = "/api/notifications/read";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// Only the first parameter (a name wrapped in curly braces) is replaced.
/// If `endpoint_path` has no parameter, it is returned unchanged.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let param_start = match endpoint_path.find('{') {
        Some(index) => index,
        None => return endpoint_path.to_owned(),
    };

    let param_end = match endpoint_path[param_start..].find('}') {
        Some(index) => param_start + index,
        None => return endpoint_path.to_owned(),
    };

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end + 1..]
    )
}

#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints::{self, format_endpoint};

    #[track_caller]
    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok(), "{uri} is not a valid URI");
    }

    #[test]
    fn endpoints_are_valid_uris() {
        let endpoints = [
            endpoints::ROOT,
            endpoints::DASHBOARD_VIEW,
            endpoints::TRANSACTIONS_VIEW,
            endpoints::NEW_TRANSACTION_VIEW,
            endpoints::IMPORT_VIEW,
            endpoints::INCOME_VIEW,
            endpoints::NEW_FUND_VIEW,
            endpoints::NEW_SPONSOR_VIEW,
            endpoints::CATEGORIES_VIEW,
            endpoints::NEW_CATEGORY_VIEW,
            endpoints::BUDGETS_VIEW,
            endpoints::NEW_BUDGET_VIEW,
            endpoints::REPORT_VIEW,
            endpoints::EXPORT_TRANSACTIONS_CSV,
            endpoints::EXPORT_REPORT_CSV,
            endpoints::AUDIT_LOG_VIEW,
            endpoints::NOTIFICATIONS_VIEW,
            endpoints::REGISTER_VIEW,
            endpoints::LOG_IN_VIEW,
            endpoints::VERIFY_EMAIL,
            endpoints::INTERNAL_ERROR_VIEW,
            endpoints::STATIC,
            endpoints::LOG_IN_API,
            endpoints::LOG_OUT,
            endpoints::REGISTER_API,
            endpoints::TRANSACTIONS_API,
            endpoints::BULK_APPROVE_TRANSACTIONS,
            endpoints::BULK_REJECT_TRANSACTIONS,
            endpoints::IMPORT_API,
            endpoints::POST_FUND,
            endpoints::POST_SPONSOR,
            endpoints::POST_CATEGORY,
            endpoints::POST_BUDGET,
            endpoints::MARK_NOTIFICATIONS_READ,
        ];

        for endpoint in endpoints {
            assert_endpoint_is_valid_uri(endpoint);
        }

        let parameterised = [
            endpoints::EDIT_TRANSACTION_VIEW,
            endpoints::EDIT_FUND_VIEW,
            endpoints::EDIT_SPONSOR_VIEW,
            endpoints::EDIT_CATEGORY_VIEW,
            endpoints::EDIT_BUDGET_VIEW,
            endpoints::TRANSACTION_API,
            endpoints::APPROVE_TRANSACTION,
            endpoints::REJECT_TRANSACTION,
            endpoints::FUND,
            endpoints::SPONSOR,
            endpoints::CATEGORY,
            endpoints::BUDGET,
        ];

        for endpoint in parameterised {
            assert_endpoint_is_valid_uri(&format_endpoint(endpoint, 1));
        }
    }

    #[test]
    fn produces_valid_uri() {
        let path = format_endpoint(endpoints::APPROVE_TRANSACTION, 42);

        assert_eq!(path, "/api/transactions/42/approve");
    }

    #[test]
    fn returns_original_path_with_no_parameter() {
        let path = format_endpoint(endpoints::BUDGETS_VIEW, 1);

        assert_eq!(path, endpoints::BUDGETS_VIEW);
    }

    #[test]
    fn parameter_at_end() {
        let path = format_endpoint(endpoints::SPONSOR, 7);

        assert_eq!(path, "/api/sponsors/7");
    }
}

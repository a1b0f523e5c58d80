//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    response::Redirect,
    routing::{get, post, put},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    audit::get_audit_log_page,
    auth::{
        auth_guard, auth_guard_hx, get_log_in_page, get_log_out, get_register_page,
        get_verify_email_page, post_log_in, register_user, treasurer_guard, treasurer_guard_hx,
    },
    budget::{
        create_budget_endpoint, delete_budget_endpoint, get_budgets_page, get_edit_budget_page,
        get_new_budget_page, update_budget_endpoint,
    },
    category::{
        create_category_endpoint, delete_category_endpoint, get_categories_page,
        get_edit_category_page, get_new_category_page, update_category_endpoint,
    },
    dashboard::get_dashboard_page,
    endpoints,
    income::{
        create_fund_endpoint, create_sponsor_endpoint, delete_fund_endpoint,
        delete_sponsor_endpoint, get_edit_fund_page, get_edit_sponsor_page, get_income_page,
        get_new_fund_page, get_new_sponsor_page, update_fund_endpoint, update_sponsor_endpoint,
    },
    internal_server_error::get_internal_server_error_page,
    not_found::get_404_not_found,
    notification::{get_notifications_page, mark_notifications_read_endpoint},
    report::{
        export_bundle_zip, export_report_csv, export_report_pdf, export_transactions_csv,
        export_transactions_xlsx, get_report_page,
    },
    transaction::{
        MAX_IMPORT_FILE_SIZE_MB, approve_transaction_endpoint, bulk_approve_endpoint,
        bulk_reject_endpoint, create_transaction_endpoint, delete_transaction_endpoint,
        get_edit_transaction_page, get_import_page, get_new_transaction_page,
        get_transactions_page, import_transactions_endpoint, reject_transaction_endpoint,
        update_transaction_endpoint,
    },
};

/// Leaves room for the multipart boundaries around the largest CSV file allowed.
const IMPORT_BODY_LIMIT: usize = (MAX_IMPORT_FILE_SIZE_MB + 1) * 1024 * 1024;

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(endpoints::REGISTER_API, post(register_user))
        .route(endpoints::VERIFY_EMAIL, get(get_verify_email_page))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let treasurer_pages = Router::new()
        .route(
            endpoints::EDIT_TRANSACTION_VIEW,
            get(get_edit_transaction_page),
        )
        .route(endpoints::IMPORT_VIEW, get(get_import_page))
        .route(endpoints::NEW_FUND_VIEW, get(get_new_fund_page))
        .route(endpoints::EDIT_FUND_VIEW, get(get_edit_fund_page))
        .route(endpoints::NEW_SPONSOR_VIEW, get(get_new_sponsor_page))
        .route(endpoints::EDIT_SPONSOR_VIEW, get(get_edit_sponsor_page))
        .route(endpoints::NEW_CATEGORY_VIEW, get(get_new_category_page))
        .route(endpoints::EDIT_CATEGORY_VIEW, get(get_edit_category_page))
        .route(endpoints::NEW_BUDGET_VIEW, get(get_new_budget_page))
        .route(endpoints::EDIT_BUDGET_VIEW, get(get_edit_budget_page))
        .route(endpoints::AUDIT_LOG_VIEW, get(get_audit_log_page))
        .route(
            endpoints::EXPORT_TRANSACTIONS_CSV,
            get(export_transactions_csv),
        )
        .route(
            endpoints::EXPORT_TRANSACTIONS_XLSX,
            get(export_transactions_xlsx),
        )
        .route(endpoints::EXPORT_REPORT_CSV, get(export_report_csv))
        .route(endpoints::EXPORT_REPORT_PDF, get(export_report_pdf))
        .route(endpoints::EXPORT_BUNDLE_ZIP, get(export_bundle_zip))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            treasurer_guard,
        ));

    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::TRANSACTIONS_VIEW, get(get_transactions_page))
        .route(
            endpoints::NEW_TRANSACTION_VIEW,
            get(get_new_transaction_page),
        )
        .route(endpoints::INCOME_VIEW, get(get_income_page))
        .route(endpoints::CATEGORIES_VIEW, get(get_categories_page))
        .route(endpoints::BUDGETS_VIEW, get(get_budgets_page))
        .route(endpoints::REPORT_VIEW, get(get_report_page))
        .route(endpoints::NOTIFICATIONS_VIEW, get(get_notifications_page))
        .merge(treasurer_pages)
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    let treasurer_endpoints = Router::new()
        .route(
            endpoints::TRANSACTION_API,
            put(update_transaction_endpoint).delete(delete_transaction_endpoint),
        )
        .route(
            endpoints::APPROVE_TRANSACTION,
            post(approve_transaction_endpoint),
        )
        .route(
            endpoints::REJECT_TRANSACTION,
            post(reject_transaction_endpoint),
        )
        .route(
            endpoints::BULK_APPROVE_TRANSACTIONS,
            post(bulk_approve_endpoint),
        )
        .route(
            endpoints::BULK_REJECT_TRANSACTIONS,
            post(bulk_reject_endpoint),
        )
        .route(
            endpoints::IMPORT_API,
            post(import_transactions_endpoint).layer(DefaultBodyLimit::max(IMPORT_BODY_LIMIT)),
        )
        .route(endpoints::POST_FUND, post(create_fund_endpoint))
        .route(
            endpoints::FUND,
            put(update_fund_endpoint).delete(delete_fund_endpoint),
        )
        .route(endpoints::POST_SPONSOR, post(create_sponsor_endpoint))
        .route(
            endpoints::SPONSOR,
            put(update_sponsor_endpoint).delete(delete_sponsor_endpoint),
        )
        .route(endpoints::POST_CATEGORY, post(create_category_endpoint))
        .route(
            endpoints::CATEGORY,
            put(update_category_endpoint).delete(delete_category_endpoint),
        )
        .route(endpoints::POST_BUDGET, post(create_budget_endpoint))
        .route(
            endpoints::BUDGET,
            put(update_budget_endpoint).delete(delete_budget_endpoint),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            treasurer_guard_hx,
        ));

    // These POST/PUT routes need to use the HX-REDIRECT header for auth redirects to work properly for HTMX requests.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(
                endpoints::TRANSACTIONS_API,
                post(create_transaction_endpoint),
            )
            .route(
                endpoints::MARK_NOTIFICATIONS_READ,
                post(mark_notifications_read_endpoint),
            )
            .merge(treasurer_endpoints)
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx)),
    );

    protected_routes
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}

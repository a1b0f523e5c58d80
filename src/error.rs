//! Defines the app level error type and conversions to rendered HTML pages and alerts.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use time::Date;

use crate::{
    alert::Alert, html::error_view, internal_server_error::InternalServerError,
    not_found::NotFoundError,
};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an invalid combination of username and password.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The auth token cookie is missing from the cookie jar in the request.
    #[error("no cookies in the cookie jar :(")]
    CookieMissing,

    /// There was an error parsing the date in the cookie or creating the new
    /// expiry date time.
    ///
    /// Callers should pass in the original error as a string and the date
    /// string that caused the error.
    #[error("could not format expiry cookie date-time string \"{1}\": {0}")]
    InvalidDateFormat(String, String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// The password and its confirmation did not match.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The username is empty, too long or contains characters other than
    /// letters, digits and `_.-`.
    #[error("invalid username: {0}")]
    InvalidUsername(String),

    /// The username is already taken.
    #[error("that username is already taken")]
    DuplicateUsername,

    /// The email address is missing an '@'.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// The email address is already registered.
    #[error("that email address is already registered")]
    DuplicateEmail,

    /// The user tried to log in before confirming their email address.
    #[error("email address has not been verified")]
    EmailNotVerified,

    /// Too many failed log-in attempts were made from the client's IP address.
    #[error("too many failed log-in attempts, try again in a few minutes")]
    TooManyLogInAttempts,

    /// The email verification token does not match any pending verification.
    #[error("the verification link is invalid")]
    InvalidVerificationToken,

    /// The email verification token is older than the verification window.
    #[error("the verification link has expired")]
    ExpiredVerificationToken,

    /// The user is logged in but does not have the treasurer role.
    #[error("only treasurers may do that")]
    Forbidden,

    /// An empty string was used to create a category name.
    #[error("Category name cannot be empty")]
    EmptyCategoryName,

    /// A category with the same name already exists.
    #[error("a category with that name already exists")]
    DuplicateCategoryName,

    /// The category name used for a transaction does not match a category.
    #[error("\"{0}\" is not a known category")]
    InvalidCategory(String),

    /// A transaction title was empty or too short after trimming.
    #[error("{0}")]
    InvalidTitle(String),

    /// A transaction amount of zero was given.
    #[error("Amount cannot be zero")]
    ZeroAmount,

    /// A positive amount was given for a category that only accepts expenses.
    #[error("Expenses must be entered as negative numbers. Did you mean -{0}?")]
    PositiveExpense(f64),

    /// An income amount was zero, negative, or over the upper limit.
    #[error("{0}")]
    InvalidAmount(String),

    /// The sponsor name was shorter than two characters after trimming.
    #[error("Sponsor name must be at least 2 characters long")]
    InvalidSponsorName,

    /// A date in the future was used for a record of money spent or received.
    ///
    /// Transactions and income record events that have already happened,
    /// therefore future dates are not allowed.
    #[error("{0} is a date in the future, which is not allowed")]
    FutureDate(Date),

    /// A budget period ends before it starts.
    #[error("the budget must start on or before its end date")]
    InvalidDateRange,

    /// A budget amount was negative.
    #[error("the budget amount cannot be negative")]
    NegativeBudget,

    /// A category already has a budget.
    #[error("that category already has a budget")]
    DuplicateBudget,

    /// A bulk request did not contain any transaction IDs.
    #[error("No transaction IDs provided")]
    NoTransactionIds,

    /// The multipart form could not be parsed.
    #[error("Could not parse multipart form: {0}")]
    MultipartError(String),

    /// The multipart form did not contain a CSV or Excel file.
    #[error("File is not a CSV or Excel (.xlsx) file")]
    UnsupportedImportFile,

    /// The uploaded file is over the size limit.
    #[error("File is larger than {0} MB")]
    FileTooLarge(usize),

    /// The CSV had issues that prevented it from being parsed.
    #[error("Could not parse the CSV file: {0}")]
    InvalidCSV(String),

    /// The uploaded Excel workbook could not be read.
    #[error("Could not read the Excel file: {0}")]
    InvalidSpreadsheet(String),

    /// An export file could not be written.
    ///
    /// Holds the name of the file and the underlying error message.
    #[error("could not write {0}: {1}")]
    ExportError(&'static str, String),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Tried to delete a transaction that does not exist
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// Tried to update a transaction that does not exist
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to delete a management fund that does not exist
    #[error("tried to delete a management fund that is not in the database")]
    DeleteMissingFund,

    /// Tried to update a management fund that does not exist
    #[error("tried to update a management fund that is not in the database")]
    UpdateMissingFund,

    /// Tried to delete a sponsor that does not exist
    #[error("tried to delete a sponsor that is not in the database")]
    DeleteMissingSponsor,

    /// Tried to update a sponsor that does not exist
    #[error("tried to update a sponsor that is not in the database")]
    UpdateMissingSponsor,

    /// Tried to update a category that does not exist
    #[error("tried to update a category that is not in the database")]
    UpdateMissingCategory,

    /// Tried to delete a category that does not exist
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// Tried to update a budget that does not exist
    #[error("tried to update a budget that is not in the database")]
    UpdateMissingBudget,

    /// Tried to delete a budget that does not exist
    #[error("tried to delete a budget that is not in the database")]
    DeleteMissingBudget,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("category.name") =>
            {
                Error::DuplicateCategoryName
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("budget.category_id") =>
            {
                Error::DuplicateBudget
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.username") =>
            {
                Error::DuplicateUsername
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => NotFoundError.into_response(),
            Error::Forbidden => (
                StatusCode::FORBIDDEN,
                error_view(
                    "Forbidden",
                    "403",
                    "Treasurers only.",
                    "Ask a treasurer if you need this page.",
                ),
            )
                .into_response(),
            Error::InvalidVerificationToken | Error::ExpiredVerificationToken => (
                StatusCode::BAD_REQUEST,
                error_view(
                    "Email Verification",
                    "400",
                    &capitalise(&self.to_string()),
                    "Register again to get a new verification link.",
                ),
            )
                .into_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Convert the error into an HTTP response with an HTML alert.
    pub fn into_alert_response(self) -> Response {
        let (status_code, alert) = match self {
            Error::InvalidTimezoneError(timezone) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::Error {
                    message: "Invalid Timezone Settings".to_owned(),
                    details: format!(
                        "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                    ),
                },
            ),
            Error::Forbidden => (
                StatusCode::FORBIDDEN,
                Alert::Error {
                    message: "Not allowed".to_owned(),
                    details: "Only treasurers may do that.".to_owned(),
                },
            ),
            Error::FutureDate(date) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid date".to_owned(),
                    details: format!(
                        "{date} is a date in the future, which is not allowed. \
                        Change the date to today or earlier."
                    ),
                },
            ),
            Error::InvalidCategory(name) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid category".to_owned(),
                    details: format!("Could not find a category called \"{name}\"."),
                },
            ),
            error @ (Error::InvalidTitle(_)
            | Error::ZeroAmount
            | Error::PositiveExpense(_)
            | Error::InvalidAmount(_)
            | Error::InvalidSponsorName
            | Error::InvalidEmail(_)
            | Error::InvalidDateRange
            | Error::NegativeBudget
            | Error::EmptyCategoryName
            | Error::NoTransactionIds) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid input".to_owned(),
                    details: error.to_string(),
                },
            ),
            Error::DuplicateCategoryName => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Duplicate Category Name".to_owned(),
                    details: "That category already exists. \
                        Choose a different name, or edit the existing category."
                        .to_owned(),
                },
            ),
            Error::DuplicateBudget => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Duplicate Budget".to_owned(),
                    details: "That category already has a budget. \
                        Edit the existing budget instead."
                        .to_owned(),
                },
            ),
            Error::UpdateMissingTransaction => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not update transaction".to_owned(),
                    details: "The transaction could not be found.".to_owned(),
                },
            ),
            Error::DeleteMissingTransaction => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not delete transaction".to_owned(),
                    details: "The transaction could not be found. \
                    Try refreshing the page to see if the transaction has already been deleted."
                        .to_owned(),
                },
            ),
            Error::UpdateMissingFund => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not update management fund".to_owned(),
                    details: "The management fund could not be found.".to_owned(),
                },
            ),
            Error::DeleteMissingFund => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not delete management fund".to_owned(),
                    details: "The management fund could not be found. \
                    Try refreshing the page to see if it has already been deleted."
                        .to_owned(),
                },
            ),
            Error::UpdateMissingSponsor => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not update sponsor".to_owned(),
                    details: "The sponsor could not be found.".to_owned(),
                },
            ),
            Error::DeleteMissingSponsor => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not delete sponsor".to_owned(),
                    details: "The sponsor could not be found. \
                    Try refreshing the page to see if the sponsor has already been deleted."
                        .to_owned(),
                },
            ),
            Error::UpdateMissingCategory => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not update category".to_owned(),
                    details: "The category could not be found.".to_owned(),
                },
            ),
            Error::DeleteMissingCategory => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not delete category".to_owned(),
                    details: "The category could not be found. \
                    Try refreshing the page to see if the category has already been deleted."
                        .to_owned(),
                },
            ),
            Error::UpdateMissingBudget => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not update budget".to_owned(),
                    details: "The budget could not be found.".to_owned(),
                },
            ),
            Error::DeleteMissingBudget => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not delete budget".to_owned(),
                    details: "The budget could not be found. \
                    Try refreshing the page to see if the budget has already been deleted."
                        .to_owned(),
                },
            ),
            Error::UnsupportedImportFile => (
                StatusCode::BAD_REQUEST,
                Alert::ErrorSimple {
                    message: "File type must be CSV or Excel (.xlsx).".to_owned(),
                },
            ),
            error @ (Error::FileTooLarge(_)
            | Error::InvalidCSV(_)
            | Error::InvalidSpreadsheet(_)
            | Error::MultipartError(_)) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Import failed".to_owned(),
                    details: error.to_string(),
                },
            ),
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                Alert::ErrorSimple {
                    message: "The requested item could not be found.".to_owned(),
                },
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::Error {
                    message: "Something went wrong".to_owned(),
                    details:
                        "An unexpected error occurred, check the server logs for more details."
                            .to_owned(),
                },
            ),
        };

        (status_code, alert.into_html()).into_response()
    }
}

fn capitalise(text: &str) -> String {
    let mut chars = text.chars();

    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

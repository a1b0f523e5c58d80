//! The page shown when a request fails for reasons the user cannot fix.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::html::error_view;

/// A 500 page with a description of what went wrong and a suggested fix.
pub struct InternalServerError<'a> {
    pub description: &'a str,
    pub fix: &'a str,
}

impl Default for InternalServerError<'_> {
    fn default() -> Self {
        Self {
            description: "Sorry, something went wrong.",
            fix: "Try again later or ask a treasurer to check the server logs",
        }
    }
}

impl IntoResponse for InternalServerError<'_> {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_view("Internal Server Error", "500", self.description, self.fix),
        )
            .into_response()
    }
}

/// Render the generic 500 page, e.g. after an htmx redirect from a failed form.
pub async fn get_internal_server_error_page() -> Response {
    InternalServerError::default().into_response()
}

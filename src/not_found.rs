//! The 404 page and the fallback handler that serves it.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::html::error_view;

/// Marker type that renders the 404 page.
pub struct NotFoundError;

impl IntoResponse for NotFoundError {
    fn into_response(self) -> Response {
        (
            StatusCode::NOT_FOUND,
            error_view(
                "Not Found",
                "404",
                "Page not found.",
                "Check the address, or head back to the dashboard.",
            ),
        )
            .into_response()
    }
}

/// Fallback route handler for paths that do not match any route.
pub async fn get_404_not_found() -> Response {
    NotFoundError.into_response()
}

#[cfg(test)]
mod not_found_tests {
    use axum::http::StatusCode;

    use crate::test_utils::{assert_valid_html, parse_html_document};

    use super::get_404_not_found;

    #[tokio::test]
    async fn renders_404_page() {
        let response = get_404_not_found().await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
    }
}

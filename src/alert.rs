//! Alert system for displaying success and error messages to users.
//!
//! Alerts are swapped into the `#alert-container` element of the base page,
//! either as the target of a failed htmx request or as the body of a
//! successful one.

use axum::response::{IntoResponse, Response};
use maud::{Markup, html};

/// An alert message for the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// A success message with extra details.
    Success { message: String, details: String },
    /// A success message on its own.
    SuccessSimple { message: String },
    /// An error message with details on how to fix it.
    Error { message: String, details: String },
    /// An error message on its own.
    ErrorSimple { message: String },
}

impl Alert {
    /// Render the alert as an out-of-band swap for the alert container.
    pub fn into_html(self) -> Markup {
        let (is_success, message, details) = match self {
            Alert::Success { message, details } => (true, message, details),
            Alert::SuccessSimple { message } => (true, message, String::new()),
            Alert::Error { message, details } => (false, message, details),
            Alert::ErrorSimple { message } => (false, message, String::new()),
        };

        let container_style = if is_success {
            "flex p-4 mb-4 rounded-lg border text-green-800 bg-green-50 \
            border-green-300 dark:bg-gray-800 dark:text-green-400 dark:border-green-800"
        } else {
            "flex p-4 mb-4 rounded-lg border text-red-800 bg-red-50 \
            border-red-300 dark:bg-gray-800 dark:text-red-400 dark:border-red-800"
        };

        html! {
            div
                id="alert-container"
                hx-swap-oob="true"
                class="w-full max-w-md px-4"
                style="position: fixed; bottom: 1rem; left: 50%; transform: translateX(-50%); z-index: 9999;"
            {
                div class=(container_style) role="alert"
                {
                    div class="flex-1"
                    {
                        p class="text-sm font-medium" { (message) }

                        @if !details.is_empty() {
                            p class="mt-1 text-sm" { (details) }
                        }
                    }

                    button
                        type="button"
                        class="ms-3 -my-1.5 rounded-lg p-1.5 inline-flex items-center justify-center h-8 w-8"
                        aria-label="Close"
                        onclick="this.closest('#alert-container').classList.add('hidden')"
                    {
                        "✕"
                    }
                }
            }
        }
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        self.into_html().into_response()
    }
}

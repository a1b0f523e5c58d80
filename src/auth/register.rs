//! The registration page where new members create an account.
//!
//! New accounts are members with an unverified email address. The
//! verification link is written to the server log since email delivery is
//! handled outside of this app.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    AppState, Error, PasswordHash, ValidatedPassword,
    auth::{
        Role, create_user, email_verification::create_verification, normalize_email,
        validate_username,
    },
    endpoints,
    html::{
        FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE, base, link, loading_spinner,
        log_in_register, password_input,
    },
};

/// The minimum number of characters the password should have to be considered valid on the client side (server-side validation is done on top of this validation).
const PASSWORD_INPUT_MIN_LENGTH: u8 = 8;

/// Error messages to show next to each field of the registration form.
#[derive(Debug, Default)]
struct RegistrationErrors<'a> {
    username: Option<&'a str>,
    email: Option<&'a str>,
    password: Option<&'a str>,
    confirm_password: Option<&'a str>,
}

fn error_message(message: Option<&str>) -> Markup {
    html! {
        @if let Some(message) = message
        {
            p class="text-red-500 text-base" { (message) }
        }
    }
}

pub fn confirm_password_input(min_length: u8, error_message: Option<&str>) -> Markup {
    html! {
        div
        {
            label
                for="confirm-password"
                class=(FORM_LABEL_STYLE)
            {
                "Confirm Password"
            }

            input
                type="password"
                name="confirm_password"
                id="confirm-password"
                placeholder="••••••••"
                class=(FORM_TEXT_INPUT_STYLE)
                required
                minlength=(min_length)
                autofocus[error_message.is_some()]
            ;

            @if let Some(error_message) = error_message
            {
                p class="text-red-500 text-base" { (error_message) }
            }
        }

    }
}

fn registration_form(username: &str, email: &str, errors: RegistrationErrors) -> Markup {
    html! {
        form
            hx-post=(endpoints::REGISTER_API)
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            hx-disabled-elt="#username, #email, #password, #confirm-password, #submit-button"
            hx-target-error="#alert-container"
            class="space-y-4 md:space-y-6"
        {
            div
            {
                label for="username" class=(FORM_LABEL_STYLE) { "Username" }

                input
                    type="text"
                    name="username"
                    id="username"
                    autocomplete="username"
                    class=(FORM_TEXT_INPUT_STYLE)
                    required
                    value=(username);

                (error_message(errors.username))
            }

            div
            {
                label for="email" class=(FORM_LABEL_STYLE) { "Email" }

                input
                    type="email"
                    name="email"
                    id="email"
                    autocomplete="email"
                    class=(FORM_TEXT_INPUT_STYLE)
                    required
                    value=(email);

                (error_message(errors.email))
            }

            (password_input("", PASSWORD_INPUT_MIN_LENGTH, errors.password))
            (confirm_password_input(PASSWORD_INPUT_MIN_LENGTH, errors.confirm_password))

            button
                type="submit" id="submit-button" tabindex="0"
                class="w-full px-4 py-2 bg-blue-500 dark:bg-blue-600 disabled:bg-blue-700
                    hover:enabled:bg-blue-600 hover:enabled:dark:bg-blue-700 text-white rounded"
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Create Account"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "

                a href=(endpoints::LOG_IN_VIEW) tabindex="0" class=(LINK_STYLE)
                {
                  "Log in here"
                }
            }
        }
    }
}

fn registration_complete(email: &str) -> Markup {
    html! {
        div class="space-y-4 text-gray-900 dark:text-white"
        {
            p
            {
                "We sent a verification link to " strong { (email) } ". "
                "Follow the link to confirm your email address, then you can log in."
            }

            p class="text-sm text-gray-500 dark:text-gray-400"
            {
                "Already verified? " (link(endpoints::LOG_IN_VIEW, "Log in here"))
            }
        }
    }
}

/// Display the registration page.
pub async fn get_register_page() -> Response {
    let registration_form = registration_form("", "", RegistrationErrors::default());
    let content = log_in_register("Create an account", &registration_form);
    base("Register", &[], &content).into_response()
}

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Create a member account and start email verification.
///
/// Validation problems are shown next to the offending field.
pub async fn register_user(
    State(state): State<RegistrationState>,
    Form(user_data): Form<RegisterForm>,
) -> Response {
    let render_error = |errors: RegistrationErrors| {
        registration_form(&user_data.username, &user_data.email, errors).into_response()
    };

    let username = match validate_username(&user_data.username) {
        Ok(username) => username,
        Err(error) => {
            return render_error(RegistrationErrors {
                username: Some(&error.to_string()),
                ..Default::default()
            });
        }
    };

    let email = match normalize_email(&user_data.email) {
        Ok(email) => email,
        Err(error) => {
            return render_error(RegistrationErrors {
                email: Some(&error.to_string()),
                ..Default::default()
            });
        }
    };

    let validated_password = match ValidatedPassword::for_account(
        &user_data.password,
        &user_data.confirm_password,
        &username,
        &email,
    ) {
        Ok(password) => password,
        Err(error @ Error::PasswordMismatch) => {
            return render_error(RegistrationErrors {
                confirm_password: Some(&error.to_string()),
                ..Default::default()
            });
        }
        Err(error) => {
            return render_error(RegistrationErrors {
                password: Some(&error.to_string()),
                ..Default::default()
            });
        }
    };

    let password_hash = match PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST) {
        Ok(hash) => hash,
        Err(error) => {
            tracing::error!("an error occurred while hashing a password: {error}");
            return error.into_alert_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let user = match create_user(&username, &email, password_hash, Role::Member, &connection) {
        Ok(user) => user,
        Err(Error::DuplicateUsername) => {
            return render_error(RegistrationErrors {
                username: Some(&Error::DuplicateUsername.to_string()),
                ..Default::default()
            });
        }
        Err(Error::DuplicateEmail) => {
            return render_error(RegistrationErrors {
                email: Some(&Error::DuplicateEmail.to_string()),
                ..Default::default()
            });
        }
        Err(error) => {
            tracing::error!("An unhandled error occurred while inserting a new user: {error}");
            return error.into_alert_response();
        }
    };

    let token = match create_verification(user.id, OffsetDateTime::now_utc(), &connection) {
        Ok(token) => token,
        Err(error) => {
            tracing::error!("Could not create email verification for {}: {error}", user.id);
            return error.into_alert_response();
        }
    };

    tracing::info!("Registered member {} ({})", user.username, user.email);
    tracing::info!(
        "Email verification link for {}: {}?token={token}",
        user.email,
        endpoints::VERIFY_EMAIL
    );

    registration_complete(&user.email).into_response()
}

#[cfg(test)]
mod get_register_page_tests {
    use axum::http::StatusCode;
    use scraper::Selector;

    use crate::{
        endpoints,
        test_utils::{
            assert_content_type, assert_form_input, assert_form_submit_button,
            assert_hx_endpoint, assert_valid_html, must_get_form, parse_html_document,
        },
    };

    use super::get_register_page;

    #[tokio::test]
    async fn render_register_page() {
        let response = get_register_page().await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_content_type(&response, "text/html; charset=utf-8");

        let document = parse_html_document(response).await;
        assert_valid_html(&document);

        let h1_selector = Selector::parse("h1").unwrap();
        let title = document
            .select(&h1_selector)
            .next()
            .expect("No h1 found")
            .text()
            .collect::<String>();
        assert_eq!(title.trim().to_lowercase(), "create an account");

        let form = must_get_form(&document);
        assert_hx_endpoint(&form, endpoints::REGISTER_API, "hx-post");
        assert_form_input(&form, "username", "text");
        assert_form_input(&form, "email", "email");
        assert_form_input(&form, "password", "password");
        assert_form_input(&form, "confirm_password", "password");
        assert_form_submit_button(&form);

        let links = form
            .select(&Selector::parse("a[href]").unwrap())
            .collect::<Vec<_>>();
        assert_eq!(links.len(), 1, "want 1 link, got {}", links.len());
        assert_eq!(links[0].value().attr("href"), Some(endpoints::LOG_IN_VIEW));
    }
}

#[cfg(test)]
mod register_user_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Form, extract::State, http::StatusCode};
    use rusqlite::Connection;
    use scraper::Selector;

    use crate::{
        PasswordHash,
        auth::{Role, create_user, get_user_by_username},
        db::initialize,
        test_utils::parse_html_fragment,
    };

    use super::{RegisterForm, RegistrationState, register_user};

    const STRONG_PASSWORD: &str = "correct horse battery staple";

    fn get_state() -> RegistrationState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        RegistrationState {
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    fn form(username: &str, email: &str, password: &str, confirm_password: &str) -> RegisterForm {
        RegisterForm {
            username: username.to_owned(),
            email: email.to_owned(),
            password: password.to_owned(),
            confirm_password: confirm_password.to_owned(),
        }
    }

    async fn get_error_messages(response: axum::response::Response) -> Vec<String> {
        let fragment = parse_html_fragment(response).await;
        let selector = Selector::parse("p.text-red-500").unwrap();

        fragment
            .select(&selector)
            .map(|element| element.text().collect::<String>().trim().to_owned())
            .collect()
    }

    #[tokio::test]
    async fn creates_unverified_member() {
        let state = get_state();

        let response = register_user(
            State(state.clone()),
            Form(form(
                "asha",
                "Asha@Example.com",
                STRONG_PASSWORD,
                STRONG_PASSWORD,
            )),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let connection = state.db_connection.lock().unwrap();
        let user = get_user_by_username("asha", &connection).unwrap();
        assert_eq!(user.role, Role::Member);
        assert_eq!(user.email, "asha@example.com");
        assert!(!user.email_verified);

        let verification_count: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM email_verification WHERE user_id = ?1",
                (user.id.as_i64(),),
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(verification_count, 1);
    }

    #[tokio::test]
    async fn rejects_invalid_username() {
        let response = register_user(
            State(get_state()),
            Form(form("a!", "a@example.com", STRONG_PASSWORD, STRONG_PASSWORD)),
        )
        .await;

        let errors = get_error_messages(response).await;
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("invalid username"), "{errors:?}");
    }

    #[tokio::test]
    async fn rejects_email_without_at_sign() {
        let response = register_user(
            State(get_state()),
            Form(form("asha", "asha.example.com", STRONG_PASSWORD, STRONG_PASSWORD)),
        )
        .await;

        let errors = get_error_messages(response).await;
        assert_eq!(errors, vec!["\"asha.example.com\" is not a valid email address"]);
    }

    #[tokio::test]
    async fn rejects_weak_password() {
        let response = register_user(
            State(get_state()),
            Form(form("asha", "asha@example.com", "password", "password")),
        )
        .await;

        let errors = get_error_messages(response).await;
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("password is too weak"), "{errors:?}");
    }

    #[tokio::test]
    async fn rejects_mismatched_passwords() {
        let response = register_user(
            State(get_state()),
            Form(form(
                "asha",
                "asha@example.com",
                STRONG_PASSWORD,
                "correct horse battery stable",
            )),
        )
        .await;

        let errors = get_error_messages(response).await;
        assert_eq!(errors, vec!["passwords do not match"]);
    }

    #[tokio::test]
    async fn rejects_duplicate_username() {
        let state = get_state();
        create_user(
            "asha",
            "first@example.com",
            PasswordHash::new_unchecked("hunter2"),
            Role::Member,
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();

        let response = register_user(
            State(state),
            Form(form(
                "asha",
                "second@example.com",
                STRONG_PASSWORD,
                STRONG_PASSWORD,
            )),
        )
        .await;

        let errors = get_error_messages(response).await;
        assert_eq!(errors, vec!["that username is already taken"]);
    }
}

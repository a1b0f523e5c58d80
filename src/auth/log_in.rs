//! This file defines the routes for displaying the log-in page and handling log-in requests.
//! The auth module handles the lower level authentication and cookie auth logic.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{
    AppState, Error,
    audit::client_ip,
    auth::{
        get_user_by_username, invalidate_auth_cookie,
        login_attempt::{is_rate_limited, record_login_attempt},
        normalize_redirect_url, set_auth_cookie,
    },
    endpoints,
    html::{
        FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE, base, loading_spinner,
        log_in_register, password_input,
    },
    timezone::get_local_offset,
};

fn log_in_form(username: &str, error_message: Option<&str>, redirect_url: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            hx-disabled-elt="#username, #password, #submit-button"
            hx-target-error="#alert-container"
            class="space-y-4 md:space-y-6"
        {
            @if let Some(redirect_url) = redirect_url {
                input type="hidden" name="redirect_url" value=(redirect_url);
            }

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
            }

            (password_input("", 0, error_message))

            div class="flex items-center gap-x-3"
            {
                input
                    type="checkbox"
                    name="remember_me"
                    id="remember_me"
                    tabindex="0"
                    class="rounded-xs";

                label
                    for="remember_me"
                    class="block text-sm font-medium text-gray-900 dark:text-white"
                {
                    "Keep me logged in for one week"
                }
            }

            button
                type="submit" id="submit-button" tabindex="0"
                class="w-full px-4 py-2 bg-blue-500 dark:bg-blue-600 disabled:bg-blue-700
                    hover:enabled:bg-blue-600 hover:enabled:dark:bg-blue-700 text-white rounded"
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Log in"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400" {
                "Don't have an account? "
                a href=(endpoints::REGISTER_VIEW) tabindex="0" class=(LINK_STYLE)
                {
                  "Register here"
                }
            }
        }
    }
}

fn parse_redirect_url(raw_url: Option<&str>, source: &str) -> Option<String> {
    let redirect_url = raw_url.and_then(normalize_redirect_url);

    if let (None, Some(raw_url)) = (&redirect_url, raw_url) {
        tracing::warn!("Invalid redirect URL from {source}: {raw_url}");
    }

    redirect_url
}

/// Display the log-in page.
pub async fn get_log_in_page(Query(query): Query<RedirectQuery>) -> Response {
    let redirect_url = parse_redirect_url(query.redirect_url.as_deref(), "log-in query");
    let log_in_form = log_in_form("", None, redirect_url.as_deref());
    let content = log_in_register("Log in to your account", &log_in_form);
    base("Log In", &[], &content).into_response()
}

/// How long the auth cookie should last if the user selects "remember me" at log-in.
const REMEMBER_ME_COOKIE_DURATION: Duration = Duration::days(7);

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

pub const INVALID_CREDENTIALS_ERROR_MSG: &str = "Incorrect username or password.";
pub const EMAIL_NOT_VERIFIED_ERROR_MSG: &str =
    "Please confirm your email address using the link we sent you before logging in.";
pub const TOO_MANY_ATTEMPTS_ERROR_MSG: &str =
    "Too many failed log-in attempts. Wait five minutes and try again.";
const INTERNAL_ERROR_MSG: &str = "An internal error occurred. Please try again later.";

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in request, the auth cookie set and the client is redirected to the dashboard page.
/// Otherwise, the form is returned with an error message explaining the problem.
///
/// Every attempt is recorded against the client's IP address, and clients
/// with too many recent failures are refused without checking the password.
pub async fn post_log_in(
    State(state): State<LoginState>,
    headers: HeaderMap,
    jar: PrivateCookieJar,
    Form(user_data): Form<LogInData>,
) -> Response {
    let redirect_url = parse_redirect_url(user_data.redirect_url.as_deref(), "log-in form");
    let redirect_url = redirect_url.as_deref();
    let username = user_data.username.trim();
    let ip_address = client_ip(&headers);
    let now = OffsetDateTime::now_utc();

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match is_rate_limited(&ip_address, now, &connection) {
        Ok(false) => {}
        Ok(true) => {
            tracing::warn!("Refusing log in for {username} from rate limited IP {ip_address}");
            return log_in_form(username, Some(TOO_MANY_ATTEMPTS_ERROR_MSG), redirect_url)
                .into_response();
        }
        Err(error) => {
            tracing::error!("Could not check log-in rate limit: {error}");
            return log_in_form(username, Some(INTERNAL_ERROR_MSG), redirect_url).into_response();
        }
    }

    let check = check_credentials(username, &user_data.password, &connection);

    let success = check.is_ok();
    if let Err(error) = record_login_attempt(username, &ip_address, success, now, &connection) {
        tracing::error!("Could not record log-in attempt: {error}");
    }
    drop(connection);

    let user_id = match check {
        Ok(user_id) => user_id,
        Err(Error::InvalidCredentials) => {
            return log_in_form(username, Some(INVALID_CREDENTIALS_ERROR_MSG), redirect_url)
                .into_response();
        }
        Err(Error::EmailNotVerified) => {
            return log_in_form(username, Some(EMAIL_NOT_VERIFIED_ERROR_MSG), redirect_url)
                .into_response();
        }
        Err(error) => {
            tracing::error!("Unhandled error while verifying credentials: {error}");
            return log_in_form(username, Some(INTERNAL_ERROR_MSG), redirect_url).into_response();
        }
    };

    let cookie_duration = if user_data.remember_me.is_some() {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_duration
    };

    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        return Error::InvalidTimezoneError(state.local_timezone).into_response();
    };

    let redirect_url = redirect_url.unwrap_or(endpoints::DASHBOARD_VIEW);

    set_auth_cookie(jar.clone(), user_id, cookie_duration, local_offset)
        .map(|updated_jar| {
            (
                StatusCode::SEE_OTHER,
                HxRedirect(redirect_url.to_owned()),
                updated_jar,
            )
        })
        .map_err(|err| {
            tracing::error!("Error setting auth cookie: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
                invalidate_auth_cookie(jar),
            )
        })
        .into_response()
}

/// Check the username and password, and that the user may log in.
fn check_credentials(
    username: &str,
    password: &str,
    connection: &Connection,
) -> Result<crate::auth::UserID, Error> {
    let user = match get_user_by_username(username, connection) {
        Ok(user) => user,
        Err(Error::NotFound) => return Err(Error::InvalidCredentials),
        Err(error) => return Err(error),
    };

    let is_password_valid = user.password_hash.verify(password)?;

    if !is_password_valid {
        return Err(Error::InvalidCredentials);
    }

    if !user.email_verified {
        return Err(Error::EmailNotVerified);
    }

    Ok(user.id)
}

#[derive(Deserialize)]
pub struct RedirectQuery {
    pub redirect_url: Option<String>,
}

/// The raw data entered by the user in the log-in form.
///
/// The password is stored as a plain string. There is no need for validation here since
/// it will be compared against the password in the database, which has been verified.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    /// The username entered during log-in.
    pub username: String,

    /// Password entered during log-in.
    pub password: String,

    /// Whether to extend the initial auth cookie duration.
    ///
    /// This value comes from a checkbox, so it either has a string value or is not set.
    /// The `Some` variant should be interpreted as `true` irregardless of the
    /// string value, and the `None` variant should be interpreted as `false`.
    pub remember_me: Option<String>,

    /// Optional URL to redirect to after logging in.
    /// Only accepted from the log-in form submission.
    pub redirect_url: Option<String>,
}

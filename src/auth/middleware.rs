//! Authentication middleware that validates cookies, extends sessions, and handles redirects,
//! and authorization middleware that restricts routes to treasurers.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use time::Duration;

use crate::{
    AppState, Error,
    auth::{
        UserID,
        cookie::{extend_auth_cookie_duration_if_needed, get_token_from_cookies},
        get_user_by_id,
        redirect::{build_log_in_redirect_url, log_in_url_with_target},
    },
    endpoints,
    timezone::get_local_offset,
};

/// How long a session is kept alive after each authenticated request.
const SESSION_EXTENSION: Duration = Duration::minutes(5);

/// The state needed for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            local_timezone: state.local_timezone.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Checks for a valid session cookie.
///
/// The user ID is placed into the request extensions if the cookie is valid,
/// otherwise the response from `get_redirect` is returned.
#[inline]
async fn auth_guard_internal(
    state: AuthState,
    request: Request,
    next: Next,
    get_redirect: impl Fn(&str) -> Response,
) -> Response {
    let log_in_redirect_url = build_log_in_redirect_url(&request).unwrap_or_else(|| {
        log_in_url_with_target(endpoints::DASHBOARD_VIEW)
            .unwrap_or_else(|| endpoints::LOG_IN_VIEW.to_owned())
    });
    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        tracing::error!("Error getting local timezone. Redirecting to log in page.");
        return get_redirect(&log_in_redirect_url);
    };

    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(err) => {
            tracing::error!("Error getting cookie jar: {err:?}. Redirecting to log in page.");
            return get_redirect(&log_in_redirect_url);
        }
    };
    let user_id = match get_token_from_cookies(&jar) {
        Ok(token) => token.user_id,
        Err(_) => return get_redirect(&log_in_redirect_url),
    };

    parts.extensions.insert(user_id);
    let response = next.run(Request::from_parts(parts, body)).await;

    let (mut parts, body) = response.into_parts();
    let jar = extend_auth_cookie_duration_if_needed(jar.clone(), SESSION_EXTENSION, local_offset)
        .unwrap_or_else(|err| {
            tracing::error!("Error extending cookie duration: {err:?}. Rolling back cookie jar.");
            jar
        });
    for (key, val) in jar.into_response().headers().iter() {
        if key == SET_COOKIE {
            parts.headers.append(key, val.to_owned());
        }
    }

    Response::from_parts(parts, body)
}

/// Middleware function that checks for a valid authorization cookie.
/// The user ID is placed into request and then the request executed normally if the cookie is valid, otherwise a redirect to the log-in page is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>` to receive the user ID.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        Redirect::to(redirect_url).into_response()
    })
    .await
}

/// Like [auth_guard], but responds with an HTMX redirect for requests made
/// from htmx forms and buttons.
pub async fn auth_guard_hx(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        (HxRedirect(redirect_url.to_owned()), StatusCode::OK).into_response()
    })
    .await
}

/// The state needed to check a user's role.
#[derive(Debug, Clone)]
pub struct RoleGuardState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RoleGuardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Whether the logged in user of `request` is a treasurer.
///
/// Must run inside [auth_guard] or [auth_guard_hx], which provide the user ID.
fn is_treasurer_request(state: &RoleGuardState, request: &Request) -> Result<bool, Error> {
    let Some(user_id) = request.extensions().get::<UserID>().copied() else {
        tracing::error!(
            "treasurer guard ran without a user ID for {}, is the auth guard missing?",
            request.uri()
        );
        return Ok(false);
    };

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    match get_user_by_id(user_id, &connection) {
        Ok(user) => Ok(user.is_treasurer()),
        Err(Error::NotFound) => Ok(false),
        Err(error) => Err(error),
    }
}

/// Middleware that only lets treasurers through, rendering a 403 page for
/// everyone else.
pub async fn treasurer_guard(
    State(state): State<RoleGuardState>,
    request: Request,
    next: Next,
) -> Response {
    match is_treasurer_request(&state, &request) {
        Ok(true) => next.run(request).await,
        Ok(false) => Error::Forbidden.into_response(),
        Err(error) => error.into_response(),
    }
}

/// Like [treasurer_guard], but responds with an alert for htmx requests.
pub async fn treasurer_guard_hx(
    State(state): State<RoleGuardState>,
    request: Request,
    next: Next,
) -> Response {
    match is_treasurer_request(&state, &request) {
        Ok(true) => next.run(request).await,
        Ok(false) => Error::Forbidden.into_alert_response(),
        Err(error) => error.into_alert_response(),
    }
}

#[cfg(test)]
mod auth_guard_tests {
    use axum::{
        Router,
        extract::State,
        middleware,
        response::Html,
        routing::{get, post},
    };
    use axum_extra::extract::{
        PrivateCookieJar,
        cookie::{Cookie, SameSite},
    };
    use axum_test::TestServer;
    use time::{Duration, OffsetDateTime};

    use crate::{
        Error,
        app_state::create_cookie_key,
        auth::{
            AuthState, COOKIE_TOKEN, DEFAULT_COOKIE_DURATION, UserID, auth_guard, auth_guard_hx,
            set_auth_cookie,
        },
        endpoints,
        timezone::get_local_offset,
    };

    async fn test_handler() -> Html<&'static str> {
        Html("<h1>Hello, World!</h1>")
    }

    async fn stub_log_in_route(
        State(state): State<AuthState>,
        jar: PrivateCookieJar,
    ) -> Result<PrivateCookieJar, Error> {
        let local_timezone = get_local_offset(&state.local_timezone).unwrap();

        set_auth_cookie(jar, UserID::new(1), state.cookie_duration, local_timezone)
    }

    const TEST_LOG_IN_ROUTE: &str = "/test_log_in";
    const TEST_PROTECTED_ROUTE: &str = "/protected";
    const TEST_API_ROUTE: &str = "/api/protected";

    fn get_test_state(cookie_duration: Duration) -> AuthState {
        AuthState {
            cookie_key: create_cookie_key("nafstenoas"),
            cookie_duration,
            local_timezone: "Etc/UTC".to_owned(),
        }
    }

    fn get_test_server(cookie_duration: Duration) -> TestServer {
        let state = get_test_state(cookie_duration);
        let app = Router::new()
            .route(TEST_PROTECTED_ROUTE, get(test_handler))
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard))
            .route(TEST_LOG_IN_ROUTE, post(stub_log_in_route))
            .with_state(state);

        TestServer::new(app)
    }

    fn get_test_server_hx() -> TestServer {
        let state = get_test_state(DEFAULT_COOKIE_DURATION);
        let app = Router::new()
            .route(TEST_API_ROUTE, get(test_handler))
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx))
            .with_state(state);

        TestServer::new(app)
    }

    fn expected_log_in_location(target: &str) -> String {
        let query = serde_urlencoded::to_string([("redirect_url", target)]).unwrap();
        format!("{}?{}", endpoints::LOG_IN_VIEW, query)
    }

    #[track_caller]
    fn assert_date_time_close(left: OffsetDateTime, right: OffsetDateTime) {
        assert!(
            (left - right).abs() < Duration::seconds(1),
            "got date time {left:?}, want {right:?}"
        );
    }

    #[tokio::test]
    async fn get_protected_route_with_valid_cookie() {
        let server = get_test_server(DEFAULT_COOKIE_DURATION);
        let response = server.post(TEST_LOG_IN_ROUTE).await;
        response.assert_status_ok();
        let token_cookie = response.cookie(COOKIE_TOKEN);

        server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookie(token_cookie)
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn auth_guard_extends_valid_cookie_duration() {
        let server = get_test_server(Duration::seconds(5));
        let response = server.post(TEST_LOG_IN_ROUTE).await;
        response.assert_status_ok();
        let response_time = OffsetDateTime::now_utc();
        let jar = response.cookies();

        let response = server.get(TEST_PROTECTED_ROUTE).add_cookies(jar).await;

        let auth_cookie = response.cookie(COOKIE_TOKEN);
        assert_date_time_close(
            auth_cookie.expires_datetime().unwrap(),
            response_time + Duration::minutes(5),
        );
        assert_eq!(auth_cookie.secure(), Some(true));
        assert_eq!(auth_cookie.http_only(), Some(true));
        assert_eq!(auth_cookie.same_site(), Some(SameSite::Strict));
    }

    #[tokio::test]
    async fn get_protected_route_with_no_auth_cookie_redirects_to_log_in() {
        let server = get_test_server(DEFAULT_COOKIE_DURATION);

        let response = server.get(TEST_PROTECTED_ROUTE).await;

        response.assert_status_see_other();
        assert_eq!(
            response.header("location"),
            expected_log_in_location(TEST_PROTECTED_ROUTE)
        );
    }

    #[tokio::test]
    async fn get_protected_route_with_invalid_auth_cookie_redirects_to_log_in() {
        let server = get_test_server(DEFAULT_COOKIE_DURATION);

        let response = server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookie(Cookie::build((COOKIE_TOKEN, "FOOBAR")).build())
            .await;

        response.assert_status_see_other();
        assert_eq!(
            response.header("location"),
            expected_log_in_location(TEST_PROTECTED_ROUTE)
        );
    }

    #[tokio::test]
    async fn api_route_uses_hx_current_url_for_redirect() {
        let server = get_test_server_hx();
        let current_url = "/transactions?status=pending";

        let response = server
            .get(TEST_API_ROUTE)
            .add_header("HX-Request", "true")
            .add_header("HX-Current-URL", current_url)
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.header("hx-redirect"),
            expected_log_in_location(current_url)
        );
    }
}

//! Where to send a user after they log in.
//!
//! Only same-origin paths are accepted so that a crafted log-in link cannot
//! send the user to another site.

use axum::{extract::Request, http::Uri};

use crate::endpoints;

/// Pages that make no sense to return to after logging in.
const NON_RETURNABLE_PATHS: [&str; 3] = [
    endpoints::LOG_IN_VIEW,
    endpoints::REGISTER_VIEW,
    endpoints::VERIFY_EMAIL,
];

/// Reduce `raw_url` to a same-origin path and query, or `None` if it points
/// elsewhere or back at the authentication pages.
pub fn normalize_redirect_url(raw_url: &str) -> Option<String> {
    let uri = raw_url.parse::<Uri>().ok()?;
    if uri.scheme().is_some() || uri.authority().is_some() {
        return None;
    }

    same_origin_target(&uri)
}

/// Build the log-in URL that returns the user to where `request` was headed.
///
/// For `/api` requests made by htmx the page the user was looking at, taken
/// from the `HX-Current-URL` header, is used instead of the API route.
pub fn build_log_in_redirect_url(request: &Request) -> Option<String> {
    let target = if request.uri().path().starts_with("/api") {
        current_page_of_hx_request(request)?
    } else {
        same_origin_target(request.uri())?
    };

    log_in_url_with_target(&target)
}

/// The log-in URL with `target` as the `redirect_url` query parameter.
pub fn log_in_url_with_target(target: &str) -> Option<String> {
    serde_urlencoded::to_string([("redirect_url", target)])
        .inspect_err(|error| tracing::error!("Could not encode redirect URL {target}: {error}"))
        .ok()
        .map(|query| format!("{}?{query}", endpoints::LOG_IN_VIEW))
}

fn same_origin_target(uri: &Uri) -> Option<String> {
    let path_and_query = uri.path_and_query()?.as_str();

    if !path_and_query.starts_with('/') || path_and_query.starts_with("//") {
        return None;
    }

    if NON_RETURNABLE_PATHS.contains(&uri.path()) {
        return None;
    }

    Some(path_and_query.to_owned())
}

fn current_page_of_hx_request(request: &Request) -> Option<String> {
    let headers = request.headers();
    let is_hx_request = headers
        .get("hx-request")
        .and_then(|header| header.to_str().ok())
        .is_some_and(|header| header.eq_ignore_ascii_case("true"));

    if !is_hx_request {
        tracing::warn!("Missing HX-Request header for /api request.");
        return None;
    }

    let Some(current_url) = headers
        .get("hx-current-url")
        .and_then(|header| header.to_str().ok())
    else {
        tracing::warn!("Missing HX-Current-URL header for /api request.");
        return None;
    };

    // HX-Current-URL is absolute, so only the path and query are kept.
    let target = current_url
        .parse::<Uri>()
        .ok()
        .and_then(|uri| same_origin_target(&uri));

    if target.is_none() {
        tracing::warn!("Invalid HX-Current-URL header value: {current_url}");
    }

    target
}

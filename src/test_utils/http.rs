use axum::{body::Body, http::StatusCode, response::Response};

#[track_caller]
pub(crate) fn assert_status_ok(response: &Response<Body>) {
    assert_eq!(response.status(), StatusCode::OK);
}

/// The value of `header_name`, panicking if it is missing or not ASCII.
#[track_caller]
pub(crate) fn get_header(response: &Response<Body>, header_name: &str) -> String {
    response
        .headers()
        .get(header_name)
        .unwrap_or_else(|| panic!("Headers missing {header_name}"))
        .to_str()
        .unwrap_or_else(|error| panic!("Header {header_name} is not valid text: {error}"))
        .to_owned()
}

#[track_caller]
pub(crate) fn assert_content_type(response: &Response<Body>, content_type: &str) {
    assert_eq!(get_header(response, "content-type"), content_type);
}

#[track_caller]
pub(crate) fn assert_hx_redirect(response: &Response<Body>, endpoint: &str) {
    assert_eq!(get_header(response, "hx-redirect"), endpoint);
}

/// Check that `response` is a CSV file download called `file_name`.
#[track_caller]
pub(crate) fn assert_csv_download(response: &Response<Body>, file_name: &str) {
    assert_content_type(response, "text/csv; charset=utf-8");
    assert_eq!(
        get_header(response, "content-disposition"),
        format!("attachment; filename=\"{file_name}\"")
    );
}

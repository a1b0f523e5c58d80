use axum::{body::Body, response::Response};
use scraper::{Html, Selector};

/// The response body as text, panicking if it cannot be read.
pub(crate) async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Could not get response body");

    String::from_utf8_lossy(&bytes).into_owned()
}

pub(crate) async fn parse_html_document(response: Response<Body>) -> Html {
    Html::parse_document(&body_text(response).await)
}

/// Parse an htmx partial, e.g. an alert or a swapped table row.
pub(crate) async fn parse_html_fragment(response: Response<Body>) -> Html {
    Html::parse_fragment(&body_text(response).await)
}

#[track_caller]
pub(crate) fn assert_valid_html(html: &Html) {
    assert!(
        html.errors.is_empty(),
        "Got HTML parsing errors: {:?}",
        html.errors
    );
}

/// The trimmed text of every element matching `selector`, in document order.
#[track_caller]
pub(crate) fn select_text(html: &Html, selector: &str) -> Vec<String> {
    let selector = Selector::parse(selector)
        .unwrap_or_else(|error| panic!("invalid selector {selector:?}: {error}"));

    html.select(&selector)
        .map(|element| element.text().collect::<String>().trim().to_owned())
        .collect()
}

use scraper::{ElementRef, Html, Selector};

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|error| panic!("invalid selector {css:?}: {error}"))
}

#[track_caller]
pub(crate) fn must_get_form(html: &Html) -> ElementRef<'_> {
    html.select(&selector("form"))
        .next()
        .expect("No form found")
}

/// Check that `form` sends its data to `endpoint` with the htmx `attribute`,
/// e.g. `hx-post` or `hx-put`.
#[track_caller]
pub(crate) fn assert_hx_endpoint(form: &ElementRef<'_>, endpoint: &str, attribute: &str) {
    let got = form
        .value()
        .attr(attribute)
        .unwrap_or_else(|| panic!("{attribute} attribute missing"));

    assert_eq!(
        got, endpoint,
        "want form with attribute {attribute}=\"{endpoint}\", got {got:?}"
    );
}

/// Find the required input called `name` and check its type.
#[track_caller]
fn must_get_required_input<'a>(form: &ElementRef<'a>, name: &str, type_: &str) -> ElementRef<'a> {
    let input = form
        .select(&selector("input"))
        .find(|input| input.value().attr("name") == Some(name))
        .unwrap_or_else(|| panic!("No input found with name \"{name}\" and type \"{type_}\""));

    let got_type = input.value().attr("type").unwrap_or_default();
    assert_eq!(
        got_type, type_,
        "want input {name} with type \"{type_}\", got {got_type:?}"
    );
    assert!(
        input.value().attr("required").is_some(),
        "want input with name {name} to have the required attribute but got none"
    );

    input
}

#[track_caller]
pub(crate) fn assert_form_input(form: &ElementRef<'_>, name: &str, type_: &str) {
    must_get_required_input(form, name, type_);
}

#[track_caller]
pub(crate) fn assert_form_input_with_value(
    form: &ElementRef<'_>,
    name: &str,
    type_: &str,
    value: &str,
) {
    let input = must_get_required_input(form, name, type_);
    let got_value = input.value().attr("value").unwrap_or_default();

    assert_eq!(
        got_value, value,
        "want input {name} with value \"{value}\", got {got_value:?}"
    );
}

#[track_caller]
fn must_get_submit_button<'a>(form: &ElementRef<'a>) -> ElementRef<'a> {
    let button = form
        .select(&selector("button"))
        .next()
        .expect("No button found");

    assert_eq!(
        button.value().attr("type").unwrap_or_default(),
        "submit",
        "want submit button with type=\"submit\""
    );

    button
}

#[track_caller]
pub(crate) fn assert_form_submit_button(form: &ElementRef<'_>) {
    must_get_submit_button(form);
}

#[track_caller]
pub(crate) fn assert_form_submit_button_with_text(form: &ElementRef<'_>, text: &str) {
    let button = must_get_submit_button(form);
    let got_text = button.text().collect::<String>();

    assert_eq!(text, got_text.trim());
}

/// Check the first paragraph of `form`, which is where validation errors
/// are rendered.
#[track_caller]
pub(crate) fn assert_form_error_message(form: &ElementRef<'_>, want_error_message: &str) {
    let error_message = form
        .select(&selector("p"))
        .next()
        .expect("No error message found")
        .text()
        .collect::<String>();

    assert_eq!(want_error_message, error_message.trim());
}

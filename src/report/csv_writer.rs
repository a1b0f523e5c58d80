//! CSV versions of the transaction list and the finance summary.

use std::borrow::Cow;

use csv::Writer;

use crate::{
    Error,
    income::Sponsor,
    ledger::{DateRange, LedgerSummary},
    transaction::{Transaction, total_amount},
};

fn format_amount(amount: f64) -> String {
    format!("{amount:.2}")
}

/// Prefix text that a spreadsheet would evaluate as a formula with `'`.
///
/// Titles and names are typed in by members, and a cell such as
/// `=HYPERLINK(...)` would otherwise run when a treasurer opens the file.
pub fn escape_formula(text: &str) -> Cow<'_, str> {
    match text.chars().next() {
        Some('=' | '+' | '-' | '@' | '\t' | '\r') => Cow::Owned(format!("'{text}")),
        _ => Cow::Borrowed(text),
    }
}

fn csv_error(file_name: &'static str) -> impl Fn(csv::Error) -> Error {
    move |error| {
        tracing::error!("could not write {file_name}: {error}");
        Error::ExportError(file_name, error.to_string())
    }
}

fn finish(writer: Writer<Vec<u8>>, file_name: &'static str) -> Result<Vec<u8>, Error> {
    writer.into_inner().map_err(|error| {
        tracing::error!("could not write {file_name}: {error}");
        Error::ExportError(file_name, error.to_string())
    })
}

/// Write the approved transactions as CSV, followed by a row with their total.
pub fn write_transactions_csv(transactions: &[Transaction]) -> Result<Vec<u8>, Error> {
    let file_name = "transactions.csv";
    let mut writer = Writer::from_writer(Vec::new());

    writer
        .write_record(["Date", "Title", "Category", "Amount", "Submitted By"])
        .map_err(csv_error(file_name))?;

    for transaction in transactions {
        writer
            .write_record([
                transaction.date.to_string().as_str(),
                &*escape_formula(&transaction.title),
                &*escape_formula(&transaction.category),
                format_amount(transaction.amount).as_str(),
                &*escape_formula(transaction.submitted_by.as_deref().unwrap_or_default()),
            ])
            .map_err(csv_error(file_name))?;
    }

    writer
        .write_record([
            "",
            "",
            "TOTAL",
            format_amount(total_amount(transactions)).as_str(),
            format!("{} transactions", transactions.len()).as_str(),
        ])
        .map_err(csv_error(file_name))?;

    finish(writer, file_name)
}

/// Write the summary figures, spending per category and sponsors as CSV.
///
/// Every row has the columns Section, Name, Detail and Amount.
pub fn write_report_csv(
    range: DateRange,
    summary: &LedgerSummary,
    category_spending: &[(String, f64)],
    sponsors: &[Sponsor],
) -> Result<Vec<u8>, Error> {
    let file_name = "report.csv";
    let mut writer = Writer::from_writer(Vec::new());
    let period = |date: Option<time::Date>| date.map(|date| date.to_string()).unwrap_or_default();

    writer
        .write_record(["Section", "Name", "Detail", "Amount"])
        .map_err(csv_error(file_name))?;
    writer
        .write_record(["Period", "Start", period(range.start).as_str(), ""])
        .map_err(csv_error(file_name))?;
    writer
        .write_record(["Period", "End", period(range.end).as_str(), ""])
        .map_err(csv_error(file_name))?;

    for (name, amount) in summary.figures() {
        writer
            .write_record(["Summary", name, "", format_amount(amount).as_str()])
            .map_err(csv_error(file_name))?;
    }

    for (category, spent) in category_spending {
        writer
            .write_record([
                "Category Spending",
                &*escape_formula(category),
                "",
                format_amount(*spent).as_str(),
            ])
            .map_err(csv_error(file_name))?;
    }

    for sponsor in sponsors {
        writer
            .write_record([
                "Sponsor",
                &*escape_formula(&sponsor.name),
                sponsor.tier().label(),
                format_amount(sponsor.amount).as_str(),
            ])
            .map_err(csv_error(file_name))?;
    }

    finish(writer, file_name)
}

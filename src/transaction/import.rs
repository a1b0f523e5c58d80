//! Importing transactions from a CSV file or an Excel (.xlsx) workbook.
//!
//! The file must have the header `Date,Title,Category,Amount,SubmittedBy`,
//! where `SubmittedBy` is optional. Only the first sheet of a workbook is
//! read. Each row goes through the same checks as the transaction form and
//! valid rows are created unapproved. Rows that fail are reported back by
//! row number, counting the header as row 1.

use std::{
    io::Cursor,
    sync::{Arc, Mutex},
};

use axum::{
    Extension,
    extract::{FromRef, Multipart, State, multipart::Field},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use calamine::{Data, Reader, Xlsx};
use maud::{Markup, html};
use rusqlite::Connection;
use time::{Date, Duration, macros::date};

use crate::{
    AppState, Error,
    alert::Alert,
    audit::{AuditAction, NewAuditEntry, audit, client_ip},
    auth::{UserID, get_user_by_username},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, TABLE_STYLE, base, loading_spinner,
    },
    ledger::parse_date,
    navigation::{NavBar, get_viewer},
    timezone::local_today,
    transaction::{
        core::{TransactionBuilder, create_transaction},
        form::validate_transaction,
    },
};

/// The largest file accepted, in megabytes.
pub const MAX_IMPORT_FILE_SIZE_MB: usize = 5;

const EXPECTED_HEADER: [&str; 4] = ["date", "title", "category", "amount"];
const HEADER_HELP: &str = "the header must be Date,Title,Category,Amount,SubmittedBy";

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Day zero of Excel's date serial numbers, as used by Excel for Windows.
const EXCEL_EPOCH: Date = date!(1899 - 12 - 30);

/// The state needed for importing transactions.
#[derive(Debug, Clone)]
pub struct ImportState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for ImportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// A row that could not be imported.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

/// The outcome of an import.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImportReport {
    pub created: usize,
    pub errors: Vec<RowError>,
}

/// Renders the page for uploading a CSV or Excel file of transactions.
pub async fn get_import_page(
    State(state): State<ImportState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let viewer = get_viewer(user_id, &connection)?;
    let nav_bar = NavBar::new(endpoints::IMPORT_VIEW, viewer).into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-2xl space-y-6"
            {
                h1 class="text-xl font-bold" { "Import Transactions" }
                (import_form_view())

                div class="text-sm text-gray-600 dark:text-gray-400"
                {
                    p { "The first row of the file or first sheet must be the header:" }
                    pre class="mt-1 p-2 rounded bg-gray-100 dark:bg-gray-800"
                    {
                        "Date,Title,Category,Amount,SubmittedBy"
                    }
                    p class="mt-1"
                    {
                        "Dates use the YYYY-MM-DD format and expenses are negative. "
                        "SubmittedBy is a username and defaults to you. "
                        "Imported transactions wait for approval."
                    }
                }

                div id="import-report" {}
            }
        }
    };

    Ok(base("Import Transactions", &[], &content).into_response())
}

fn import_form_view() -> Markup {
    html! {
        form
            hx-post=(endpoints::IMPORT_API)
            enctype="multipart/form-data"
            hx-disabled-elt="#file, #submit-button"
            hx-indicator="#indicator"
            hx-target="#import-report"
            hx-target-error="#alert-container"
            class="space-y-4 md:space-y-6"
        {
            div
            {
                label for="file" class=(FORM_LABEL_STYLE) { "CSV or Excel file" }

                input
                    id="file"
                    type="file"
                    name="file"
                    accept={ ".csv,text/csv,.xlsx," (XLSX_CONTENT_TYPE) }
                    required
                    class=(FORM_TEXT_INPUT_STYLE);

                p class="mt-1 text-sm" { "At most " (MAX_IMPORT_FILE_SIZE_MB) " MB." }
            }

            button type="submit" id="submit-button" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator" { (loading_spinner()) }
                " Upload File"
            }
        }
    }
}

fn import_report_view(report: &ImportReport) -> Markup {
    html! {
        div class="space-y-4" data-import-report
        {
            p class="font-semibold" data-created=(report.created)
            {
                (report.created) " transaction(s) imported."
            }

            @if !report.errors.is_empty() {
                p class="text-red-600 dark:text-red-400" { (report.errors.len()) " row(s) had errors:" }

                table class=(TABLE_STYLE)
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Row" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Error" }
                        }
                    }

                    tbody
                    {
                        @for error in &report.errors {
                            tr class=(TABLE_ROW_STYLE) data-error-row
                            {
                                td class=(TABLE_CELL_STYLE) { (error.row) }
                                td class=(TABLE_CELL_STYLE) { (error.message) }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Route handler for uploading a CSV or Excel file of transactions.
pub async fn import_transactions_endpoint(
    State(state): State<ImportState>,
    Extension(user_id): Extension<UserID>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let start_time = std::time::Instant::now();

    let today = match local_today(&state.local_timezone) {
        Ok(today) => today,
        Err(error) => return error.into_alert_response(),
    };

    let upload = match multipart.next_field().await {
        Ok(Some(field)) => match read_upload(field).await {
            Ok(data) => data,
            Err(error) => return error.into_alert_response(),
        },
        Ok(None) => {
            return Error::MultipartError("no file was uploaded".to_owned()).into_alert_response();
        }
        Err(error) => {
            tracing::error!("Could not read multipart form: {error}");
            return Error::MultipartError(error.body_text()).into_alert_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let result = match &upload {
        Upload::Csv(csv_data) => import_csv(csv_data, user_id, today, &connection),
        Upload::Xlsx(xlsx_data) => import_xlsx(xlsx_data, user_id, today, &connection),
    };
    let report = match result {
        Ok(report) => report,
        Err(error @ (Error::InvalidCSV(_) | Error::InvalidSpreadsheet(_))) => {
            return error.into_alert_response();
        }
        Err(error) => {
            tracing::error!("Failed to import transactions: {error}");
            return error.into_alert_response();
        }
    };

    tracing::info!(
        "Imported {} transactions with {} row errors in {}ms",
        report.created,
        report.errors.len(),
        start_time.elapsed().as_millis()
    );

    audit(
        NewAuditEntry {
            user_id,
            action: AuditAction::ImportData,
            object_type: "Transaction",
            object_id: 0,
            description: format!(
                "Imported {} transaction(s) from {}, {} row(s) had errors",
                report.created,
                upload.label(),
                report.errors.len()
            ),
            ip_address: client_ip(&headers),
        },
        &connection,
    );

    let alert = if report.errors.is_empty() {
        Alert::SuccessSimple {
            message: format!("{} transaction(s) imported successfully.", report.created),
        }
    } else {
        Alert::Error {
            message: format!("{} row(s) had errors.", report.errors.len()),
            details: format!("{} transaction(s) were imported.", report.created),
        }
    };

    (
        StatusCode::CREATED,
        html! {
            (import_report_view(&report))
            (alert.into_html())
        },
    )
        .into_response()
}

/// The contents of an uploaded file.
#[derive(Debug)]
enum Upload {
    Csv(String),
    Xlsx(Vec<u8>),
}

impl Upload {
    fn label(&self) -> &'static str {
        match self {
            Upload::Csv(_) => "CSV",
            Upload::Xlsx(_) => "Excel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UploadKind {
    Csv,
    Xlsx,
}

/// Decide the file type from the file name, falling back to the content type.
fn upload_kind(file_name: Option<&str>, content_type: Option<&str>) -> Option<UploadKind> {
    let extension = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, extension)| extension.to_lowercase());

    match (extension.as_deref(), content_type) {
        (Some("csv"), _) => Some(UploadKind::Csv),
        (Some("xlsx"), _) => Some(UploadKind::Xlsx),
        (_, Some("text/csv")) => Some(UploadKind::Csv),
        (_, Some(XLSX_CONTENT_TYPE)) => Some(UploadKind::Xlsx),
        _ => None,
    }
}

async fn read_upload(field: Field<'_>) -> Result<Upload, Error> {
    let kind =
        upload_kind(field.file_name(), field.content_type()).ok_or(Error::UnsupportedImportFile)?;

    let file_name = field.file_name().unwrap_or("upload").to_owned();
    let data = match field.bytes().await {
        Ok(data) => data,
        Err(error) => {
            tracing::error!("Could not read data from multipart form field: {error}");
            return Err(Error::MultipartError(
                "Could not read data from multipart form field.".to_owned(),
            ));
        }
    };

    if data.len() > MAX_IMPORT_FILE_SIZE_MB * 1024 * 1024 {
        return Err(Error::FileTooLarge(MAX_IMPORT_FILE_SIZE_MB));
    }

    tracing::debug!("Received file '{}' that is {} bytes", file_name, data.len());

    match kind {
        UploadKind::Csv => String::from_utf8(data.to_vec())
            .map(Upload::Csv)
            .map_err(|_| Error::InvalidCSV("the file is not valid UTF-8 text".to_owned())),
        UploadKind::Xlsx => Ok(Upload::Xlsx(data.to_vec())),
    }
}

/// One row of an uploaded file, numbered from 1 at the header.
#[derive(Debug)]
struct UploadRow {
    number: usize,
    cells: Result<Vec<String>, String>,
}

fn header_matches(header: &[&str]) -> bool {
    header.len() >= EXPECTED_HEADER.len()
        && EXPECTED_HEADER
            .iter()
            .zip(header)
            .all(|(want, got)| got.trim().eq_ignore_ascii_case(want))
}

/// Create an unapproved transaction for each valid row of `csv_data`.
///
/// Rows with an empty first column are skipped. Rows that fail validation
/// are collected into the report instead of aborting the import. Every
/// transaction is created in a single database transaction.
///
/// # Errors
/// Returns [Error::InvalidCSV] if the header is missing or wrong, or an
/// [Error::SqlError] if a row could not be inserted.
pub fn import_csv(
    csv_data: &str,
    importer: UserID,
    today: Date,
    connection: &Connection,
) -> Result<ImportReport, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_data.as_bytes());

    let header = reader
        .headers()
        .map_err(|error| Error::InvalidCSV(error.to_string()))?;

    if !header_matches(&header.iter().collect::<Vec<_>>()) {
        return Err(Error::InvalidCSV(HEADER_HELP.to_owned()));
    }

    let rows = reader.records().enumerate().map(|(index, record)| UploadRow {
        number: index + 2,
        cells: record
            .map(|record| record.iter().map(str::to_owned).collect())
            .map_err(|error| error.to_string()),
    });

    import_rows(rows, importer, today, connection)
}

/// Create an unapproved transaction for each valid row of the first sheet
/// of the workbook in `xlsx_data`.
///
/// Rows are handled the same way as [import_csv]. Dates may be Excel dates
/// or `YYYY-MM-DD` text.
///
/// # Errors
/// Returns [Error::InvalidSpreadsheet] if the file is not a workbook or the
/// header is missing or wrong, or an [Error::SqlError] if a row could not be
/// inserted.
pub fn import_xlsx(
    xlsx_data: &[u8],
    importer: UserID,
    today: Date,
    connection: &Connection,
) -> Result<ImportReport, Error> {
    let invalid = |error: &dyn std::fmt::Display| Error::InvalidSpreadsheet(error.to_string());

    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(xlsx_data)).map_err(|error| invalid(&error))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| invalid(&"the workbook has no sheets"))?
        .map_err(|error| invalid(&error))?;

    let (first_row, first_column) = range.start().unwrap_or_default();
    let mut rows = range.rows().enumerate().map(|(index, row)| {
        let cells = std::iter::repeat_n(String::new(), first_column as usize)
            .chain(
                row.iter()
                    .enumerate()
                    .map(|(column, cell)| cell_text(first_column as usize + column, cell)),
            )
            .collect::<Vec<_>>();

        UploadRow {
            number: first_row as usize + index + 1,
            cells: Ok(cells),
        }
    });

    let header_is_valid = rows
        .next()
        .and_then(|header| header.cells.ok())
        .is_some_and(|header| {
            header_matches(&header.iter().map(String::as_str).collect::<Vec<_>>())
        });

    if !header_is_valid {
        return Err(invalid(&HEADER_HELP));
    }

    import_rows(rows, importer, today, connection)
}

/// The text of a cell, with dates in the first column as `YYYY-MM-DD`.
fn cell_text(column: usize, cell: &Data) -> String {
    let excel_date = |serial: f64| {
        EXCEL_EPOCH
            .checked_add(Duration::days(serial.floor() as i64))
            .map(|date| date.to_string())
    };

    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.trim().to_owned(),
        Data::DateTime(date_time) => {
            excel_date(date_time.as_f64()).unwrap_or_else(|| date_time.as_f64().to_string())
        }
        Data::DateTimeIso(text) => text.get(..10).unwrap_or(text).to_owned(),
        Data::Float(number) if column == 0 => {
            excel_date(*number).unwrap_or_else(|| number.to_string())
        }
        Data::Int(number) if column == 0 => {
            excel_date(*number as f64).unwrap_or_else(|| number.to_string())
        }
        other => other.to_string(),
    }
}

fn import_rows(
    rows: impl Iterator<Item = UploadRow>,
    importer: UserID,
    today: Date,
    connection: &Connection,
) -> Result<ImportReport, Error> {
    let transaction = connection.unchecked_transaction()?;
    let mut report = ImportReport::default();

    for UploadRow { number: row, cells } in rows {
        let cells = match cells {
            Ok(cells) => cells,
            Err(message) => {
                report.errors.push(RowError { row, message });
                continue;
            }
        };

        let field = |i: usize| cells.get(i).map(String::as_str).unwrap_or_default();

        if field(0).is_empty() {
            continue;
        }

        let builder = match parse_row(&cells, today, &transaction) {
            Ok(builder) => builder,
            Err(message) => {
                report.errors.push(RowError { row, message });
                continue;
            }
        };

        let created_by = match field(4) {
            "" => importer,
            username => get_user_by_username(username, &transaction)
                .map(|user| user.id)
                .unwrap_or(importer),
        };

        create_transaction(builder.created_by(Some(created_by)), &transaction)?;
        report.created += 1;
    }

    transaction.commit()?;

    Ok(report)
}

fn parse_row(
    cells: &[String],
    today: Date,
    connection: &Connection,
) -> Result<TransactionBuilder, String> {
    let field = |i: usize| cells.get(i).map(|cell| cell.trim()).unwrap_or_default();

    let date = parse_date(field(0))
        .ok_or_else(|| format!("Invalid date \"{}\", use YYYY-MM-DD", field(0)))?;

    if field(1).is_empty() || field(2).is_empty() {
        return Err("Missing title or category".to_owned());
    }

    let amount: f64 = field(3)
        .parse()
        .map_err(|_| format!("Amount \"{}\" is not a number", field(3)))?;

    validate_transaction(field(1), amount, field(2), date, today, connection)
        .map_err(|error| error.to_string())
}

//! File downloads of the ledger for treasurers: CSV, Excel, PDF and a ZIP
//! bundle of all of them.

use std::{
    io::{Cursor, Write},
    sync::{Arc, Mutex, MutexGuard},
};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::{
    AppState, Error,
    audit::{AuditAction, NewAuditEntry, audit, client_ip},
    auth::UserID,
    income::{Sponsor, SponsorOrder, get_sponsors},
    ledger::{DateRange, DateRangeQuery, LedgerSummary, get_ledger_summary, spending_by_category},
    transaction::{Transaction, get_approved_transactions},
};

use super::{
    csv_writer::{write_report_csv, write_transactions_csv},
    pdf_writer::write_report_pdf,
    xlsx_writer::write_transactions_xlsx,
};

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";
const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const PDF_CONTENT_TYPE: &str = "application/pdf";
const ZIP_CONTENT_TYPE: &str = "application/zip";

const BUNDLE_FILE_NAME: &str = "finance_export.zip";

/// The state needed for the exports.
#[derive(Debug, Clone)]
pub struct ExportState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ExportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn lock_connection(state: &ExportState) -> Result<MutexGuard<'_, Connection>, Error> {
    state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)
}

/// Everything the finance report shows for a date range.
struct ReportData {
    summary: LedgerSummary,
    category_spending: Vec<(String, f64)>,
    sponsors: Vec<Sponsor>,
    transactions: Vec<Transaction>,
}

impl ReportData {
    fn load(range: DateRange, connection: &Connection) -> Result<Self, Error> {
        Ok(Self {
            summary: get_ledger_summary(range, connection)
                .inspect_err(|error| tracing::error!("could not get ledger summary: {error}"))?,
            category_spending: spending_by_category(range, connection).inspect_err(|error| {
                tracing::error!("could not get spending by category: {error}")
            })?,
            sponsors: get_sponsors(range, SponsorOrder::LargestFirst, connection)
                .inspect_err(|error| tracing::error!("could not get sponsors: {error}"))?,
            transactions: load_transactions(range, connection)?,
        })
    }
}

fn load_transactions(range: DateRange, connection: &Connection) -> Result<Vec<Transaction>, Error> {
    get_approved_transactions(range, connection)
        .inspect_err(|error| tracing::error!("could not get approved transactions: {error}"))
}

fn record_export(
    user_id: UserID,
    file_name: &'static str,
    description: String,
    headers: &HeaderMap,
    connection: &Connection,
) {
    audit(
        NewAuditEntry {
            user_id,
            action: AuditAction::ExportData,
            object_type: file_name,
            object_id: 0,
            description,
            ip_address: client_ip(headers),
        },
        connection,
    );
}

fn download_response(file_name: &str, content_type: &'static str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response()
}

/// Pack the CSV, Excel and PDF exports into one ZIP archive.
fn write_bundle_zip(range: DateRange, data: &ReportData) -> Result<Vec<u8>, Error> {
    let files = [
        ("transactions.csv", write_transactions_csv(&data.transactions)?),
        ("transactions.xlsx", write_transactions_xlsx(&data.transactions)?),
        (
            "report.csv",
            write_report_csv(range, &data.summary, &data.category_spending, &data.sponsors)?,
        ),
        (
            "report.pdf",
            write_report_pdf(range, &data.summary, &data.sponsors, &data.transactions)?,
        ),
    ];

    let zip_error = |error: &dyn std::fmt::Display| {
        tracing::error!("could not write {BUNDLE_FILE_NAME}: {error}");
        Error::ExportError(BUNDLE_FILE_NAME, error.to_string())
    };

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (file_name, contents) in files {
        writer
            .start_file(file_name, options)
            .map_err(|error| zip_error(&error))?;
        writer
            .write_all(&contents)
            .map_err(|error| zip_error(&error))?;
    }

    writer
        .finish()
        .map(Cursor::into_inner)
        .map_err(|error| zip_error(&error))
}

/// Download the approved transactions in the requested date range as CSV.
pub async fn export_transactions_csv(
    State(state): State<ExportState>,
    Extension(user_id): Extension<UserID>,
    headers: HeaderMap,
    Query(query): Query<DateRangeQuery>,
) -> Result<Response, Error> {
    let range = query.to_range();
    let connection = lock_connection(&state)?;

    let transactions = load_transactions(range, &connection)?;
    let body = write_transactions_csv(&transactions)?;

    record_export(
        user_id,
        "transactions.csv",
        format!("Exported {} transactions", transactions.len()),
        &headers,
        &connection,
    );

    Ok(download_response("transactions.csv", CSV_CONTENT_TYPE, body))
}

/// Download the approved transactions in the requested date range as an
/// Excel workbook.
pub async fn export_transactions_xlsx(
    State(state): State<ExportState>,
    Extension(user_id): Extension<UserID>,
    headers: HeaderMap,
    Query(query): Query<DateRangeQuery>,
) -> Result<Response, Error> {
    let range = query.to_range();
    let connection = lock_connection(&state)?;

    let transactions = load_transactions(range, &connection)?;
    let body = write_transactions_xlsx(&transactions)?;

    record_export(
        user_id,
        "transactions.xlsx",
        format!("Exported {} transactions to Excel", transactions.len()),
        &headers,
        &connection,
    );

    Ok(download_response("transactions.xlsx", XLSX_CONTENT_TYPE, body))
}

/// Download the finance summary for the requested date range as CSV.
pub async fn export_report_csv(
    State(state): State<ExportState>,
    Extension(user_id): Extension<UserID>,
    headers: HeaderMap,
    Query(query): Query<DateRangeQuery>,
) -> Result<Response, Error> {
    let range = query.to_range();
    let connection = lock_connection(&state)?;

    let data = ReportData::load(range, &connection)?;
    let body = write_report_csv(range, &data.summary, &data.category_spending, &data.sponsors)?;

    record_export(
        user_id,
        "report.csv",
        "Exported the finance report".to_owned(),
        &headers,
        &connection,
    );

    Ok(download_response("report.csv", CSV_CONTENT_TYPE, body))
}

/// Download the printable finance report for the requested date range.
pub async fn export_report_pdf(
    State(state): State<ExportState>,
    Extension(user_id): Extension<UserID>,
    headers: HeaderMap,
    Query(query): Query<DateRangeQuery>,
) -> Result<Response, Error> {
    let range = query.to_range();
    let connection = lock_connection(&state)?;

    let data = ReportData::load(range, &connection)?;
    let body = write_report_pdf(range, &data.summary, &data.sponsors, &data.transactions)?;

    record_export(
        user_id,
        "report.pdf",
        "Exported the finance report as PDF".to_owned(),
        &headers,
        &connection,
    );

    Ok(download_response("report.pdf", PDF_CONTENT_TYPE, body))
}

/// Download every export for the requested date range in one ZIP file.
pub async fn export_bundle_zip(
    State(state): State<ExportState>,
    Extension(user_id): Extension<UserID>,
    headers: HeaderMap,
    Query(query): Query<DateRangeQuery>,
) -> Result<Response, Error> {
    let range = query.to_range();
    let connection = lock_connection(&state)?;

    let data = ReportData::load(range, &connection)?;
    let body = write_bundle_zip(range, &data)?;

    record_export(
        user_id,
        BUNDLE_FILE_NAME,
        format!(
            "Exported the finance bundle with {} transactions",
            data.transactions.len()
        ),
        &headers,
        &connection,
    );

    Ok(download_response(BUNDLE_FILE_NAME, ZIP_CONTENT_TYPE, body))
}

#[cfg(test)]
mod export_tests {
    use std::io::{Cursor, Read};

    use axum::{
        Extension,
        body::Bytes,
        extract::{Query, State},
        http::{HeaderMap, StatusCode},
        response::Response,
    };
    use calamine::{Data, Reader, Xlsx};
    use time::macros::date;
    use zip::ZipArchive;

    use crate::{
        audit::{AuditAction, get_audit_entries},
        auth::{Role, UserID},
        income::{NewFund, NewSponsor, create_fund, create_sponsor},
        ledger::DateRangeQuery,
        test_utils::{
            assert_content_type, assert_csv_download, body_text, get_header,
            test_db::{connection_with_treasurer, insert_user, into_state},
        },
        transaction::{Transaction, create_transaction},
    };

    use super::{
        ExportState, export_bundle_zip, export_report_csv, export_report_pdf,
        export_transactions_csv, export_transactions_xlsx,
    };

    fn get_state() -> (ExportState, UserID) {
        let (connection, treasurer) = connection_with_treasurer();
        let member = insert_user("member", Role::Member, &connection);

        create_fund(
            NewFund {
                amount: 10000.0,
                date_received: date!(2025 - 01 - 01),
            },
            &connection,
        )
        .unwrap();
        create_sponsor(
            NewSponsor {
                name: "Acme".to_owned(),
                amount: 75000.0,
                date_received: date!(2025 - 01 - 02),
                contact_email: None,
            },
            &connection,
        )
        .unwrap();
        create_transaction(
            Transaction::build("Hall, main", -3000.0, "Venue", date!(2025 - 01 - 10))
                .approved(true)
                .created_by(Some(member)),
            &connection,
        )
        .unwrap();
        create_transaction(
            Transaction::build("Banners", -250.5, "Marketing", date!(2025 - 01 - 05))
                .approved(true),
            &connection,
        )
        .unwrap();
        create_transaction(
            Transaction::build("Pending", -99.0, "Other", date!(2025 - 01 - 06)),
            &connection,
        )
        .unwrap();

        (
            ExportState {
                db_connection: into_state(connection),
            },
            treasurer,
        )
    }

    #[track_caller]
    fn assert_download(response: &Response, file_name: &str, content_type: &str) {
        assert_eq!(response.status(), StatusCode::OK);
        assert_content_type(response, content_type);
        assert_eq!(
            get_header(response, "content-disposition"),
            format!("attachment; filename=\"{file_name}\"")
        );
    }

    async fn body_bytes(response: Response) -> Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
    }

    #[track_caller]
    fn assert_one_export_logged(state: &ExportState, file_name: &str) {
        let connection = state.db_connection.lock().unwrap();
        let entries = get_audit_entries(Some(AuditAction::ExportData), 10, &connection).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].object_type, file_name);
    }

    #[tokio::test]
    async fn transactions_csv_lists_approved_transactions_with_total() {
        let (state, treasurer) = get_state();

        let response = export_transactions_csv(
            State(state.clone()),
            Extension(treasurer),
            HeaderMap::new(),
            Query(DateRangeQuery::default()),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_csv_download(&response, "transactions.csv");
        assert_eq!(
            body_text(response).await,
            "Date,Title,Category,Amount,Submitted By\n\
            2025-01-05,Banners,Marketing,-250.50,\n\
            2025-01-10,\"Hall, main\",Venue,-3000.00,member\n\
            ,,TOTAL,-3250.50,2 transactions\n"
        );
        assert_one_export_logged(&state, "transactions.csv");
    }

    #[tokio::test]
    async fn transactions_csv_respects_date_range() {
        let (state, treasurer) = get_state();

        let response = export_transactions_csv(
            State(state),
            Extension(treasurer),
            HeaderMap::new(),
            Query(DateRangeQuery {
                start_date: Some("2025-01-08".to_owned()),
                end_date: None,
            }),
        )
        .await
        .unwrap();

        let text = body_text(response).await;
        assert!(!text.contains("Banners"), "{text}");
        assert!(text.ends_with(",,TOTAL,-3000.00,1 transactions\n"), "{text}");
    }

    #[tokio::test]
    async fn report_csv_has_summary_categories_and_sponsors() {
        let (state, treasurer) = get_state();

        let response = export_report_csv(
            State(state.clone()),
            Extension(treasurer),
            HeaderMap::new(),
            Query(DateRangeQuery::default()),
        )
        .await
        .unwrap();

        assert_csv_download(&response, "report.csv");
        let text = body_text(response).await;
        assert!(text.contains("Summary,Total Income,,85000.00\n"), "{text}");
        assert!(text.contains("Summary,Total Spent,,3250.50\n"), "{text}");
        assert!(text.contains("Summary,Remaining,,81749.50\n"), "{text}");
        assert!(text.contains("Category Spending,Venue,,3000.00\n"), "{text}");
        assert!(text.contains("Sponsor,Acme,Silver,75000.00\n"), "{text}");
        assert_one_export_logged(&state, "report.csv");
    }

    #[tokio::test]
    async fn transactions_xlsx_is_an_excel_workbook() {
        let (state, treasurer) = get_state();

        let response = export_transactions_xlsx(
            State(state.clone()),
            Extension(treasurer),
            HeaderMap::new(),
            Query(DateRangeQuery::default()),
        )
        .await
        .unwrap();

        assert_download(
            &response,
            "transactions.xlsx",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        );
        let bytes = body_bytes(response).await;
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec())).unwrap();
        let range = workbook.worksheet_range("Transactions").unwrap();
        let rows: Vec<&[Data]> = range.rows().collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1][1], Data::String("Banners".to_owned()));
        assert_eq!(rows[3][3], Data::Float(-3250.5));
        assert_one_export_logged(&state, "transactions.xlsx");
    }

    #[tokio::test]
    async fn report_pdf_is_a_pdf_document() {
        let (state, treasurer) = get_state();

        let response = export_report_pdf(
            State(state.clone()),
            Extension(treasurer),
            HeaderMap::new(),
            Query(DateRangeQuery::default()),
        )
        .await
        .unwrap();

        assert_download(&response, "report.pdf", "application/pdf");
        assert!(body_bytes(response).await.starts_with(b"%PDF"));
        assert_one_export_logged(&state, "report.pdf");
    }

    #[tokio::test]
    async fn bundle_zip_contains_every_export() {
        let (state, treasurer) = get_state();

        let response = export_bundle_zip(
            State(state.clone()),
            Extension(treasurer),
            HeaderMap::new(),
            Query(DateRangeQuery::default()),
        )
        .await
        .unwrap();

        assert_download(&response, "finance_export.zip", "application/zip");
        let bytes = body_bytes(response).await;
        let mut archive = ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut file_names: Vec<&str> = archive.file_names().collect();
        file_names.sort_unstable();
        assert_eq!(
            file_names,
            [
                "report.csv",
                "report.pdf",
                "transactions.csv",
                "transactions.xlsx"
            ]
        );

        let mut transactions_csv = String::new();
        archive
            .by_name("transactions.csv")
            .unwrap()
            .read_to_string(&mut transactions_csv)
            .unwrap();
        assert!(
            transactions_csv.ends_with(",,TOTAL,-3250.50,2 transactions\n"),
            "{transactions_csv}"
        );
        assert_one_export_logged(&state, "finance_export.zip");
    }

    #[tokio::test]
    async fn exports_of_an_empty_period_still_download() {
        let (state, treasurer) = get_state();
        let query = || {
            Query(DateRangeQuery {
                start_date: Some("2030-01-01".to_owned()),
                end_date: None,
            })
        };

        let xlsx = export_transactions_xlsx(
            State(state.clone()),
            Extension(treasurer),
            HeaderMap::new(),
            query(),
        )
        .await
        .unwrap();
        let pdf = export_report_pdf(
            State(state.clone()),
            Extension(treasurer),
            HeaderMap::new(),
            query(),
        )
        .await
        .unwrap();
        let bundle = export_bundle_zip(State(state), Extension(treasurer), HeaderMap::new(), query())
            .await
            .unwrap();

        assert_eq!(xlsx.status(), StatusCode::OK);
        assert_eq!(pdf.status(), StatusCode::OK);
        assert_eq!(bundle.status(), StatusCode::OK);
    }
}

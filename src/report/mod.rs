//! The printable finance report and the file exports.

mod csv_writer;
mod export;
mod page;
mod pdf_writer;
mod xlsx_writer;

pub use export::{
    export_bundle_zip, export_report_csv, export_report_pdf, export_transactions_csv,
    export_transactions_xlsx,
};
pub use page::get_report_page;

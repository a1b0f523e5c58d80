//! The transaction list as an Excel workbook.

use rust_xlsxwriter::{Color, ExcelDateTime, Format, FormatAlign, Workbook, XlsxError};
use time::Date;

use crate::{
    Error,
    transaction::{Transaction, total_amount},
};

const FILE_NAME: &str = "transactions.xlsx";

const HEADER_COLOR: u32 = 0x4F46E5;
const TOTAL_ROW_COLOR: u32 = 0xE5E7EB;

fn xlsx_error(error: XlsxError) -> Error {
    tracing::error!("could not write {FILE_NAME}: {error}");
    Error::ExportError(FILE_NAME, error.to_string())
}

fn excel_date(date: Date) -> Result<ExcelDateTime, XlsxError> {
    let year = u16::try_from(date.year())
        .map_err(|_| XlsxError::ParameterError(format!("year {} is out of range", date.year())))?;

    ExcelDateTime::from_ymd(year, date.month() as u8, date.day())
}

/// Write the approved transactions to a single "Transactions" sheet with a
/// bold header and a TOTAL row at the bottom.
///
/// Dates are written as Excel dates and amounts as numbers so the sheet can
/// be sorted and summed.
pub fn write_transactions_xlsx(transactions: &[Transaction]) -> Result<Vec<u8>, Error> {
    let mut workbook = Workbook::new();

    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_COLOR))
        .set_align(FormatAlign::Center);
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let amount_format = Format::new().set_num_format("#,##0.00");
    let total_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(TOTAL_ROW_COLOR));
    let total_amount_format = total_format.clone().set_num_format("#,##0.00");

    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Transactions").map_err(xlsx_error)?;

    for (column, title) in ["Date", "Title", "Category", "Amount", "Submitted By"]
        .into_iter()
        .enumerate()
    {
        worksheet
            .write_string_with_format(0, column as u16, title, &header_format)
            .map_err(xlsx_error)?;
    }

    let mut row = 1;
    for transaction in transactions {
        let date = excel_date(transaction.date).map_err(xlsx_error)?;

        worksheet
            .write_datetime_with_format(row, 0, &date, &date_format)
            .map_err(xlsx_error)?;
        worksheet
            .write_string(row, 1, &transaction.title)
            .map_err(xlsx_error)?;
        worksheet
            .write_string(row, 2, &transaction.category)
            .map_err(xlsx_error)?;
        worksheet
            .write_number_with_format(row, 3, transaction.amount, &amount_format)
            .map_err(xlsx_error)?;

        if let Some(submitted_by) = &transaction.submitted_by {
            worksheet
                .write_string(row, 4, submitted_by)
                .map_err(xlsx_error)?;
        }

        row += 1;
    }

    worksheet
        .write_blank(row, 0, &total_format)
        .and_then(|worksheet| worksheet.write_blank(row, 1, &total_format))
        .and_then(|worksheet| worksheet.write_string_with_format(row, 2, "TOTAL", &total_format))
        .and_then(|worksheet| {
            worksheet.write_number_with_format(
                row,
                3,
                total_amount(transactions),
                &total_amount_format,
            )
        })
        .and_then(|worksheet| {
            worksheet.write_string_with_format(
                row,
                4,
                format!("{} transactions", transactions.len()),
                &total_format,
            )
        })
        .map_err(xlsx_error)?;

    worksheet.autofit();

    workbook.save_to_buffer().map_err(xlsx_error)
}

#[cfg(test)]
mod xlsx_writer_tests {
    use std::io::Cursor;

    use calamine::{Data, Reader, Xlsx};
    use time::macros::date;

    use crate::{
        auth::Role,
        test_utils::test_db::{insert_user, test_connection},
        transaction::{Transaction, create_transaction},
    };

    use super::write_transactions_xlsx;

    fn read_rows(bytes: Vec<u8>) -> (Vec<String>, Vec<Vec<Data>>) {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).unwrap();
        let sheet_names = workbook.sheet_names();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();

        (sheet_names, range.rows().map(<[Data]>::to_vec).collect())
    }

    #[test]
    fn writes_transactions_and_total_row() {
        let connection = test_connection();
        let member = insert_user("member", Role::Member, &connection);
        let transactions = vec![
            create_transaction(
                Transaction::build("Banners", -250.5, "Marketing", date!(2025 - 01 - 05))
                    .approved(true),
                &connection,
            )
            .unwrap(),
            create_transaction(
                Transaction::build("=Hall", -3000.0, "Venue", date!(2025 - 01 - 10))
                    .approved(true)
                    .created_by(Some(member)),
                &connection,
            )
            .unwrap(),
        ];

        let (sheet_names, rows) = read_rows(write_transactions_xlsx(&transactions).unwrap());

        assert_eq!(sheet_names, vec!["Transactions"]);
        assert_eq!(rows.len(), 4);
        assert_eq!(
            rows[0],
            ["Date", "Title", "Category", "Amount", "Submitted By"]
                .map(|title| Data::String(title.to_owned()))
        );
        assert!(
            matches!(rows[1][0], Data::DateTime(_) | Data::Float(_)),
            "{:?}",
            rows[1][0]
        );
        assert_eq!(rows[1][1], Data::String("Banners".to_owned()));
        assert_eq!(rows[1][3], Data::Float(-250.5));
        assert_eq!(rows[2][1], Data::String("=Hall".to_owned()));
        assert_eq!(rows[2][4], Data::String("member".to_owned()));
        assert_eq!(rows[3][2], Data::String("TOTAL".to_owned()));
        assert_eq!(rows[3][3], Data::Float(-3250.5));
        assert_eq!(rows[3][4], Data::String("2 transactions".to_owned()));
    }

    #[test]
    fn empty_workbook_has_header_and_zero_total() {
        let (_, rows) = read_rows(write_transactions_xlsx(&[]).unwrap());

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][3], Data::Float(0.0));
        assert_eq!(rows[1][4], Data::String("0 transactions".to_owned()));
    }
}

//! The finance report as a printable A4 PDF.
//!
//! The report is laid out as a list of [PdfLine]s first, then split into
//! pages and drawn with the built-in Helvetica fonts. The built-in fonts
//! only cover Latin-1, so amounts are written with "Rs." instead of the
//! rupee sign.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument};
use time::Date;

use crate::{
    Error,
    html::format_currency,
    income::Sponsor,
    ledger::{DateRange, LedgerSummary},
    transaction::Transaction,
};

const FILE_NAME: &str = "report.pdf";

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;

const TITLE_WIDTH: usize = 45;

/// How a line is drawn and how much vertical space it takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Title,
    Heading,
    Normal,
    Bold,
    Blank,
}

impl LineStyle {
    fn height(self) -> f32 {
        match self {
            LineStyle::Title => 10.0,
            LineStyle::Heading => 8.0,
            LineStyle::Normal | LineStyle::Bold => 6.0,
            LineStyle::Blank => 4.0,
        }
    }

    fn font_size(self) -> f32 {
        match self {
            LineStyle::Title => 18.0,
            LineStyle::Heading => 13.0,
            LineStyle::Normal | LineStyle::Bold | LineStyle::Blank => 10.0,
        }
    }

    fn is_bold(self) -> bool {
        matches!(self, LineStyle::Title | LineStyle::Heading | LineStyle::Bold)
    }
}

/// One line of the report: text cells placed at an x offset in mm from the
/// left margin.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfLine {
    pub cells: Vec<(f32, String)>,
    pub style: LineStyle,
}

impl PdfLine {
    fn new(style: LineStyle, cells: Vec<(f32, String)>) -> Self {
        Self { cells, style }
    }

    fn text(style: LineStyle, text: impl Into<String>) -> Self {
        Self::new(style, vec![(0.0, text.into())])
    }

    fn blank() -> Self {
        Self::new(LineStyle::Blank, Vec::new())
    }

    fn figure(label: &str, amount: f64) -> Self {
        Self::new(
            LineStyle::Normal,
            vec![(0.0, label.to_owned()), (70.0, pdf_currency(amount))],
        )
    }
}

fn pdf_currency(amount: f64) -> String {
    format_currency(amount).replace('₹', "Rs. ")
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_owned();
    }

    let mut truncated: String = text.chars().take(width - 3).collect();
    truncated.push_str("...");
    truncated
}

fn period_label(date: Option<Date>, open: &str) -> String {
    date.map(|date| date.to_string())
        .unwrap_or_else(|| open.to_owned())
}

/// Lay out the report: the period, the headline figures, sponsors with their
/// tier, then the approved transactions in date order.
pub fn report_lines(
    range: DateRange,
    summary: &LedgerSummary,
    sponsors: &[Sponsor],
    transactions: &[Transaction],
) -> Vec<PdfLine> {
    let mut lines = vec![
        PdfLine::text(LineStyle::Title, "Finance Report"),
        PdfLine::text(
            LineStyle::Normal,
            format!(
                "Period: {} to {}",
                period_label(range.start, "the beginning"),
                period_label(range.end, "today")
            ),
        ),
        PdfLine::blank(),
        PdfLine::text(LineStyle::Heading, "Summary"),
    ];

    lines.extend(
        summary
            .figures()
            .into_iter()
            .map(|(label, amount)| PdfLine::figure(label, amount)),
    );

    lines.push(PdfLine::blank());
    lines.push(PdfLine::text(LineStyle::Heading, "Sponsors"));

    if sponsors.is_empty() {
        lines.push(PdfLine::text(LineStyle::Normal, "No sponsors in this period."));
    } else {
        lines.push(PdfLine::new(
            LineStyle::Bold,
            vec![
                (0.0, "Name".to_owned()),
                (80.0, "Tier".to_owned()),
                (110.0, "Amount".to_owned()),
            ],
        ));

        let mut sponsors: Vec<&Sponsor> = sponsors.iter().collect();
        sponsors.sort_by(|a, b| b.amount.total_cmp(&a.amount));

        lines.extend(sponsors.into_iter().map(|sponsor| {
            PdfLine::new(
                LineStyle::Normal,
                vec![
                    (0.0, truncate(&sponsor.name, 40)),
                    (80.0, sponsor.tier().label().to_owned()),
                    (110.0, pdf_currency(sponsor.amount)),
                ],
            )
        }));
    }

    lines.push(PdfLine::blank());
    lines.push(PdfLine::text(LineStyle::Heading, "Approved Transactions"));

    if transactions.is_empty() {
        lines.push(PdfLine::text(
            LineStyle::Normal,
            "No approved transactions in this period.",
        ));
    } else {
        lines.push(PdfLine::new(
            LineStyle::Bold,
            vec![
                (0.0, "Date".to_owned()),
                (25.0, "Title".to_owned()),
                (105.0, "Category".to_owned()),
                (140.0, "Amount".to_owned()),
            ],
        ));

        let mut transactions: Vec<&Transaction> = transactions.iter().collect();
        transactions.sort_by_key(|transaction| (transaction.date, transaction.id));

        lines.extend(transactions.into_iter().map(|transaction| {
            PdfLine::new(
                LineStyle::Normal,
                vec![
                    (0.0, transaction.date.to_string()),
                    (25.0, truncate(&transaction.title, TITLE_WIDTH)),
                    (105.0, truncate(&transaction.category, 18)),
                    (140.0, pdf_currency(transaction.amount)),
                ],
            )
        }));
    }

    lines
}

/// Split `lines` into pages that fit between the top and bottom margins.
///
/// A page never starts with a blank line.
pub fn paginate(lines: Vec<PdfLine>) -> Vec<Vec<PdfLine>> {
    let usable_height = PAGE_HEIGHT - 2.0 * MARGIN;
    let mut pages = vec![Vec::new()];
    let mut used = 0.0;

    for line in lines {
        let height = line.style.height();

        if used + height > usable_height {
            if line.style == LineStyle::Blank {
                continue;
            }

            pages.push(Vec::new());
            used = 0.0;
        }

        used += height;
        if let Some(page) = pages.last_mut() {
            page.push(line);
        }
    }

    pages
}

fn pdf_error(error: impl std::fmt::Display) -> Error {
    tracing::error!("could not write {FILE_NAME}: {error}");
    Error::ExportError(FILE_NAME, error.to_string())
}

/// Render the finance report as a PDF document.
pub fn write_report_pdf(
    range: DateRange,
    summary: &LedgerSummary,
    sponsors: &[Sponsor],
    transactions: &[Transaction],
) -> Result<Vec<u8>, Error> {
    let (document, first_page, first_layer) = PdfDocument::new(
        "Finance Report",
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Layer 1",
    );
    let regular = document
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(pdf_error)?;
    let bold = document
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_error)?;

    let pages = paginate(report_lines(range, summary, sponsors, transactions));

    for (page_number, lines) in pages.iter().enumerate() {
        let (page, layer) = if page_number == 0 {
            (first_page, first_layer)
        } else {
            document.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1")
        };
        let layer = document.get_page(page).get_layer(layer);

        let mut y = PAGE_HEIGHT - MARGIN;
        for line in lines {
            y -= line.style.height();
            let font: &IndirectFontRef = if line.style.is_bold() { &bold } else { &regular };

            for (x, text) in &line.cells {
                layer.use_text(
                    text.as_str(),
                    line.style.font_size(),
                    Mm(MARGIN + x),
                    Mm(y),
                    font,
                );
            }
        }
    }

    document.save_to_bytes().map_err(pdf_error)
}

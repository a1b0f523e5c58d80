//! Chart generation and rendering for the dashboard.
//!
//! This module creates interactive ECharts visualizations for the ledger:
//! - **Spending by Category**: Pie chart of approved expenses per category
//! - **Income Split**: Pie chart of management funds against sponsorships
//! - **Monthly Spending**: Bar chart of approved expenses per month
//!
//! Each chart is generated as JSON configuration for the ECharts library and
//! rendered with corresponding HTML containers and JavaScript initialization code.

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{AxisLabel, AxisPointer, AxisPointerType, AxisType, JsFunction, Tooltip, Trigger},
    series::{bar::Bar, pie::Pie},
};
use maud::{Markup, PreEscaped, html};

use crate::{html::HeadElement, ledger::LedgerSummary};

/// A dashboard chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Renders the HTML containers for dashboard charts.
pub(super) fn charts_view(charts: &[DashboardChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
            {
                @for chart in charts {
                    div
                        id=(chart.id)
                        class="min-h-[380px] rounded dark:bg-gray-100"
                    {}
                }
            }
        }
    )
}

/// Generates JavaScript initialization code for dashboard charts.
///
/// Creates scripts that initialize ECharts instances with dark mode support
/// and responsive resizing.
pub(super) fn charts_script(charts: &[DashboardChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        const isDarkMode = darkModeMediaQuery.matches;
                        chart.setTheme(isDarkMode ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{}\n}});",
        script_content
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}

pub(super) fn category_spending_chart(spending: &[(String, f64)]) -> Chart {
    let data: Vec<(f64, &str)> = spending
        .iter()
        .map(|(category, spent)| (*spent, category.as_str()))
        .collect();

    Chart::new()
        .title(Title::new().text("Spending by Category"))
        .tooltip(item_tooltip())
        .legend(Legend::new().top("bottom"))
        .series(
            Pie::new()
                .name("Spent")
                .radius(vec!["40%", "70%"])
                .data(data),
        )
}

pub(super) fn income_split_chart(summary: &LedgerSummary) -> Chart {
    Chart::new()
        .title(Title::new().text("Income Sources"))
        .tooltip(item_tooltip())
        .legend(Legend::new().top("bottom"))
        .series(Pie::new().name("Income").radius(vec!["40%", "70%"]).data(vec![
            (summary.management_funds, "Management Funds"),
            (summary.sponsors, "Sponsors"),
        ]))
}

pub(super) fn monthly_spending_chart(monthly_spending: &[(String, f64)], subtext: &str) -> Chart {
    let (labels, values): (Vec<String>, Vec<f64>) = monthly_spending.iter().cloned().unzip();

    Chart::new()
        .title(Title::new().text("Monthly Spending").subtext(subtext))
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Axis)
                .value_formatter(currency_formatter())
                .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow)),
        )
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(Bar::new().name("Spent").data(values))
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('en-IN', {
              style: 'currency',
              currency: 'INR'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}

fn item_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Item)
        .value_formatter(currency_formatter())
}

#[cfg(test)]
mod charts_tests {
    use crate::ledger::LedgerSummary;

    use super::{category_spending_chart, income_split_chart, monthly_spending_chart};

    #[test]
    fn category_chart_contains_each_category() {
        let options = category_spending_chart(&[
            ("Venue".to_owned(), 5000.0),
            ("Marketing".to_owned(), 1200.0),
        ])
        .to_string();

        assert!(options.contains("\"Venue\""), "{options}");
        assert!(options.contains("\"Marketing\""), "{options}");
        assert!(options.contains("\"pie\""), "{options}");
    }

    #[test]
    fn income_chart_splits_funds_and_sponsors() {
        let options = income_split_chart(&LedgerSummary::new(10000.0, 2500.0, 0.0)).to_string();

        assert!(options.contains("Management Funds"), "{options}");
        assert!(options.contains("Sponsors"), "{options}");
    }

    #[test]
    fn monthly_chart_uses_month_labels() {
        let options = monthly_spending_chart(
            &[("Jan 2025".to_owned(), 10.0), ("Feb 2025".to_owned(), 0.0)],
            "Last 180 days",
        )
        .to_string();

        assert!(options.contains("Jan 2025"), "{options}");
        assert!(options.contains("\"bar\""), "{options}");
    }
}

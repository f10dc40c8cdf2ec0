use crate::dashboard::DerivedViewKind;
use crate::error::Result;
use crate::statements::{BalanceSheetSummary, IncomeStatement, LineUnit, ProfitAndLossSummary};
use crate::summary::{MultiYearSummary, SummaryMetric};
use crate::utils::format_thousands;
use csv::Writer;
use serde::Serialize;

/// A view that can be laid out as a single table of cells.
pub trait TabularReport: Serialize {
    fn kind(&self) -> DerivedViewKind;

    fn title(&self) -> String;

    fn headers(&self) -> Vec<String>;

    /// Machine-readable cells: plain numbers, no grouping.
    fn raw_rows(&self) -> Vec<Vec<String>>;

    /// Human-readable cells for markdown output.
    fn display_rows(&self) -> Vec<Vec<String>>;

    fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn to_csv(&self) -> Result<String> {
        let mut wtr = Writer::from_writer(Vec::new());
        wtr.write_record(self.headers())?;
        for row in self.raw_rows() {
            wtr.write_record(&row)?;
        }
        let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn to_markdown(&self) -> String {
        let headers = self.headers();
        let mut output = String::new();

        output.push_str(&format!("## {}\n\n", self.title()));
        output.push_str(&format!("| {} |\n", headers.join(" | ")));
        output.push_str(&format!(
            "|{}\n",
            headers.iter().map(|_| " --- |").collect::<String>()
        ));
        for row in self.display_rows() {
            output.push_str(&format!("| {} |\n", row.join(" | ")));
        }
        output.push('\n');

        output
    }
}

fn display_value(value: f64, unit: LineUnit) -> String {
    match unit {
        LineUnit::Amount => format_thousands(value, 0),
        LineUnit::Ratio => format!("{:.1}%", value * 100.0),
    }
}

fn raw_opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl TabularReport for IncomeStatement {
    fn kind(&self) -> DerivedViewKind {
        DerivedViewKind::IncomeStatement
    }

    fn title(&self) -> String {
        format!("Income Statement ({})", self.label)
    }

    fn headers(&self) -> Vec<String> {
        ["Item", "Actual", "Budget", "Variance", "Var%"]
            .iter()
            .map(|h| h.to_string())
            .collect()
    }

    fn raw_rows(&self) -> Vec<Vec<String>> {
        self.lines
            .iter()
            .map(|line| {
                vec![
                    line.item.clone(),
                    line.actual.to_string(),
                    raw_opt(line.budget),
                    raw_opt(line.variance),
                    raw_opt(line.variance_pct),
                ]
            })
            .collect()
    }

    fn display_rows(&self) -> Vec<Vec<String>> {
        self.lines
            .iter()
            .map(|line| {
                let shown = |v: Option<f64>| {
                    v.map(|v| display_value(v, line.unit)).unwrap_or_default()
                };
                vec![
                    line.item.clone(),
                    display_value(line.actual, line.unit),
                    shown(line.budget),
                    shown(line.variance),
                    line.variance_pct
                        .map(|p| format!("{:.1}%", p))
                        .unwrap_or_default(),
                ]
            })
            .collect()
    }
}

impl TabularReport for ProfitAndLossSummary {
    fn kind(&self) -> DerivedViewKind {
        DerivedViewKind::ProfitAndLossSummary
    }

    fn title(&self) -> String {
        format!("P&L Summary ({})", self.label)
    }

    fn headers(&self) -> Vec<String> {
        vec!["Item".to_string(), "Amount".to_string()]
    }

    fn raw_rows(&self) -> Vec<Vec<String>> {
        let mut rows: Vec<Vec<String>> = self
            .lines
            .iter()
            .map(|l| vec![l.item.clone(), l.amount.to_string()])
            .collect();
        rows.push(vec![
            "Profit Margin (%)".to_string(),
            self.profit_margin_pct.to_string(),
        ]);
        rows.push(vec![
            "Profit Margin YoY Change".to_string(),
            raw_opt(self.profit_margin_change),
        ]);
        rows.push(vec![
            "Profit Margin (%) YoY Change".to_string(),
            raw_opt(self.profit_margin_pct_change),
        ]);
        rows
    }

    fn display_rows(&self) -> Vec<Vec<String>> {
        let mut rows: Vec<Vec<String>> = self
            .lines
            .iter()
            .map(|l| vec![l.item.clone(), display_value(l.amount, l.unit)])
            .collect();
        rows.push(vec![
            "Profit Margin (%)".to_string(),
            display_value(self.profit_margin_pct, LineUnit::Ratio),
        ]);
        rows.push(vec![
            "Profit Margin YoY Change".to_string(),
            self.profit_margin_change
                .map(|v| display_value(v, LineUnit::Amount))
                .unwrap_or_else(|| "n/a".to_string()),
        ]);
        rows.push(vec![
            "Profit Margin (%) YoY Change".to_string(),
            self.profit_margin_pct_change
                .map(|v| format!("{:+.1} pts", v * 100.0))
                .unwrap_or_else(|| "n/a".to_string()),
        ]);
        rows
    }
}

impl TabularReport for BalanceSheetSummary {
    fn kind(&self) -> DerivedViewKind {
        DerivedViewKind::BalanceSheetSummary
    }

    fn title(&self) -> String {
        format!("Balance Sheet Summary ({})", self.label)
    }

    fn headers(&self) -> Vec<String> {
        vec!["Section".to_string(), "Item".to_string(), "Amount".to_string()]
    }

    fn raw_rows(&self) -> Vec<Vec<String>> {
        self.lines
            .iter()
            .map(|l| {
                vec![
                    l.section.title().to_string(),
                    l.name.clone(),
                    l.amount.to_string(),
                ]
            })
            .collect()
    }

    fn display_rows(&self) -> Vec<Vec<String>> {
        if self.lines.is_empty() {
            return vec![vec![
                String::new(),
                "No balance sheet data for this year".to_string(),
                String::new(),
            ]];
        }

        self.lines
            .iter()
            .map(|l| {
                let amount = format_thousands(l.amount, 0);
                let (name, amount) = if l.is_total {
                    (format!("**{}**", l.name), format!("**{}**", amount))
                } else {
                    (l.name.clone(), amount)
                };
                vec![l.section.title().to_string(), name, amount]
            })
            .collect()
    }
}

impl TabularReport for MultiYearSummary {
    fn kind(&self) -> DerivedViewKind {
        DerivedViewKind::MultiYearSummary
    }

    fn title(&self) -> String {
        format!("Performance Summary ({}-Year)", self.year_count)
    }

    fn headers(&self) -> Vec<String> {
        ["Metric", "Average", "First", "Last", "Change", "Trend"]
            .iter()
            .map(|h| h.to_string())
            .collect()
    }

    fn raw_rows(&self) -> Vec<Vec<String>> {
        self.metrics
            .iter()
            .map(|m| {
                vec![
                    m.name.clone(),
                    m.mean.to_string(),
                    m.first.to_string(),
                    m.last.to_string(),
                    m.change.to_string(),
                    format!("{:?}", m.trend),
                ]
            })
            .collect()
    }

    fn display_rows(&self) -> Vec<Vec<String>> {
        self.metrics
            .iter()
            .map(|m| {
                let unit = if m.metric == SummaryMetric::ProfitMarginPct {
                    LineUnit::Ratio
                } else {
                    LineUnit::Amount
                };
                vec![
                    m.name.clone(),
                    display_value(m.mean, unit),
                    display_value(m.first, unit),
                    display_value(m.last, unit),
                    display_value(m.change, unit),
                    format!("{:?}", m.trend),
                ]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{sample_budget, sample_table};
    use crate::statements::{balance_sheet_summary, income_statement, profit_and_loss_summary};
    use crate::summary::multi_year_summary;

    #[test]
    fn test_income_statement_to_csv() {
        let table = sample_table().unwrap();
        let budget = sample_budget();
        let statement = income_statement(&table, None, Some(&budget)).unwrap();

        let csv = statement.to_csv().unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Item,Actual,Budget,Variance,Var%"));
        assert!(lines
            .next()
            .unwrap()
            .starts_with("Revenue,490923,475000,15923,3.352"));
        assert_eq!(csv.lines().count(), 8);
        assert_eq!(statement.kind(), DerivedViewKind::IncomeStatement);
    }

    #[test]
    fn test_income_statement_to_markdown() {
        let table = sample_table().unwrap();
        let statement = income_statement(&table, None, None).unwrap();
        let markdown = statement.to_markdown();

        assert!(markdown.contains("## Income Statement (Year 0)"));
        assert!(markdown.contains("| Revenue | 490,923 |"));
        assert!(markdown.contains("| Profit Margin (%) | 14.0% |"));
    }

    #[test]
    fn test_pl_summary_markdown_marks_missing_change() {
        let table = sample_table().unwrap();
        let first = profit_and_loss_summary(&table, Some(-4)).unwrap();
        let markdown = first.to_markdown();
        assert!(markdown.contains("Net Operating Profit"));
        assert!(markdown.contains("| Profit Margin YoY Change | n/a |"));
    }

    #[test]
    fn test_balance_sheet_markdown() {
        let table = sample_table().unwrap();
        let summary = balance_sheet_summary(&table, None, 1.0).unwrap();
        let markdown = summary.to_markdown();
        assert!(markdown.contains("| Assets | **Total Assets** | **985,295** |"));

        let empty = balance_sheet_summary(&table, Some(-1), 1.0).unwrap();
        assert!(empty.to_markdown().contains("No balance sheet data"));
        assert_eq!(empty.to_csv().unwrap().lines().count(), 1);
    }

    #[test]
    fn test_summary_to_json() {
        let table = sample_table().unwrap();
        let summary = multi_year_summary(&table);
        let json = summary.to_json().unwrap();
        assert!(json.contains("\"total_revenue\""));
        assert!(summary.to_markdown().contains("Performance Summary (5-Year)"));
    }
}

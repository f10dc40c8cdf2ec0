use crate::error::{FinancialViewError, Result};
use crate::schema::{
    BudgetFigures, FinancialRow, FinancialTable, COGS, DEPRECIATION_AND_AMORTIZATION, INTEREST,
    PROFIT_MARGIN, PROFIT_MARGIN_PCT, RENT_AND_OVERHEAD, SALARIES_AND_BENEFITS, TOTAL_EXPENSES,
};
use crate::utils::approx_eq;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How a statement amount should be read and formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LineUnit {
    Amount,
    /// A fraction, 0.14 meaning 14%
    Ratio,
}

/// Resolves the statement row: the requested year, or the latest one.
pub fn select_row(table: &FinancialTable, year: Option<i32>) -> Result<&FinancialRow> {
    match year {
        Some(y) => table.find_year(y).ok_or(FinancialViewError::YearNotFound(y)),
        None => Ok(table.last()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StatementLine {
    pub item: String,
    pub unit: LineUnit,
    pub actual: f64,
    pub budget: Option<f64>,
    /// actual - budget
    pub variance: Option<f64>,
    /// variance / budget * 100, absent when the budget is zero
    pub variance_pct: Option<f64>,
}

impl StatementLine {
    fn new(item: &str, unit: LineUnit, actual: f64, budget: Option<f64>) -> Self {
        let variance = budget.map(|b| actual - b);
        let variance_pct = match (variance, budget) {
            (Some(v), Some(b)) if b != 0.0 => Some(v / b * 100.0),
            _ => None,
        };

        Self {
            item: item.to_string(),
            unit,
            actual,
            budget,
            variance,
            variance_pct,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IncomeStatement {
    pub year: i32,
    pub label: String,
    pub revenue: f64,
    pub cogs: f64,
    /// revenue - cogs
    pub gross_profit: f64,
    pub total_expenses: f64,
    /// gross_profit - total_expenses
    pub operating_profit: f64,
    pub lines: Vec<StatementLine>,
}

pub fn income_statement(
    table: &FinancialTable,
    year: Option<i32>,
    budget: Option<&BudgetFigures>,
) -> Result<IncomeStatement> {
    let row = select_row(table, year)?;

    let gross_profit = row.consolidated - row.cogs;
    let operating_profit = gross_profit - row.total_expenses;

    let budget_gross = budget.map(|b| b.revenue - b.cogs);
    let budget_operating = budget.map(|b| b.revenue - b.cogs - b.expenses);

    let lines = vec![
        StatementLine::new(
            "Revenue",
            LineUnit::Amount,
            row.consolidated,
            budget.map(|b| b.revenue),
        ),
        StatementLine::new(COGS, LineUnit::Amount, row.cogs, budget.map(|b| b.cogs)),
        StatementLine::new("Gross Profit", LineUnit::Amount, gross_profit, budget_gross),
        StatementLine::new(
            TOTAL_EXPENSES,
            LineUnit::Amount,
            row.total_expenses,
            budget.map(|b| b.expenses),
        ),
        StatementLine::new(
            "Operating Profit",
            LineUnit::Amount,
            operating_profit,
            budget_operating,
        ),
        StatementLine::new(
            PROFIT_MARGIN,
            LineUnit::Amount,
            row.profit_margin,
            budget.map(|b| b.profit_margin),
        ),
        StatementLine::new(
            PROFIT_MARGIN_PCT,
            LineUnit::Ratio,
            row.profit_margin_pct,
            budget.map(|b| b.profit_margin_pct),
        ),
    ];

    Ok(IncomeStatement {
        year: row.year,
        label: row.label.clone(),
        revenue: row.consolidated,
        cogs: row.cogs,
        gross_profit,
        total_expenses: row.total_expenses,
        operating_profit,
        lines,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProfitAndLossLine {
    pub item: String,
    pub unit: LineUnit,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProfitAndLossSummary {
    pub year: i32,
    pub label: String,
    /// The nearest earlier year in the table, if any
    pub prior_year: Option<i32>,
    pub profit_margin: f64,
    pub profit_margin_pct: f64,
    pub profit_margin_change: Option<f64>,
    pub profit_margin_pct_change: Option<f64>,
    pub lines: Vec<ProfitAndLossLine>,
}

pub fn profit_and_loss_summary(
    table: &FinancialTable,
    year: Option<i32>,
) -> Result<ProfitAndLossSummary> {
    let row = select_row(table, year)?;
    let prior = table.prior_row(row.year);

    let line = |item: &str, amount: f64| ProfitAndLossLine {
        item: item.to_string(),
        unit: LineUnit::Amount,
        amount,
    };

    let lines = vec![
        line("Revenue", row.consolidated),
        line(COGS, row.cogs),
        line(SALARIES_AND_BENEFITS, row.salaries_and_benefits),
        line(RENT_AND_OVERHEAD, row.rent_and_overhead),
        line(DEPRECIATION_AND_AMORTIZATION, row.depreciation_and_amortization),
        line(INTEREST, row.interest),
        line(TOTAL_EXPENSES, row.total_expenses),
        line("Net Operating Profit", row.profit_margin),
    ];

    Ok(ProfitAndLossSummary {
        year: row.year,
        label: row.label.clone(),
        prior_year: prior.map(|p| p.year),
        profit_margin: row.profit_margin,
        profit_margin_pct: row.profit_margin_pct,
        profit_margin_change: prior.map(|p| row.profit_margin - p.profit_margin),
        profit_margin_pct_change: prior.map(|p| row.profit_margin_pct - p.profit_margin_pct),
        lines,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum BalanceSheetSection {
    Assets,
    Liabilities,
    Equity,
    /// Grand total of liabilities and equity
    LiabilitiesAndEquity,
}

impl BalanceSheetSection {
    pub fn title(&self) -> &'static str {
        match self {
            BalanceSheetSection::Assets => "Assets",
            BalanceSheetSection::Liabilities => "Liabilities",
            BalanceSheetSection::Equity => "Equity",
            BalanceSheetSection::LiabilitiesAndEquity => "Liabilities & Equity",
        }
    }

    fn order(&self) -> u8 {
        match self {
            BalanceSheetSection::Assets => 0,
            BalanceSheetSection::Liabilities => 1,
            BalanceSheetSection::Equity => 2,
            BalanceSheetSection::LiabilitiesAndEquity => 3,
        }
    }
}

/// Places a column in a balance sheet section by name, or `None` if the name
/// does not look like a balance sheet item.
///
/// "asset" and "receivable" take precedence over liability and equity words,
/// so "Deferred Tax Assets" and "Loans Receivable" stay in Assets.
pub fn classify_column(name: &str) -> Option<BalanceSheetSection> {
    let lower = name.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    let liability = has(&[
        "liabilit", "payable", "loan", "debt", "borrowing", "accrued", "deferred",
    ]);
    let equity = has(&["equity", "capital", "retained", "reserve"])
        && !lower.contains("working capital");

    if liability && equity {
        Some(BalanceSheetSection::LiabilitiesAndEquity)
    } else if has(&["asset", "receivable"]) {
        Some(BalanceSheetSection::Assets)
    } else if liability {
        Some(BalanceSheetSection::Liabilities)
    } else if equity {
        Some(BalanceSheetSection::Equity)
    } else if has(&["cash", "inventor", "equipment", "property", "investment", "prepaid"]) {
        Some(BalanceSheetSection::Assets)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BalanceSheetLine {
    pub name: String,
    pub section: BalanceSheetSection,
    pub amount: f64,
    pub is_total: bool,
}

/// Pass-through presentation of balance sheet columns for one year.
///
/// `lines` is empty when the source carries no balance sheet columns (or none
/// with a value for the selected year); renderers show a placeholder then.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BalanceSheetSummary {
    pub year: i32,
    pub label: String,
    pub lines: Vec<BalanceSheetLine>,
    pub total_assets: Option<f64>,
    pub total_liabilities_and_equity: Option<f64>,
    /// Whether total assets equal liabilities plus equity within tolerance.
    /// `None` when either side is missing.
    pub balanced: Option<bool>,
}

impl BalanceSheetSummary {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn section(&self, section: BalanceSheetSection) -> impl Iterator<Item = &BalanceSheetLine> {
        self.lines.iter().filter(move |l| l.section == section)
    }
}

pub fn balance_sheet_summary(
    table: &FinancialTable,
    year: Option<i32>,
    tolerance: f64,
) -> Result<BalanceSheetSummary> {
    let row = select_row(table, year)?;

    let mut lines: Vec<BalanceSheetLine> = table
        .extra_columns()
        .iter()
        .filter_map(|name| {
            let section = classify_column(name)?;
            let amount = row.extra.get(name).copied()?;
            let is_total = section == BalanceSheetSection::LiabilitiesAndEquity
                || name.to_lowercase().starts_with("total");
            Some(BalanceSheetLine {
                name: name.clone(),
                section,
                amount,
                is_total,
            })
        })
        .collect();

    // stable: input order is kept within each section
    lines.sort_by_key(|l| l.section.order());

    let total_assets = section_total(&lines, &[BalanceSheetSection::Assets]);
    let total_liabilities_and_equity = lines
        .iter()
        .find(|l| l.section == BalanceSheetSection::LiabilitiesAndEquity)
        .map(|l| l.amount)
        .or_else(|| {
            section_total(
                &lines,
                &[BalanceSheetSection::Liabilities, BalanceSheetSection::Equity],
            )
        });

    let balanced = match (total_assets, total_liabilities_and_equity) {
        (Some(assets), Some(claims)) => Some(approx_eq(assets, claims, tolerance)),
        _ => None,
    };

    if balanced == Some(false) {
        debug!(
            "Year {}: total assets {:?} differ from liabilities and equity {:?}",
            row.year, total_assets, total_liabilities_and_equity
        );
    }

    Ok(BalanceSheetSummary {
        year: row.year,
        label: row.label.clone(),
        lines,
        total_assets,
        total_liabilities_and_equity,
        balanced,
    })
}

/// A section's explicit total line if it has exactly one, else the sum of its
/// detail lines. `None` when the sections have no lines at all.
fn section_total(lines: &[BalanceSheetLine], sections: &[BalanceSheetSection]) -> Option<f64> {
    let in_sections: Vec<&BalanceSheetLine> = lines
        .iter()
        .filter(|l| sections.contains(&l.section))
        .collect();
    if in_sections.is_empty() {
        return None;
    }

    if sections.len() == 1 {
        let totals: Vec<&&BalanceSheetLine> = in_sections.iter().filter(|l| l.is_total).collect();
        if totals.len() == 1 {
            return Some(totals[0].amount);
        }
    }

    Some(
        in_sections
            .iter()
            .filter(|l| !l.is_total)
            .map(|l| l.amount)
            .sum(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(
        year: i32,
        consolidated: f64,
        cogs: f64,
        total: f64,
        margin: f64,
        pct: f64,
    ) -> FinancialRow {
        FinancialRow::from_values(
            year,
            year.to_string(),
            [
                consolidated / 3.0,
                consolidated / 3.0,
                consolidated / 3.0,
                consolidated,
                cogs,
                margin,
                pct,
                total * 0.5,
                total * 0.25,
                total * 0.15,
                total * 0.1,
                total,
            ],
        )
    }

    fn two_years() -> FinancialTable {
        FinancialTable::from_rows(
            vec![
                row(2021, 100.0, 40.0, 30.0, 30.0, 0.30),
                row(2022, 150.0, 60.0, 50.0, 40.0, 0.2667),
            ],
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn test_income_statement_latest_year() {
        let statement = income_statement(&two_years(), None, None).unwrap();

        assert_eq!(statement.year, 2022);
        assert_eq!(statement.gross_profit, 90.0);
        assert_eq!(statement.operating_profit, 40.0);
        assert_eq!(statement.lines.len(), 7);
        assert!(statement.lines.iter().all(|l| l.budget.is_none() && l.variance.is_none()));
    }

    #[test]
    fn test_income_statement_chosen_year() {
        let statement = income_statement(&two_years(), Some(2021), None).unwrap();
        assert_eq!(statement.revenue, 100.0);
        assert_eq!(statement.gross_profit, 60.0);
        assert_eq!(statement.operating_profit, 30.0);
    }

    #[test]
    fn test_income_statement_missing_year() {
        let result = income_statement(&two_years(), Some(2025), None);
        assert!(matches!(result, Err(FinancialViewError::YearNotFound(2025))));
    }

    #[test]
    fn test_income_statement_budget_variance() {
        let budget = BudgetFigures {
            revenue: 120.0,
            cogs: 0.0,
            expenses: 40.0,
            profit_margin: 50.0,
            profit_margin_pct: 0.25,
        };
        let statement = income_statement(&two_years(), None, Some(&budget)).unwrap();

        let revenue = &statement.lines[0];
        assert_eq!(revenue.budget, Some(120.0));
        assert_eq!(revenue.variance, Some(30.0));
        assert!((revenue.variance_pct.unwrap() - 25.0).abs() < 1e-9);

        let cogs = &statement.lines[1];
        assert_eq!(cogs.variance, Some(60.0));
        assert_eq!(cogs.variance_pct, None);

        let operating = statement.lines.iter().find(|l| l.item == "Operating Profit").unwrap();
        assert_eq!(operating.budget, Some(80.0));
        assert_eq!(operating.variance, Some(-40.0));

        let pct = statement.lines.last().unwrap();
        assert_eq!(pct.unit, LineUnit::Ratio);
    }

    #[test]
    fn test_pl_summary_year_over_year() {
        let summary = profit_and_loss_summary(&two_years(), None).unwrap();

        assert_eq!(summary.prior_year, Some(2021));
        assert_eq!(summary.profit_margin_change, Some(10.0));
        assert!((summary.profit_margin_pct_change.unwrap() - (0.2667 - 0.30)).abs() < 1e-12);
        assert_eq!(summary.lines.last().unwrap().item, "Net Operating Profit");
        assert_eq!(summary.lines.last().unwrap().amount, 40.0);
    }

    #[test]
    fn test_pl_summary_first_year_has_no_change() {
        let summary = profit_and_loss_summary(&two_years(), Some(2021)).unwrap();
        assert_eq!(summary.prior_year, None);
        assert_eq!(summary.profit_margin_change, None);
        assert_eq!(summary.profit_margin_pct_change, None);
    }

    #[test]
    fn test_classify_column() {
        assert_eq!(classify_column("Current Assets"), Some(BalanceSheetSection::Assets));
        assert_eq!(classify_column("Cash at Bank"), Some(BalanceSheetSection::Assets));
        assert_eq!(
            classify_column("Long-term Liabilities"),
            Some(BalanceSheetSection::Liabilities)
        );
        assert_eq!(classify_column("Accounts Payable"), Some(BalanceSheetSection::Liabilities));
        assert_eq!(classify_column("Shareholders' Equity"), Some(BalanceSheetSection::Equity));
        assert_eq!(
            classify_column("Liabilities & Shareholders' Equity"),
            Some(BalanceSheetSection::LiabilitiesAndEquity)
        );
        assert_eq!(classify_column("Headcount"), None);
        assert_eq!(classify_column("Total"), None);
    }

    #[test]
    fn test_classify_asset_names_with_liability_words() {
        assert_eq!(
            classify_column("Deferred Tax Assets"),
            Some(BalanceSheetSection::Assets)
        );
        assert_eq!(classify_column("Loans Receivable"), Some(BalanceSheetSection::Assets));
        assert_eq!(
            classify_column("Deferred Tax Liabilities"),
            Some(BalanceSheetSection::Liabilities)
        );
        assert_eq!(classify_column("Share Capital"), Some(BalanceSheetSection::Equity));
        assert_eq!(classify_column("Working Capital"), None);
    }

    #[test]
    fn test_balance_check_with_deferred_tax_assets() {
        let columns: Vec<String> = ["Cash", "Deferred Tax Assets", "Bank Loan", "Share Capital"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let latest = row(2022, 150.0, 60.0, 50.0, 40.0, 0.2667)
            .with_extra("Cash", 100.0)
            .with_extra("Deferred Tax Assets", 20.0)
            .with_extra("Bank Loan", 40.0)
            .with_extra("Share Capital", 80.0);
        let table = FinancialTable::from_rows(vec![latest], columns).unwrap();

        let summary = balance_sheet_summary(&table, None, 1.0).unwrap();
        assert_eq!(summary.section(BalanceSheetSection::Assets).count(), 2);
        assert_eq!(summary.total_assets, Some(120.0));
        assert_eq!(summary.total_liabilities_and_equity, Some(120.0));
        assert_eq!(summary.balanced, Some(true));
    }

    #[test]
    fn test_balance_sheet_empty_placeholder() {
        let summary = balance_sheet_summary(&two_years(), None, 1.0).unwrap();
        assert!(summary.is_empty());
        assert_eq!(summary.total_assets, None);
        assert_eq!(summary.balanced, None);
    }

    #[test]
    fn test_balance_sheet_pass_through_and_balance_check() {
        let columns: Vec<String> = [
            "Headcount",
            "Current Assets",
            "Non-current Assets",
            "Total Assets",
            "Current Liabilities",
            "Long-term Liabilities",
            "Shareholders' Equity",
            "Liabilities & Shareholders' Equity",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let latest = row(2022, 150.0, 60.0, 50.0, 40.0, 0.2667)
            .with_extra("Headcount", 42.0)
            .with_extra("Current Assets", 395_685.0)
            .with_extra("Non-current Assets", 589_610.0)
            .with_extra("Total Assets", 985_295.0)
            .with_extra("Current Liabilities", 135_374.0)
            .with_extra("Long-term Liabilities", 384_962.0)
            .with_extra("Shareholders' Equity", 464_959.0)
            .with_extra("Liabilities & Shareholders' Equity", 985_295.0);

        let table = FinancialTable::from_rows(
            vec![row(2021, 100.0, 40.0, 30.0, 30.0, 0.30), latest],
            columns,
        )
        .unwrap();

        let summary = balance_sheet_summary(&table, None, 1.0).unwrap();
        assert_eq!(summary.lines.len(), 7);
        assert!(summary.lines.iter().all(|l| l.name != "Headcount"));
        assert_eq!(summary.section(BalanceSheetSection::Assets).count(), 3);
        assert!(summary.lines.iter().find(|l| l.name == "Total Assets").unwrap().is_total);
        assert_eq!(summary.total_assets, Some(985_295.0));
        assert_eq!(summary.total_liabilities_and_equity, Some(985_295.0));
        assert_eq!(summary.balanced, Some(true));

        // earlier year has no balance sheet values
        let earlier = balance_sheet_summary(&table, Some(2021), 1.0).unwrap();
        assert!(earlier.is_empty());
    }

    #[test]
    fn test_balance_sheet_imbalance_is_descriptive() {
        let latest = row(2022, 150.0, 60.0, 50.0, 40.0, 0.2667)
            .with_extra("Cash", 100.0)
            .with_extra("Loan", 30.0)
            .with_extra("Share Capital", 50.0);
        let table = FinancialTable::from_rows(
            vec![latest],
            vec!["Cash".to_string(), "Loan".to_string(), "Share Capital".to_string()],
        )
        .unwrap();

        let summary = balance_sheet_summary(&table, None, 1.0).unwrap();
        assert_eq!(summary.total_assets, Some(100.0));
        assert_eq!(summary.total_liabilities_and_equity, Some(80.0));
        assert_eq!(summary.balanced, Some(false));
    }
}

use crate::error::{FinancialViewError, Result};
use log::warn;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const YEAR: &str = "Year";
pub const BUSINESS_1: &str = "Business 1";
pub const BUSINESS_2: &str = "Business 2";
pub const BUSINESS_3: &str = "Business 3";
pub const CONSOLIDATED: &str = "Consolidated";
pub const COGS: &str = "COGS";
pub const PROFIT_MARGIN: &str = "Profit Margin ($)";
pub const PROFIT_MARGIN_PCT: &str = "Profit Margin (%)";
pub const SALARIES_AND_BENEFITS: &str = "Salaries and Benefits";
pub const RENT_AND_OVERHEAD: &str = "Rent and Overhead";
pub const DEPRECIATION_AND_AMORTIZATION: &str = "Depreciation & Amortization";
pub const INTEREST: &str = "Interest";
pub const TOTAL_EXPENSES: &str = "Total Expenses";

/// Every column a table must carry after alias resolution, in reporting order.
pub const REQUIRED_COLUMNS: [&str; 13] = [
    YEAR,
    BUSINESS_1,
    BUSINESS_2,
    BUSINESS_3,
    CONSOLIDATED,
    COGS,
    PROFIT_MARGIN,
    PROFIT_MARGIN_PCT,
    SALARIES_AND_BENEFITS,
    RENT_AND_OVERHEAD,
    DEPRECIATION_AND_AMORTIZATION,
    INTEREST,
    TOTAL_EXPENSES,
];

/// Required columns coerced to `f64` (everything except `Year`).
pub const NUMERIC_COLUMNS: [&str; 12] = [
    BUSINESS_1,
    BUSINESS_2,
    BUSINESS_3,
    CONSOLIDATED,
    COGS,
    PROFIT_MARGIN,
    PROFIT_MARGIN_PCT,
    SALARIES_AND_BENEFITS,
    RENT_AND_OVERHEAD,
    DEPRECIATION_AND_AMORTIZATION,
    INTEREST,
    TOTAL_EXPENSES,
];

pub const EXPENSE_COMPONENTS: [&str; 4] = [
    SALARIES_AND_BENEFITS,
    RENT_AND_OVERHEAD,
    DEPRECIATION_AND_AMORTIZATION,
    INTEREST,
];

/// Accepted header synonyms mapped to their canonical column name.
///
/// An alias is only applied when the canonical column is absent from the
/// upload, so a file carrying both keeps the alias as an ordinary column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ColumnAliases(BTreeMap<String, String>);

impl ColumnAliases {
    /// An alias table with no entries.
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with_alias(mut self, alias: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.0.insert(alias.into(), canonical.into());
        self
    }

    pub fn canonical_for(&self, alias: &str) -> Option<&str> {
        self.0.get(alias).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(a, c)| (a.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ColumnAliases {
    fn default() -> Self {
        Self::empty().with_alias("Total", TOTAL_EXPENSES)
    }
}

/// One fiscal year of validated figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FinancialRow {
    pub year: i32,
    /// The year cell as it appeared in the source, e.g. "FY2023" or "Year -1"
    pub label: String,
    pub business_1: f64,
    pub business_2: f64,
    pub business_3: f64,
    pub consolidated: f64,
    pub cogs: f64,
    pub profit_margin: f64,
    /// Fraction as supplied by the source (0.14 for 14%)
    pub profit_margin_pct: f64,
    pub salaries_and_benefits: f64,
    pub rent_and_overhead: f64,
    pub depreciation_and_amortization: f64,
    pub interest: f64,
    pub total_expenses: f64,
    /// Numeric cells of non-required columns. Blank or non-numeric cells are absent.
    #[serde(default)]
    pub extra: BTreeMap<String, f64>,
}

impl FinancialRow {
    /// Builds a row from the twelve numeric values in `NUMERIC_COLUMNS` order.
    pub fn from_values(year: i32, label: impl Into<String>, values: [f64; 12]) -> Self {
        let [
            business_1,
            business_2,
            business_3,
            consolidated,
            cogs,
            profit_margin,
            profit_margin_pct,
            salaries_and_benefits,
            rent_and_overhead,
            depreciation_and_amortization,
            interest,
            total_expenses,
        ] = values;

        Self {
            year,
            label: label.into(),
            business_1,
            business_2,
            business_3,
            consolidated,
            cogs,
            profit_margin,
            profit_margin_pct,
            salaries_and_benefits,
            rent_and_overhead,
            depreciation_and_amortization,
            interest,
            total_expenses,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_extra(mut self, column: impl Into<String>, value: f64) -> Self {
        self.extra.insert(column.into(), value);
        self
    }

    /// Looks up a value by its column header, required or extra.
    pub fn value(&self, column: &str) -> Option<f64> {
        match column {
            YEAR => Some(self.year as f64),
            BUSINESS_1 => Some(self.business_1),
            BUSINESS_2 => Some(self.business_2),
            BUSINESS_3 => Some(self.business_3),
            CONSOLIDATED => Some(self.consolidated),
            COGS => Some(self.cogs),
            PROFIT_MARGIN => Some(self.profit_margin),
            PROFIT_MARGIN_PCT => Some(self.profit_margin_pct),
            SALARIES_AND_BENEFITS => Some(self.salaries_and_benefits),
            RENT_AND_OVERHEAD => Some(self.rent_and_overhead),
            DEPRECIATION_AND_AMORTIZATION => Some(self.depreciation_and_amortization),
            INTEREST => Some(self.interest),
            TOTAL_EXPENSES => Some(self.total_expenses),
            other => self.extra.get(other).copied(),
        }
    }

    pub fn expense_components(&self) -> [(&'static str, f64); 4] {
        [
            (SALARIES_AND_BENEFITS, self.salaries_and_benefits),
            (RENT_AND_OVERHEAD, self.rent_and_overhead),
            (DEPRECIATION_AND_AMORTIZATION, self.depreciation_and_amortization),
            (INTEREST, self.interest),
        ]
    }
}

/// The validated, year-ordered dataset every view is computed from.
///
/// Rows are always sorted ascending by year and the table is never empty.
/// Duplicate years are kept in their input order.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct FinancialTable {
    rows: Vec<FinancialRow>,
    extra_columns: Vec<String>,
}

impl FinancialTable {
    pub fn from_rows(mut rows: Vec<FinancialRow>, extra_columns: Vec<String>) -> Result<Self> {
        if rows.is_empty() {
            return Err(FinancialViewError::EmptyTable);
        }

        rows.sort_by_key(|r| r.year);

        let table = Self {
            rows,
            extra_columns,
        };

        let duplicates = table.duplicate_years();
        if !duplicates.is_empty() {
            warn!(
                "Table contains duplicate rows for years {:?}; statements use the last row of each",
                duplicates
            );
        }

        Ok(table)
    }

    pub fn rows(&self) -> &[FinancialRow] {
        &self.rows
    }

    pub fn extra_columns(&self) -> &[String] {
        &self.extra_columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Always false for a constructed table; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first(&self) -> &FinancialRow {
        &self.rows[0]
    }

    pub fn last(&self) -> &FinancialRow {
        &self.rows[self.rows.len() - 1]
    }

    pub fn years(&self) -> Vec<i32> {
        self.rows.iter().map(|r| r.year).collect()
    }

    /// The last row carrying `year`, in input order among duplicates.
    pub fn find_year(&self, year: i32) -> Option<&FinancialRow> {
        self.rows.iter().rev().find(|r| r.year == year)
    }

    /// The nearest earlier distinct year, or `None` for the first year.
    pub fn prior_row(&self, year: i32) -> Option<&FinancialRow> {
        self.rows.iter().rev().find(|r| r.year < year)
    }

    pub fn duplicate_years(&self) -> Vec<i32> {
        let mut duplicates: Vec<i32> = self
            .rows
            .windows(2)
            .filter(|pair| pair[0].year == pair[1].year)
            .map(|pair| pair[0].year)
            .collect();
        duplicates.dedup();
        duplicates
    }

    /// All values of a column in year order, `None` if any row lacks it.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        self.rows.iter().map(|r| r.value(name)).collect()
    }
}

/// Planned figures for the statement year, compared line by line against actuals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BudgetFigures {
    #[schemars(description = "Budgeted consolidated revenue")]
    pub revenue: f64,

    #[schemars(description = "Budgeted cost of goods sold")]
    pub cogs: f64,

    #[schemars(description = "Budgeted total operating expenses")]
    pub expenses: f64,

    #[schemars(description = "Budgeted profit margin in currency")]
    pub profit_margin: f64,

    #[schemars(description = "Budgeted profit margin as a fraction (0.155 for 15.5%)")]
    pub profit_margin_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DashboardConfig {
    #[schemars(
        description = "Accepted header synonyms mapped to canonical column names. Defaults to {\"Total\": \"Total Expenses\"}."
    )]
    pub column_aliases: ColumnAliases,

    #[schemars(
        description = "Fiscal year used for the statement views. When absent the most recent year in the table is used."
    )]
    pub statement_year: Option<i32>,

    #[schemars(description = "Optional budget compared against the income statement year")]
    pub budget: Option<BudgetFigures>,

    #[schemars(
        description = "Largest absolute difference between the expense components and Total Expenses still reported as footing"
    )]
    pub footing_tolerance: f64,

    #[schemars(
        description = "Largest absolute difference between total assets and liabilities plus equity still reported as balanced"
    )]
    pub balance_tolerance: f64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            column_aliases: ColumnAliases::default(),
            statement_year: None,
            budget: None,
            footing_tolerance: 1.0,
            balance_tolerance: 1.0,
        }
    }
}

impl DashboardConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for tolerance in [self.footing_tolerance, self.balance_tolerance] {
            if !tolerance.is_finite() || tolerance < 0.0 {
                return Err(FinancialViewError::InvalidTolerance(tolerance));
            }
        }
        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(DashboardConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

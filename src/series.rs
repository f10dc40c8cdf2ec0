//! Per-year chart series derived from a `FinancialTable`.
//!
//! Every function here is a pure pass over the table in year order. Figures
//! supplied by the source are carried verbatim; where the source is internally
//! inconsistent (units not summing to Consolidated, expense detail not footing
//! to the total) the difference is reported alongside, never corrected.

use crate::error::{FinancialViewError, Result};
use crate::schema::{
    FinancialTable, BUSINESS_1, BUSINESS_2, BUSINESS_3, CONSOLIDATED, EXPENSE_COMPONENTS,
};
use crate::utils::approx_eq;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UnitRevenuePoint {
    pub year: i32,
    pub label: String,
    pub business_1: f64,
    pub business_2: f64,
    pub business_3: f64,
    /// Consolidated revenue exactly as supplied
    pub consolidated: f64,
    /// business_1 + business_2 + business_3
    pub unit_total: f64,
    /// consolidated - unit_total
    pub unreconciled: f64,
}

/// Stacked-bar data: revenue per business unit per year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UnitRevenueSeries {
    pub points: Vec<UnitRevenuePoint>,
}

pub fn unit_revenue_series(table: &FinancialTable) -> UnitRevenueSeries {
    let points = table
        .rows()
        .iter()
        .map(|row| {
            let unit_total = row.business_1 + row.business_2 + row.business_3;
            let unreconciled = row.consolidated - unit_total;
            if unreconciled != 0.0 {
                debug!(
                    "Year {}: consolidated {} differs from unit total {} by {}",
                    row.year, row.consolidated, unit_total, unreconciled
                );
            }
            UnitRevenuePoint {
                year: row.year,
                label: row.label.clone(),
                business_1: row.business_1,
                business_2: row.business_2,
                business_3: row.business_3,
                consolidated: row.consolidated,
                unit_total,
                unreconciled,
            }
        })
        .collect();

    UnitRevenueSeries { points }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MarginPoint {
    pub year: i32,
    pub label: String,
    /// Profit Margin ($)
    pub amount: f64,
    /// Profit Margin (%), as a fraction, identical to the input column
    pub percent: f64,
}

/// Dual-axis data: absolute margin on one axis, percentage on the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MarginSeries {
    pub points: Vec<MarginPoint>,
    /// Multiply `percent` by this for a 0-100 axis; the stored value is untouched.
    pub percent_scale: f64,
}

pub fn margin_series(table: &FinancialTable) -> MarginSeries {
    let points = table
        .rows()
        .iter()
        .map(|row| MarginPoint {
            year: row.year,
            label: row.label.clone(),
            amount: row.profit_margin,
            percent: row.profit_margin_pct,
        })
        .collect();

    MarginSeries {
        points,
        percent_scale: 100.0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CumulativePoint {
    pub year: i32,
    pub label: String,
    /// This year's Consolidated revenue, the waterfall bar height
    pub revenue: f64,
    /// Running total before this year, the waterfall bar base
    pub base: f64,
    /// Running total including this year
    pub cumulative: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CumulativeRevenue {
    pub points: Vec<CumulativePoint>,
    pub total: f64,
}

impl CumulativeRevenue {
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.cumulative).collect()
    }
}

pub fn cumulative_revenue(table: &FinancialTable) -> CumulativeRevenue {
    let mut running = 0.0;
    let points = table
        .rows()
        .iter()
        .map(|row| {
            let base = running;
            running += row.consolidated;
            CumulativePoint {
                year: row.year,
                label: row.label.clone(),
                revenue: row.consolidated,
                base,
                cumulative: running,
            }
        })
        .collect();

    CumulativeRevenue {
        points,
        total: running,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExpenseComponent {
    pub name: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExpenseBreakdownPoint {
    pub year: i32,
    pub label: String,
    /// The four expense lines in reporting order
    pub components: Vec<ExpenseComponent>,
    pub component_sum: f64,
    /// Total Expenses as reported by the source
    pub total_expenses: f64,
    /// total_expenses - component_sum
    pub difference: f64,
    /// Whether the components sum to the total within the footing tolerance
    pub foots: bool,
}

impl ExpenseBreakdownPoint {
    pub fn component(&self, name: &str) -> Option<f64> {
        self.components
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.amount)
    }
}

/// Stacked-area data: the composition of operating expenses per year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExpenseBreakdown {
    pub component_names: Vec<String>,
    pub points: Vec<ExpenseBreakdownPoint>,
}

pub fn expense_breakdown(table: &FinancialTable, footing_tolerance: f64) -> ExpenseBreakdown {
    let points = table
        .rows()
        .iter()
        .map(|row| {
            let components: Vec<ExpenseComponent> = row
                .expense_components()
                .iter()
                .map(|(name, amount)| ExpenseComponent {
                    name: name.to_string(),
                    amount: *amount,
                })
                .collect();
            let component_sum: f64 = components.iter().map(|c| c.amount).sum();
            let difference = row.total_expenses - component_sum;
            let foots = approx_eq(row.total_expenses, component_sum, footing_tolerance);

            if !foots {
                debug!(
                    "Year {}: expense components sum to {} but Total Expenses is {}",
                    row.year, component_sum, row.total_expenses
                );
            }

            ExpenseBreakdownPoint {
                year: row.year,
                label: row.label.clone(),
                components,
                component_sum,
                total_expenses: row.total_expenses,
                difference,
                foots,
            }
        })
        .collect();

    ExpenseBreakdown {
        component_names: EXPENSE_COMPONENTS.iter().map(|c| c.to_string()).collect(),
        points,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BridgeMeasure {
    /// A step that adds to the running total
    Relative,
    /// A bar drawn from zero showing the reported total
    Total,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BridgeStep {
    pub name: String,
    pub measure: BridgeMeasure,
    pub amount: f64,
    pub base: f64,
}

/// Single-year waterfall from business-unit revenue up to Consolidated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RevenueBridge {
    pub year: i32,
    pub label: String,
    pub steps: Vec<BridgeStep>,
    /// Consolidated minus the sum of the relative steps
    pub unreconciled: f64,
}

/// Builds the revenue bridge for `year`, or the most recent year when `None`.
pub fn revenue_bridge(table: &FinancialTable, year: Option<i32>) -> Result<RevenueBridge> {
    let row = match year {
        Some(y) => table.find_year(y).ok_or(FinancialViewError::YearNotFound(y))?,
        None => table.last(),
    };

    let mut steps = Vec::with_capacity(4);
    let mut running = 0.0;
    for (name, amount) in [
        (BUSINESS_1, row.business_1),
        (BUSINESS_2, row.business_2),
        (BUSINESS_3, row.business_3),
    ] {
        steps.push(BridgeStep {
            name: name.to_string(),
            measure: BridgeMeasure::Relative,
            amount,
            base: running,
        });
        running += amount;
    }

    steps.push(BridgeStep {
        name: CONSOLIDATED.to_string(),
        measure: BridgeMeasure::Total,
        amount: row.consolidated,
        base: 0.0,
    });

    Ok(RevenueBridge {
        year: row.year,
        label: row.label.clone(),
        steps,
        unreconciled: row.consolidated - running,
    })
}

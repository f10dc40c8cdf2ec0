use crate::schema::{FinancialRow, FinancialTable};
use crate::utils::mean;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    /// Sign of `last - first`; `Flat` only when the two are exactly equal.
    pub fn between(first: f64, last: f64) -> Self {
        if last > first {
            Trend::Up
        } else if last < first {
            Trend::Down
        } else {
            Trend::Flat
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum SummaryMetric {
    Revenue,
    Cogs,
    Expenses,
    ProfitMargin,
    ProfitMarginPct,
}

impl SummaryMetric {
    pub const ALL: [SummaryMetric; 5] = [
        SummaryMetric::Revenue,
        SummaryMetric::Cogs,
        SummaryMetric::Expenses,
        SummaryMetric::ProfitMargin,
        SummaryMetric::ProfitMarginPct,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SummaryMetric::Revenue => "Revenue",
            SummaryMetric::Cogs => "COGS",
            SummaryMetric::Expenses => "Expenses",
            SummaryMetric::ProfitMargin => "Profit Margin",
            SummaryMetric::ProfitMarginPct => "Profit Margin (%)",
        }
    }

    pub fn value(&self, row: &FinancialRow) -> f64 {
        match self {
            SummaryMetric::Revenue => row.consolidated,
            SummaryMetric::Cogs => row.cogs,
            SummaryMetric::Expenses => row.total_expenses,
            SummaryMetric::ProfitMargin => row.profit_margin,
            SummaryMetric::ProfitMarginPct => row.profit_margin_pct,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetricSummary {
    pub metric: SummaryMetric,
    pub name: String,
    /// Values in year order, for sparkline rendering
    pub series: Vec<f64>,
    pub mean: f64,
    pub first: f64,
    pub last: f64,
    pub change: f64,
    pub trend: Trend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MultiYearSummary {
    pub first_year: i32,
    pub last_year: i32,
    pub year_count: usize,
    pub years: Vec<i32>,
    pub labels: Vec<String>,
    /// Sum of Consolidated across all years
    pub total_revenue: f64,
    /// Arithmetic mean of Profit Margin (%) across all years
    pub average_profit_margin_pct: f64,
    /// Sum of Total Expenses across all years
    pub total_expenses: f64,
    pub metrics: Vec<MetricSummary>,
}

impl MultiYearSummary {
    pub fn metric(&self, metric: SummaryMetric) -> Option<&MetricSummary> {
        self.metrics.iter().find(|m| m.metric == metric)
    }
}

pub fn multi_year_summary(table: &FinancialTable) -> MultiYearSummary {
    let rows = table.rows();

    let metrics: Vec<MetricSummary> = SummaryMetric::ALL
        .iter()
        .map(|metric| summarize_metric(*metric, rows))
        .collect();

    MultiYearSummary {
        first_year: table.first().year,
        last_year: table.last().year,
        year_count: rows.len(),
        years: table.years(),
        labels: rows.iter().map(|r| r.label.clone()).collect(),
        total_revenue: rows.iter().map(|r| r.consolidated).sum(),
        average_profit_margin_pct: mean(
            &rows.iter().map(|r| r.profit_margin_pct).collect::<Vec<_>>(),
        )
        .unwrap_or_default(),
        total_expenses: rows.iter().map(|r| r.total_expenses).sum(),
        metrics,
    }
}

fn summarize_metric(metric: SummaryMetric, rows: &[FinancialRow]) -> MetricSummary {
    let series: Vec<f64> = rows.iter().map(|r| metric.value(r)).collect();
    let first = series.first().copied().unwrap_or_default();
    let last = series.last().copied().unwrap_or_default();

    MetricSummary {
        metric,
        name: metric.name().to_string(),
        mean: mean(&series).unwrap_or_default(),
        first,
        last,
        change: last - first,
        trend: Trend::between(first, last),
        series,
    }
}

use crate::error::{FinancialViewError, Result};
use crate::ingestion::parse_upload;
use crate::normalize::normalize_with_aliases;
use crate::sample::sample_table;
use crate::schema::{DashboardConfig, FinancialTable};
use crate::series::{
    cumulative_revenue, expense_breakdown, margin_series, revenue_bridge, unit_revenue_series,
    CumulativeRevenue, ExpenseBreakdown, MarginSeries, RevenueBridge, UnitRevenueSeries,
};
use crate::statements::{
    balance_sheet_summary, income_statement, profit_and_loss_summary, BalanceSheetSummary,
    IncomeStatement, ProfitAndLossSummary,
};
use crate::summary::{multi_year_summary, MultiYearSummary};
use log::{debug, info, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum DerivedViewKind {
    UnitRevenueSeries,
    MarginSeries,
    CumulativeRevenue,
    ExpenseBreakdown,
    MultiYearSummary,
    IncomeStatement,
    ProfitAndLossSummary,
    BalanceSheetSummary,
}

impl DerivedViewKind {
    pub fn title(&self) -> &'static str {
        match self {
            DerivedViewKind::UnitRevenueSeries => "Business Unit Revenue",
            DerivedViewKind::MarginSeries => "Profit Margin",
            DerivedViewKind::CumulativeRevenue => "Cumulative Revenue",
            DerivedViewKind::ExpenseBreakdown => "Expenses",
            DerivedViewKind::MultiYearSummary => "Performance Summary",
            DerivedViewKind::IncomeStatement => "Income Statement",
            DerivedViewKind::ProfitAndLossSummary => "P&L Summary",
            DerivedViewKind::BalanceSheetSummary => "Balance Sheet Summary",
        }
    }
}

/// Every derived view for one table snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Dashboard {
    pub unit_revenue: UnitRevenueSeries,
    pub margins: MarginSeries,
    pub cumulative_revenue: CumulativeRevenue,
    pub revenue_bridge: RevenueBridge,
    pub expenses: ExpenseBreakdown,
    pub summary: MultiYearSummary,
    pub income_statement: IncomeStatement,
    pub profit_and_loss: ProfitAndLossSummary,
    pub balance_sheet: BalanceSheetSummary,
}

impl Dashboard {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(Dashboard)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::generate_json_schema())
    }
}

/// Computes every view from `table`.
///
/// The only failure is `YearNotFound` when `config.statement_year` names a
/// year the table does not contain.
pub fn build_dashboard(table: &FinancialTable, config: &DashboardConfig) -> Result<Dashboard> {
    config.validate()?;

    let year = config.statement_year;
    debug!(
        "Building dashboard over {} rows (statement year: {:?})",
        table.len(),
        year
    );

    let dashboard = Dashboard {
        unit_revenue: unit_revenue_series(table),
        margins: margin_series(table),
        cumulative_revenue: cumulative_revenue(table),
        revenue_bridge: revenue_bridge(table, year)?,
        expenses: expense_breakdown(table, config.footing_tolerance),
        summary: multi_year_summary(table),
        income_statement: income_statement(table, year, config.budget.as_ref())?,
        profit_and_loss: profit_and_loss_summary(table, year)?,
        balance_sheet: balance_sheet_summary(table, year, config.balance_tolerance)?,
    };

    info!(
        "Built dashboard for years {}..={} (statement year {})",
        dashboard.summary.first_year, dashboard.summary.last_year, dashboard.income_statement.year
    );

    Ok(dashboard)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Sample,
    Upload { filename: String },
}

/// Result of one upload attempt. A rejected upload leaves the session on its
/// previous table.
#[derive(Debug)]
pub struct UploadOutcome {
    pub accepted: bool,
    pub status: String,
    pub error: Option<FinancialViewError>,
}

/// Holds the table a session is currently rendering.
///
/// The table is shared as an immutable snapshot; a successful upload swaps in
/// a new `Arc` rather than mutating the old table, so renders already holding
/// a snapshot are unaffected.
#[derive(Debug, Clone)]
pub struct DashboardSession {
    table: Arc<FinancialTable>,
    source: DataSource,
    config: DashboardConfig,
}

impl DashboardSession {
    /// Starts a session on the bundled sample.
    pub fn new(config: DashboardConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            table: Arc::new(sample_table()?),
            source: DataSource::Sample,
            config,
        })
    }

    pub fn with_table(
        table: FinancialTable,
        source: DataSource,
        config: DashboardConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            table: Arc::new(table),
            source,
            config,
        })
    }

    pub fn snapshot(&self) -> Arc<FinancialTable> {
        Arc::clone(&self.table)
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn status(&self) -> String {
        match &self.source {
            DataSource::Sample => "Using built-in sample data (no file uploaded).".to_string(),
            DataSource::Upload { filename } => {
                format!("File '{}' uploaded and parsed successfully.", filename)
            }
        }
    }

    /// Parses and validates an upload, replacing the current table only when
    /// every view can be built from it under the session's config.
    pub fn load_upload(&mut self, bytes: &[u8], filename: &str) -> UploadOutcome {
        let parsed = parse_upload(bytes, filename)
            .and_then(|raw| normalize_with_aliases(&raw, &self.config.column_aliases))
            .and_then(|table| build_dashboard(&table, &self.config).map(|_| table));

        match parsed {
            Ok(table) => {
                info!("Accepted upload '{}' with {} rows", filename, table.len());
                self.table = Arc::new(table);
                self.source = DataSource::Upload {
                    filename: filename.to_string(),
                };
                UploadOutcome {
                    accepted: true,
                    status: self.status(),
                    error: None,
                }
            }
            Err(e) => {
                warn!("Rejected upload '{}': {}", filename, e);
                let fallback = match &self.source {
                    DataSource::Sample => "Falling back to built-in sample data.".to_string(),
                    DataSource::Upload { filename } => {
                        format!("Keeping previously loaded file '{}'.", filename)
                    }
                };
                UploadOutcome {
                    accepted: false,
                    status: format!(
                        "Failed to parse uploaded file '{}': {}. {}",
                        filename, e, fallback
                    ),
                    error: Some(e),
                }
            }
        }
    }

    pub fn reset_to_sample(&mut self) -> Result<()> {
        self.table = Arc::new(sample_table()?);
        self.source = DataSource::Sample;
        Ok(())
    }

    pub fn dashboard(&self) -> Result<Dashboard> {
        build_dashboard(&self.table, &self.config)
    }
}

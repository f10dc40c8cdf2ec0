//! # Financial View Builder
//!
//! A library for turning a small yearly financial table (an uploaded CSV or
//! spreadsheet, or the bundled sample) into the chart and table views of a
//! financial dashboard.
//!
//! ## Core Concepts
//!
//! - **Raw Table**: header plus cells exactly as read from the upload
//! - **Financial Table**: the validated, year-ordered dataset; column aliases resolved,
//!   every required value numeric
//! - **Series Views**: unit revenue, profit margin, cumulative revenue and expense
//!   composition per year
//! - **Summary**: multi-year totals, averages and up/down/flat trends per metric
//! - **Statements**: income statement, P&L summary and balance sheet summary for one selected year
//! - **Descriptive discrepancies**: figures that do not reconcile are reported, never corrected
//!
//! ## Example
//!
//! ```rust,ignore
//! use financial_view_builder::*;
//!
//! let bytes = std::fs::read("financials.csv")?;
//! let dashboard = process_upload(&bytes, "financials.csv", &DashboardConfig::default())?;
//!
//! println!("{}", dashboard.income_statement.to_markdown());
//! println!("Cumulative revenue: {:?}", dashboard.cumulative_revenue.values());
//! ```

pub mod dashboard;
pub mod error;
pub mod ingestion;
pub mod normalize;
pub mod report;
pub mod sample;
pub mod schema;
pub mod series;
pub mod statements;
pub mod summary;
pub mod utils;

pub use dashboard::{
    build_dashboard, Dashboard, DashboardSession, DataSource, DerivedViewKind, UploadOutcome,
};
pub use error::{FinancialViewError, Result, ValidationErrorKind};
pub use ingestion::{parse_upload, RawCell, RawTable, UploadFormat};
pub use normalize::{normalize, normalize_with_aliases};
pub use report::TabularReport;
pub use sample::{sample_budget, sample_table};
pub use schema::*;
pub use series::*;
pub use statements::*;
pub use summary::*;

use log::{debug, info};

pub struct FinancialViewProcessor;

impl FinancialViewProcessor {
    /// Validates a raw table and computes every view from it.
    pub fn process(raw: &RawTable, config: &DashboardConfig) -> Result<Dashboard> {
        config.validate()?;

        debug!(
            "Processing table with {} columns and {} rows",
            raw.headers().len(),
            raw.rows().len()
        );

        let table = normalize_with_aliases(raw, &config.column_aliases)?;
        info!(
            "Validated financial table covering {} years ({}..={})",
            table.len(),
            table.first().year,
            table.last().year
        );

        build_dashboard(&table, config)
    }

    /// Parses uploaded bytes, then behaves like [`FinancialViewProcessor::process`].
    pub fn process_upload(
        bytes: &[u8],
        filename: &str,
        config: &DashboardConfig,
    ) -> Result<Dashboard> {
        let raw = parse_upload(bytes, filename)?;
        Self::process(&raw, config)
    }
}

pub fn process_table(raw: &RawTable, config: &DashboardConfig) -> Result<Dashboard> {
    FinancialViewProcessor::process(raw, config)
}

pub fn process_upload(bytes: &[u8], filename: &str, config: &DashboardConfig) -> Result<Dashboard> {
    FinancialViewProcessor::process_upload(bytes, filename, config)
}

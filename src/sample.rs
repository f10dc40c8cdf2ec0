//! Built-in dataset shown before anything is uploaded.
//!
//! The sample is stored as CSV text and goes through the same ingestion and
//! normalization path as an upload, so it is held to the same schema. It uses
//! the legacy `Total` header and relative year labels (`Year -4` .. `Year 0`);
//! balance sheet figures are only known for the latest year.

use crate::error::Result;
use crate::ingestion::{read_csv, RawTable};
use crate::normalize::normalize;
use crate::schema::{BudgetFigures, FinancialTable};

pub const SAMPLE_FILENAME: &str = "sample.csv";

pub const SAMPLE_CSV: &str = "\
Year,Business 1,Business 2,Business 3,Consolidated,COGS,Profit Margin ($),Profit Margin (%),\
Salaries and Benefits,Rent and Overhead,Depreciation & Amortization,Interest,Total,\
Current Assets,Non-current Assets,Total Assets,Current Liabilities,Long-term Liabilities,\
Shareholders' Equity,Liabilities & Shareholders' Equity
Year -4,102007,156387,134622,393016,207069,26063,0.07,70854,32789,48741,7500,159884,,,,,,,
Year -3,118086,158882,138520,415488,206012,34177,0.08,77974,35375,54450,7500,175299,,,,,,,
Year -2,131345,160034,143362,434741,218369,43380,0.10,81616,35261,51615,4500,172992,,,,,,,
Year -1,142341,174988,145897,463226,227962,64068,0.14,79006,38060,49631,4500,171197,,,,,,,
Year 0,150772,191520,148631,490923,243130,70081,0.14,85735,39236,48241,4500,177712,\
395685,589610,985295,135374,384962,464959,985295
";

pub fn sample_raw_table() -> Result<RawTable> {
    read_csv(SAMPLE_CSV.as_bytes(), SAMPLE_FILENAME)
}

pub fn sample_table() -> Result<FinancialTable> {
    normalize(&sample_raw_table()?)
}

/// Budget for the latest sample year.
pub fn sample_budget() -> BudgetFigures {
    BudgetFigures {
        revenue: 475_000.0,
        cogs: 238_000.0,
        expenses: 186_000.0,
        profit_margin: 73_500.0,
        profit_margin_pct: 0.155,
    }
}

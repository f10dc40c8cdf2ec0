use crate::error::{FinancialViewError, Result};
use crate::ingestion::{RawCell, RawTable};
use crate::schema::{
    ColumnAliases, FinancialRow, FinancialTable, NUMERIC_COLUMNS, REQUIRED_COLUMNS, YEAR,
};
use crate::utils::{float_to_year, parse_numeric, parse_year_label};
use chrono::Datelike;
use log::debug;
use std::collections::BTreeMap;

/// Validates a raw table against the required schema using the default
/// alias table (`Total` → `Total Expenses`).
pub fn normalize(raw: &RawTable) -> Result<FinancialTable> {
    normalize_with_aliases(raw, &ColumnAliases::default())
}

pub fn normalize_with_aliases(raw: &RawTable, aliases: &ColumnAliases) -> Result<FinancialTable> {
    let headers = resolve_headers(raw.headers(), aliases);

    let year_idx = required_index(&headers, YEAR)?;
    let mut numeric_idx = [0usize; 12];
    for (slot, column) in numeric_idx.iter_mut().zip(NUMERIC_COLUMNS) {
        *slot = required_index(&headers, column)?;
    }

    if raw.rows().is_empty() {
        return Err(FinancialViewError::EmptyTable);
    }

    let extra_idx: Vec<(usize, &str)> = headers
        .iter()
        .enumerate()
        .filter(|(idx, name)| {
            !name.is_empty()
                && !REQUIRED_COLUMNS.contains(&name.as_str())
                && headers.iter().position(|h| h == *name) == Some(*idx)
        })
        .map(|(idx, name)| (idx, name.as_str()))
        .collect();

    let mut rows = Vec::with_capacity(raw.rows().len());
    for (i, cells) in raw.rows().iter().enumerate() {
        let row_number = i + 1;

        let year_cell = &cells[year_idx];
        let year = coerce_year(year_cell).ok_or_else(|| non_numeric(YEAR, row_number, year_cell))?;

        let mut values = [0.0; 12];
        for ((value, &idx), column) in values.iter_mut().zip(&numeric_idx).zip(NUMERIC_COLUMNS) {
            let cell = &cells[idx];
            *value = coerce_number(cell).ok_or_else(|| non_numeric(column, row_number, cell))?;
        }

        let mut row = FinancialRow::from_values(year, year_cell.to_string(), values);
        row.extra = extra_idx
            .iter()
            .filter_map(|&(idx, name)| coerce_number(&cells[idx]).map(|v| (name.to_string(), v)))
            .collect::<BTreeMap<_, _>>();

        rows.push(row);
    }

    let extra_columns = extra_idx.iter().map(|(_, name)| name.to_string()).collect();

    debug!(
        "Normalized {} rows with {} extra columns",
        rows.len(),
        extra_idx.len()
    );

    FinancialTable::from_rows(rows, extra_columns)
}

/// Trims header cells and applies aliases whose canonical column is absent.
pub fn resolve_headers(headers: &[String], aliases: &ColumnAliases) -> Vec<String> {
    let mut resolved: Vec<String> = headers
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    for (alias, canonical) in aliases.iter() {
        if resolved.iter().any(|h| h == canonical) {
            continue;
        }
        if let Some(header) = resolved.iter_mut().find(|h| h.as_str() == alias) {
            debug!("Renaming column '{}' to '{}'", alias, canonical);
            *header = canonical.to_string();
        }
    }

    resolved
}

fn required_index(headers: &[String], column: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| FinancialViewError::MissingColumn {
            column: column.to_string(),
        })
}

fn coerce_number(cell: &RawCell) -> Option<f64> {
    match cell {
        RawCell::Number(n) if n.is_finite() => Some(*n),
        RawCell::Text(s) => parse_numeric(s),
        _ => None,
    }
}

fn coerce_year(cell: &RawCell) -> Option<i32> {
    match cell {
        RawCell::Number(n) => float_to_year(*n),
        RawCell::Date(d) => Some(d.year()),
        RawCell::Text(s) => parse_year_label(s),
        RawCell::Empty => None,
    }
}

fn non_numeric(column: &str, row: usize, cell: &RawCell) -> FinancialViewError {
    FinancialViewError::NonNumericValue {
        column: column.to_string(),
        row,
        value: cell.to_string(),
    }
}

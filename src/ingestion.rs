//! Upload boundary: turns raw file bytes into a rectangular table of cells.
//!
//! Nothing here knows about the financial schema. Any failure to read the
//! container (corrupt workbook, invalid UTF-8, ragged CSV) is reported as
//! `FinancialViewError::UnreadableFile` before normalization sees the data.

use crate::error::{FinancialViewError, Result};
use crate::utils::excel_serial_to_date;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::NaiveDate;
use log::debug;
use std::fmt;
use std::io::Cursor;

#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl RawCell {
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            Self::Empty
        } else {
            Self::Text(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl fmt::Display for RawCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(s) => write!(f, "{}", s.trim()),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{}", n),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<&str> for RawCell {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<f64> for RawCell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// A header row plus data rows, every row padded to the header width.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<RawCell>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<RawCell>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, RawCell::Empty);
                row
            })
            .collect();

        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<RawCell>] {
        &self.rows
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Csv,
    Spreadsheet,
}

impl UploadFormat {
    /// `.csv` (any case) is CSV; everything else goes to the spreadsheet
    /// reader, which detects xlsx/xlsm/xlsb/xls/ods from the container.
    pub fn from_filename(filename: &str) -> Self {
        if filename.to_lowercase().ends_with(".csv") {
            Self::Csv
        } else {
            Self::Spreadsheet
        }
    }
}

pub fn parse_upload(bytes: &[u8], filename: &str) -> Result<RawTable> {
    let table = match UploadFormat::from_filename(filename) {
        UploadFormat::Csv => read_csv(bytes, filename)?,
        UploadFormat::Spreadsheet => read_spreadsheet(bytes, filename)?,
    };

    debug!(
        "Parsed '{}': {} columns, {} data rows",
        filename,
        table.headers().len(),
        table.rows().len()
    );

    Ok(table)
}

pub fn read_csv(bytes: &[u8], filename: &str) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| FinancialViewError::unreadable(filename, e))?
        .iter()
        .map(str::to_string)
        .collect();

    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(FinancialViewError::unreadable(filename, "no header row"));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| FinancialViewError::unreadable(filename, e))?;
        rows.push(record.iter().map(RawCell::text).collect());
    }

    Ok(RawTable::new(headers, rows))
}

/// Reads the first worksheet of a workbook held in memory.
pub fn read_spreadsheet(bytes: &[u8], filename: &str) -> Result<RawTable> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| FinancialViewError::unreadable(filename, e))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| FinancialViewError::unreadable(filename, "workbook has no worksheets"))?
        .map_err(|e| FinancialViewError::unreadable(filename, e))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| FinancialViewError::unreadable(filename, "no header row"))?
        .iter()
        .map(|cell| cell_to_raw(cell).to_string())
        .collect();

    let data = rows
        .filter(|r| r.iter().any(|c| !matches!(c, Data::Empty)))
        .map(|r| r.iter().map(cell_to_raw).collect())
        .collect();

    Ok(RawTable::new(headers, data))
}

fn cell_to_raw(cell: &Data) -> RawCell {
    match cell {
        Data::String(v) => RawCell::text(v.as_str()),
        Data::Float(v) => RawCell::Number(*v),
        Data::Int(v) => RawCell::Number(*v as f64),
        Data::Bool(v) => RawCell::Text(v.to_string()),
        Data::DateTime(v) => match excel_serial_to_date(v.as_f64()) {
            Some(date) => RawCell::Date(date),
            None => RawCell::Number(v.as_f64()),
        },
        Data::DateTimeIso(v) => RawCell::text(v.as_str()),
        Data::DurationIso(v) => RawCell::text(v.as_str()),
        Data::Error(v) => RawCell::Text(format!("{v:?}")),
        Data::Empty => RawCell::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_csv_basic() {
        let csv = "Year,Consolidated\n2021,100\n2022,\"1,500\"\n";
        let table = read_csv(csv.as_bytes(), "data.csv").unwrap();

        assert_eq!(table.headers(), &["Year".to_string(), "Consolidated".to_string()]);
        assert_eq!(table.rows().len(), 2);
        assert_eq!(table.rows()[1][1], RawCell::Text("1,500".to_string()));
        assert_eq!(table.column_index("Consolidated"), Some(1));
    }

    #[test]
    fn test_read_csv_blank_cells_are_empty() {
        let csv = "Year,Total Assets\n2021,\n2022, \n";
        let table = read_csv(csv.as_bytes(), "data.csv").unwrap();
        assert!(table.rows()[0][1].is_empty());
        assert!(table.rows()[1][1].is_empty());
    }

    #[test]
    fn test_ragged_csv_is_unreadable() {
        let csv = "Year,Consolidated\n2021,100,999\n";
        let err = read_csv(csv.as_bytes(), "bad.csv").unwrap_err();
        match err {
            FinancialViewError::UnreadableFile { filename, .. } => assert_eq!(filename, "bad.csv"),
            other => panic!("expected UnreadableFile, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_csv_is_unreadable() {
        let err = read_csv(b"", "empty.csv").unwrap_err();
        assert!(matches!(err, FinancialViewError::UnreadableFile { .. }));
    }

    #[test]
    fn test_invalid_utf8_csv_is_unreadable() {
        let bytes = b"Year,Consolidated\n2021,\xff\xfe\n";
        let err = read_csv(bytes, "latin1.csv").unwrap_err();
        assert!(matches!(err, FinancialViewError::UnreadableFile { .. }));
    }

    #[test]
    fn test_garbage_spreadsheet_is_unreadable() {
        let err = parse_upload(b"definitely not a zip archive", "report.xlsx").unwrap_err();
        match err {
            FinancialViewError::UnreadableFile { filename, .. } => {
                assert_eq!(filename, "report.xlsx")
            }
            other => panic!("expected UnreadableFile, got {other:?}"),
        }
    }

    fn xlsx_upload() -> Vec<u8> {
        use crate::schema::REQUIRED_COLUMNS;
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");

        for (col, name) in REQUIRED_COLUMNS.iter().chain(["Total Assets"].iter()).enumerate() {
            sheet.write_string(0, col as u16, *name).unwrap();
        }

        // year as a plain number, no Total Assets value
        sheet.write_number(1, 0, 2021.0).unwrap();
        let values = [40.0, 30.0, 30.0, 100.0, 40.0, 15.0, 0.15, 20.0, 10.0, 5.0, 5.0, 40.0];
        for (col, value) in values.iter().enumerate() {
            sheet.write_number(1, col as u16 + 1, *value).unwrap();
        }

        // year as a fiscal year-end date
        let year_end = ExcelDateTime::from_ymd(2022, 12, 31).unwrap();
        sheet
            .write_datetime_with_format(2, 0, &year_end, &date_format)
            .unwrap();
        let values = [50.0, 50.0, 50.0, 150.0, 60.0, 20.0, 0.1333, 30.0, 10.0, 5.0, 5.0, 50.0];
        for (col, value) in values.iter().enumerate() {
            sheet.write_number(2, col as u16 + 1, *value).unwrap();
        }
        sheet.write_number(2, 13, 985_295.0).unwrap();

        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_read_xlsx_first_worksheet() {
        let bytes = xlsx_upload();
        let raw = parse_upload(&bytes, "financials.xlsx").unwrap();

        assert_eq!(raw.headers().len(), 14);
        assert_eq!(raw.headers()[0], "Year");
        assert_eq!(raw.rows().len(), 2);
        assert_eq!(raw.rows()[0][0], RawCell::Number(2021.0));
        assert_eq!(
            raw.rows()[1][0],
            RawCell::Date(NaiveDate::from_ymd_opt(2022, 12, 31).unwrap())
        );
        assert!(raw.rows()[0][13].is_empty());

        let table = crate::normalize::normalize(&raw).unwrap();
        assert_eq!(table.years(), vec![2021, 2022]);
        assert_eq!(table.first().label, "2021");
        assert_eq!(table.last().label, "2022-12-31");
        assert_eq!(table.last().consolidated, 150.0);
        assert_eq!(table.extra_columns(), &["Total Assets".to_string()]);
        assert!(table.first().extra.is_empty());
        assert_eq!(table.last().extra.get("Total Assets"), Some(&985_295.0));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(UploadFormat::from_filename("data.CSV"), UploadFormat::Csv);
        assert_eq!(UploadFormat::from_filename("data.xlsx"), UploadFormat::Spreadsheet);
        assert_eq!(UploadFormat::from_filename("data.ods"), UploadFormat::Spreadsheet);
    }

    #[test]
    fn test_raw_table_pads_short_rows() {
        let table = RawTable::new(
            vec!["A".to_string(), "B".to_string()],
            vec![vec![RawCell::Number(1.0)]],
        );
        assert_eq!(table.rows()[0], vec![RawCell::Number(1.0), RawCell::Empty]);
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(RawCell::Number(2021.0).to_string(), "2021");
        assert_eq!(RawCell::Number(0.14).to_string(), "0.14");
        assert_eq!(RawCell::text("  FY2023 ").to_string(), "FY2023");
        assert_eq!(
            RawCell::Date(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()).to_string(),
            "2023-12-31"
        );
    }
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinancialViewError {
    #[error("Unreadable file '{filename}': {reason}")]
    UnreadableFile { filename: String, reason: String },

    #[error("Missing column in uploaded file: {column}")]
    MissingColumn { column: String },

    #[error("Non-numeric value '{value}' in column '{column}' at row {row}")]
    NonNumericValue {
        column: String,
        /// 1-based data row in input order, header excluded
        row: usize,
        value: String,
    },

    #[error("No row found for year {0}")]
    YearNotFound(i32),

    #[error("Table contains a header but no data rows")]
    EmptyTable,

    #[error("Invalid tolerance {0}: must be finite and non-negative")]
    InvalidTolerance(f64),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Coarse classification used by callers that only care which validation
/// stage rejected a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationErrorKind {
    UnreadableFile,
    MissingColumn,
    NonNumericValue,
    YearNotFound,
    Other,
}

impl FinancialViewError {
    pub fn kind(&self) -> ValidationErrorKind {
        match self {
            Self::UnreadableFile { .. } => ValidationErrorKind::UnreadableFile,
            Self::MissingColumn { .. } => ValidationErrorKind::MissingColumn,
            Self::NonNumericValue { .. } => ValidationErrorKind::NonNumericValue,
            Self::YearNotFound(_) => ValidationErrorKind::YearNotFound,
            _ => ValidationErrorKind::Other,
        }
    }

    pub(crate) fn unreadable(filename: &str, reason: impl ToString) -> Self {
        Self::UnreadableFile {
            filename: filename.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FinancialViewError>;

use std::path::PathBuf;

use thiserror::Error;

use crate::model::LogicalColumn;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Error type covering the fatal failures of a reconciliation run.
///
/// Per-row parse problems, unmatched ledger periods and unknown categories are
/// recoverable and never surface here; they are reported through the run log.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when a deployment profile cannot be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors raised while loading or saving the master ledger workbook.
    #[error("ledger workbook error: {0}")]
    LedgerBook(String),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Raised when the required source columns cannot be located by any fallback.
    #[error("cannot detect source columns (missing: {})", join_columns(.missing))]
    Detection { missing: Vec<LogicalColumn> },

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when a workbook does not contain the requested sheet.
    #[error("sheet '{sheet}' not found in {}", .path.display())]
    MissingSheet { path: PathBuf, sheet: String },

    /// Raised when the requested start row lies outside the source sheet.
    #[error("start row {start_row} is out of range (sheet has {max_row} rows)")]
    StartRowOutOfRange { start_row: usize, max_row: usize },

    /// Raised when a cell cannot be interpreted as a month.
    #[error("cannot parse month value: {0}")]
    MonthParse(String),

    /// Raised when a deployment profile is internally inconsistent.
    #[error("invalid deployment profile: {0}")]
    InvalidProfile(String),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

fn join_columns(columns: &[LogicalColumn]) -> String {
    columns
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

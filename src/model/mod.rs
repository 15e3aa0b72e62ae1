use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;

/// Three-letter month abbreviations used by the canonical period format.
pub const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Untyped spreadsheet cell value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
}

impl CellValue {
    /// Returns `true` for missing cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// Renders the cell as plain text. Integral numbers drop their fraction.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(text) => text.clone(),
            CellValue::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                format!("{}", *value as i64)
            }
            CellValue::Number(value) => value.to_string(),
            CellValue::Bool(value) => value.to_string(),
            CellValue::Date(value) => value.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// Uppercase trimmed text, the form header and status matching works on.
    pub fn normalized(&self) -> String {
        self.to_text().trim().to_uppercase()
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_string())
        }
    }
}

/// Rectangular grid of cells addressed by zero-based row and column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Grid {
    rows: Vec<Vec<CellValue>>,
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl Grid {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    /// Number of rows, counting leading blank rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn row(&self, row: usize) -> &[CellValue] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the cell at the given position; out-of-bounds reads are empty.
    pub fn get(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Stores a value, growing the grid when the position lies outside it.
    pub fn set(&mut self, row: usize, col: usize, value: CellValue) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, CellValue::Empty);
        }
        cells[col] = value;
    }

    /// Iterates over every non-empty cell as `(row, col, value)`.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, &CellValue)> {
        self.rows.iter().enumerate().flat_map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .filter(|(_, cell)| !matches!(cell, CellValue::Empty))
                .map(move |(col, cell)| (row, col, cell))
        })
    }
}

/// Logical columns located in the source log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalColumn {
    RowNumber,
    Month,
    Status,
    ActualQuantity,
    Facility,
    Nomination,
}

impl LogicalColumn {
    /// Every logical column, in detection order.
    pub const ALL: [LogicalColumn; 6] = [
        LogicalColumn::RowNumber,
        LogicalColumn::Month,
        LogicalColumn::Status,
        LogicalColumn::ActualQuantity,
        LogicalColumn::Facility,
        LogicalColumn::Nomination,
    ];
}

impl fmt::Display for LogicalColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogicalColumn::RowNumber => "row-number",
            LogicalColumn::Month => "month",
            LogicalColumn::Status => "status",
            LogicalColumn::ActualQuantity => "actual-quantity",
            LogicalColumn::Facility => "facility",
            LogicalColumn::Nomination => "nomination",
        };
        f.write_str(name)
    }
}

/// Position of every detected logical column plus the header row it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub columns: BTreeMap<LogicalColumn, usize>,
    pub header_row: usize,
}

impl ColumnMap {
    pub fn get(&self, column: LogicalColumn) -> Option<usize> {
        self.columns.get(&column).copied()
    }
}

/// One source row that survived range slicing and status filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    /// Zero-based row index in the source grid.
    pub index: usize,
    pub cells: BTreeMap<LogicalColumn, CellValue>,
}

impl SourceRow {
    pub fn cell(&self, column: LogicalColumn) -> &CellValue {
        self.cells.get(&column).unwrap_or(&EMPTY_CELL)
    }
}

pub type FilteredView = Vec<SourceRow>;

/// Canonical year-month key joining aggregated totals to ledger rows.
///
/// Renders as a three-letter month plus two-digit year, e.g. `Aug-25`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeriodKey {
    year: i32,
    month: u32,
}

impl PeriodKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Case-insensitive comparison against a rendered period label.
    pub fn matches_label(&self, label: &str) -> bool {
        label.trim().eq_ignore_ascii_case(&self.to_string())
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = MONTH_ABBREVIATIONS[(self.month - 1) as usize];
        write!(f, "{name}-{:02}", self.year.rem_euclid(100))
    }
}

impl FromStr for PeriodKey {
    type Err = ReconcileError;

    /// Parses labels such as `Aug-25`, `AUG 2025` or `aug/25`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ReconcileError::MonthParse(value.to_string());
        let letters: String = value
            .chars()
            .filter(char::is_ascii_alphabetic)
            .take(3)
            .collect::<String>()
            .to_ascii_lowercase();
        let month = MONTH_ABBREVIATIONS
            .iter()
            .position(|name| name.eq_ignore_ascii_case(&letters))
            .ok_or_else(invalid)?;
        let digits: String = value.chars().filter(char::is_ascii_digit).collect();
        let year = match digits.len() {
            2 => 2000 + digits.parse::<i32>().map_err(|_| invalid())?,
            4 => digits.parse::<i32>().map_err(|_| invalid())?,
            _ => return Err(invalid()),
        };
        Ok(Self {
            year,
            month: month as u32 + 1,
        })
    }
}

/// Period → category → running total.
pub type Totals = BTreeMap<PeriodKey, BTreeMap<String, f64>>;

/// Number of (period, category) cells held by a totals structure.
pub fn cell_count(totals: &Totals) -> usize {
    totals.values().map(BTreeMap::len).sum()
}

/// Snapshot of one master ledger worksheet.
///
/// `edits` records every cell changed since the snapshot was taken so that
/// only those cells are written back to the workbook.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LedgerSheet {
    pub name: String,
    pub cells: Grid,
    /// Formulas keyed by `(row, col)`, stored without the leading `=`.
    pub formulas: BTreeMap<(usize, usize), String>,
    pub edits: BTreeSet<(usize, usize)>,
}

impl LedgerSheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Replaces a cell value, dropping any formula previously stored there.
    pub fn set_value(&mut self, row: usize, col: usize, value: CellValue) {
        self.formulas.remove(&(row, col));
        self.cells.set(row, col, value);
        self.edits.insert((row, col));
    }
}

use std::path::{Path, PathBuf};

use umya_spreadsheet::{Cell, Spreadsheet, Worksheet};

use crate::error::{ReconcileError, Result};
use crate::io::serial_to_datetime;
use crate::model::{CellValue, LedgerSheet};

/// The master ledger workbook, loaded whole so it can be saved back with its
/// styling, merged ranges and untouched sheets intact.
pub struct LedgerFile {
    path: PathBuf,
    book: Spreadsheet,
}

impl LedgerFile {
    pub fn open(path: &Path) -> Result<Self> {
        let book = umya_spreadsheet::reader::xlsx::read(path)
            .map_err(|err| ReconcileError::LedgerBook(err.to_string()))?;
        Ok(Self {
            path: path.to_path_buf(),
            book,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_sheet(&self, name: &str) -> bool {
        self.book.get_sheet_by_name(name).is_some()
    }

    /// Takes a snapshot of the named worksheet's values and formulas.
    ///
    /// Numeric cells carrying a date number format come back as dates.
    pub fn sheet(&self, name: &str) -> Option<LedgerSheet> {
        self.book
            .get_sheet_by_name(name)
            .map(|worksheet| snapshot(name, worksheet))
    }

    /// Writes the edited cells of `sheet` into the workbook and saves it to
    /// the path it was opened from. Cells outside `sheet.edits` are left as
    /// loaded, styles included.
    pub fn save(&mut self, sheet: &LedgerSheet) -> Result<()> {
        let worksheet = self
            .book
            .get_sheet_by_name_mut(&sheet.name)
            .ok_or_else(|| ReconcileError::MissingSheet {
                path: self.path.clone(),
                sheet: sheet.name.clone(),
            })?;

        for &(row, col) in &sheet.edits {
            let cell = worksheet.get_cell_mut(coordinate(row, col));
            match sheet.cells.get(row, col) {
                CellValue::Number(value) => {
                    cell.set_value_number(*value);
                }
                CellValue::Empty => {
                    cell.set_blank();
                }
                other => {
                    cell.set_value(other.to_text());
                }
            }
        }

        umya_spreadsheet::writer::xlsx::write(&self.book, &self.path)
            .map_err(|err| ReconcileError::LedgerBook(err.to_string()))
    }
}

/// umya addresses cells as one-based `(column, row)`.
fn coordinate(row: usize, col: usize) -> (u32, u32) {
    (col as u32 + 1, row as u32 + 1)
}

fn snapshot(name: &str, worksheet: &Worksheet) -> LedgerSheet {
    let mut sheet = LedgerSheet::new(name);
    for row in 1..=worksheet.get_highest_row() {
        for col in 1..=worksheet.get_highest_column() {
            let Some(cell) = worksheet.get_cell((col, row)) else {
                continue;
            };
            let (row, col) = (row as usize - 1, col as usize - 1);

            let formula = cell.get_formula();
            if !formula.is_empty() {
                sheet
                    .formulas
                    .insert((row, col), formula.trim_start_matches('=').to_string());
            }
            let value = to_cell_value(cell);
            if value != CellValue::Empty {
                sheet.cells.set(row, col, value);
            }
        }
    }
    sheet
}

fn to_cell_value(cell: &Cell) -> CellValue {
    if let Some(number) = cell.get_value_number() {
        let is_date = cell
            .get_style()
            .get_number_format()
            .is_some_and(|format| is_date_format(format.get_format_code()));
        return match serial_to_datetime(number) {
            Some(date) if is_date => CellValue::Date(date),
            _ => CellValue::Number(number),
        };
    }
    let text = cell.get_value().to_string();
    if text.is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(text)
    }
}

/// Whether a number format code renders a date.
///
/// Quoted literals and bracketed sections (colours, locales, elapsed time)
/// are ignored; a lone `m` is ambiguous with minutes so only `mmm` counts.
fn is_date_format(code: &str) -> bool {
    let mut plain = String::with_capacity(code.len());
    let (mut quoted, mut bracketed) = (false, false);
    for ch in code.chars() {
        match ch {
            '"' => quoted = !quoted,
            '[' if !quoted => bracketed = true,
            ']' if !quoted => bracketed = false,
            _ if quoted || bracketed => {}
            _ => plain.push(ch.to_ascii_lowercase()),
        }
    }
    plain.contains('d') || plain.contains('y') || plain.contains("mmm")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_formats_are_told_apart_from_number_formats() {
        for code in ["mmm-yy", "dd/mm/yyyy", "[$-409]mmmm d, yyyy", "m/d/yy h:mm"] {
            assert!(is_date_format(code), "{code} renders a date");
        }
        for code in ["General", "#,##0.00", "0%", "h:mm:ss", "[Red]#,##0", "0 \"days\""] {
            assert!(!is_date_format(code), "{code} renders a number");
        }
    }
}

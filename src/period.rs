use chrono::Datelike;

use crate::error::{ReconcileError, Result};
use crate::model::{CellValue, MONTH_ABBREVIATIONS, PeriodKey};

/// Resolves a month cell into the period key of `year`.
///
/// Dates keep their month and take the target year. Text is reduced to its first
/// three letters (`"1 Aug"`, `"AUG 2025"` and `"Aug-25"` all read as August).
pub fn resolve_month(cell: &CellValue, year: i32) -> Result<PeriodKey> {
    match cell {
        CellValue::Empty => Err(ReconcileError::MonthParse("empty cell".to_string())),
        CellValue::Date(value) => PeriodKey::new(year, value.month())
            .ok_or_else(|| ReconcileError::MonthParse(value.to_string())),
        other => {
            let text = other.to_text();
            let month = month_number(&text)
                .ok_or_else(|| ReconcileError::MonthParse(format!("{:?}", text.trim())))?;
            PeriodKey::new(year, month).ok_or_else(|| ReconcileError::MonthParse(text))
        }
    }
}

/// Looks up the month named by the first three letters of `text`.
fn month_number(text: &str) -> Option<u32> {
    let prefix: String = text
        .chars()
        .filter(char::is_ascii_alphabetic)
        .take(3)
        .collect();
    if prefix.len() < 3 {
        return None;
    }
    MONTH_ABBREVIATIONS
        .iter()
        .position(|name| name.eq_ignore_ascii_case(&prefix))
        .map(|index| index as u32 + 1)
}

//! Writes aggregated totals back into the master ledger.

use tracing::{debug, info, instrument, warn};

use crate::config::{DeploymentProfile, column_index};
use crate::error::{ReconcileError, Result};
use crate::io::ledger_file::LedgerFile;
use crate::model::{CellValue, LedgerSheet, PeriodKey, Totals};

/// Column positions of a ledger sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerLayout {
    pub period_column: usize,
    /// Category name and column, in ledger order.
    pub categories: Vec<(String, usize)>,
}

impl LedgerLayout {
    pub fn from_profile(profile: &DeploymentProfile) -> Result<Self> {
        let letter = |letter: &str| {
            column_index(letter).ok_or_else(|| {
                ReconcileError::InvalidProfile(format!("invalid column letter '{letter}'"))
            })
        };
        let categories = profile
            .ledger_columns
            .iter()
            .map(|column| Ok((column.name.clone(), letter(&column.column)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            period_column: letter(&profile.ledger_period_column)?,
            categories,
        })
    }

    fn column_of(&self, category: &str) -> Option<usize> {
        self.categories
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, col)| *col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WriteOptions {
    pub clear_before_write: bool,
    /// Value cleared cells receive; `None` empties them.
    pub clear_value: Option<f64>,
    pub dry_run: bool,
}

/// Finds the first row whose period cell matches `period`.
///
/// Text cells match case-insensitively on the rendered key, date cells on
/// their year and month.
pub fn find_period_row(sheet: &LedgerSheet, period_column: usize, period: PeriodKey) -> Option<usize> {
    (0..sheet.cells.height()).find(|row| match sheet.cells.get(*row, period_column) {
        CellValue::Text(text) => period.matches_label(text),
        CellValue::Date(date) => PeriodKey::from_date(date.date()) == period,
        _ => false,
    })
}

/// Applies `totals` to `sheet` and returns one log line per change.
///
/// Periods are processed in order. A period without a ledger row is skipped
/// with a warning; with clear-before-write every category cell of a matched
/// row is reset before the new totals go in. In dry-run mode the sheet is
/// left untouched while the log still describes every change.
pub fn apply_totals(
    sheet: &mut LedgerSheet,
    layout: &LedgerLayout,
    totals: &Totals,
    options: &WriteOptions,
) -> Vec<String> {
    let mut logs = Vec::new();

    for (period, by_category) in totals {
        let Some(row) = find_period_row(sheet, layout.period_column, *period) else {
            warn!(%period, sheet = %sheet.name, "period row not found");
            logs.push(format!(
                "[WARN] Month '{period}' not found in master sheet '{}'. Skipped.",
                sheet.name
            ));
            continue;
        };
        debug!(%period, row, "period row located");

        if options.clear_before_write {
            let cleared = options.clear_value.map_or(CellValue::Empty, CellValue::Number);
            for (name, col) in &layout.categories {
                let previous = numeric_or_zero(sheet.cells.get(row, *col));
                if !options.dry_run {
                    sheet.set_value(row, *col, cleared.clone());
                }
                logs.push(format!(
                    "[{period}] {name}: cleared (was {})",
                    format_money(previous)
                ));
            }
        }

        for (name, total) in by_category {
            let Some(col) = layout.column_of(name) else {
                warn!(category = %name, "category column missing from ledger");
                logs.push(format!(
                    "[WARN] Unknown category column '{name}' in master. Skipped."
                ));
                continue;
            };
            let previous = numeric_or_zero(sheet.cells.get(row, col));
            logs.push(format!(
                "[{period}] {name}: set to {} (was {})",
                format_money(*total),
                format_money(previous)
            ));
            if !options.dry_run {
                sheet.set_value(row, col, CellValue::Number(*total));
            }
        }
    }

    logs
}

/// Applies `totals` to the named sheet of `ledger` and saves the workbook in
/// place. Only the cells that changed are written back.
#[instrument(
    level = "info",
    skip_all,
    fields(path = %ledger.path().display(), sheet = sheet_name, dry_run = options.dry_run)
)]
pub fn apply_to_master(
    ledger: &mut LedgerFile,
    sheet_name: &str,
    totals: &Totals,
    layout: &LedgerLayout,
    options: &WriteOptions,
) -> Result<Vec<String>> {
    let mut sheet = ledger
        .sheet(sheet_name)
        .ok_or_else(|| ReconcileError::MissingSheet {
            path: ledger.path().to_path_buf(),
            sheet: sheet_name.to_string(),
        })?;
    let mut logs = apply_totals(&mut sheet, layout, totals, options);

    if options.dry_run {
        logs.push("[DRY-RUN] No changes written.".to_string());
    } else {
        ledger.save(&sheet)?;
        info!(cells = sheet.edits.len(), "ledger saved");
        logs.push(format!("[OK] Saved changes to: {}", ledger.path().display()));
    }
    Ok(logs)
}

fn numeric_or_zero(cell: &CellValue) -> f64 {
    match cell {
        CellValue::Number(value) => *value,
        CellValue::Text(text) => text.replace(',', "").trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Renders a value rounded to whole units with thousands separators.
pub fn format_money(value: f64) -> String {
    let rounded = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3);
    for (index, digit) in rounded.chars().enumerate() {
        if index > 0 && (rounded.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if value < 0.0 && rounded != "0" {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;

    use super::*;

    fn august() -> PeriodKey {
        PeriodKey::new(2025, 8).expect("valid month")
    }

    fn layout() -> LedgerLayout {
        LedgerLayout::from_profile(&DeploymentProfile::default()).expect("default layout")
    }

    fn sheet() -> LedgerSheet {
        let mut sheet = LedgerSheet::new("2025");
        sheet.cells.set(0, 1, CellValue::from("Month/Year"));
        sheet.cells.set(1, 1, CellValue::from("Jul-25"));
        let august = NaiveDate::from_ymd_opt(2025, 8, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid date");
        sheet.cells.set(2, 1, CellValue::Date(august));
        sheet.cells.set(2, 2, CellValue::Number(7.0));
        sheet.cells.set(2, 4, CellValue::Number(1234.0));
        sheet.formulas.insert((2, 4), "SUM(X1:X2)".to_string());
        sheet
    }

    fn totals(period: PeriodKey, values: &[(&str, f64)]) -> Totals {
        let by_category = values
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect();
        BTreeMap::from([(period, by_category)])
    }

    fn options(clear_before_write: bool, dry_run: bool) -> WriteOptions {
        WriteOptions {
            clear_before_write,
            clear_value: None,
            dry_run,
        }
    }

    #[test]
    fn money_formatting_groups_thousands() {
        assert_eq!(format_money(0.0), "0");
        assert_eq!(format_money(999.4), "999");
        assert_eq!(format_money(1234.0), "1,234");
        assert_eq!(format_money(1_234_567.8), "1,234,568");
        assert_eq!(format_money(-1500.0), "-1,500");
    }

    #[test]
    fn finds_rows_by_text_or_date() {
        let sheet = sheet();
        let july = PeriodKey::new(2025, 7).expect("valid month");
        assert_eq!(find_period_row(&sheet, 1, july), Some(1));
        assert_eq!(find_period_row(&sheet, 1, august()), Some(2));
        assert_eq!(find_period_row(&sheet, 1, PeriodKey::new(2024, 8).expect("valid")), None);
    }

    #[test]
    fn clear_then_write_replaces_the_row() {
        let mut sheet = sheet();
        let logs = apply_totals(
            &mut sheet,
            &layout(),
            &totals(august(), &[("Zeus", 500.0)]),
            &options(true, false),
        );

        assert_eq!(sheet.cells.get(2, 2), &CellValue::Empty);
        assert_eq!(sheet.cells.get(2, 3), &CellValue::Number(500.0));
        assert_eq!(sheet.cells.get(2, 4), &CellValue::Empty);
        assert!(sheet.formulas.is_empty());
        assert_eq!(sheet.edits.len(), 11);
        assert!(sheet.edits.contains(&(2, 3)));
        assert_eq!(logs.len(), 12);
        assert_eq!(logs[0], "[Aug-25] Apollo: cleared (was 7)");
        assert_eq!(logs[2], "[Aug-25] Mara: cleared (was 1,234)");
        assert_eq!(logs[11], "[Aug-25] Zeus: set to 500 (was 0)");
    }

    #[test]
    fn without_clear_untouched_categories_survive() {
        let mut sheet = sheet();
        let logs = apply_totals(
            &mut sheet,
            &layout(),
            &totals(august(), &[("Apollo", 10.0)]),
            &options(false, false),
        );
        assert_eq!(logs, vec!["[Aug-25] Apollo: set to 10 (was 7)"]);
        assert_eq!(sheet.cells.get(2, 4), &CellValue::Number(1234.0));
    }

    #[test]
    fn dry_run_logs_without_mutating() {
        let mut sheet = sheet();
        let before = sheet.clone();
        let logs = apply_totals(
            &mut sheet,
            &layout(),
            &totals(august(), &[("Zeus", 500.0)]),
            &options(true, true),
        );
        assert_eq!(sheet, before);
        assert_eq!(logs.last().map(String::as_str), Some("[Aug-25] Zeus: set to 500 (was 0)"));
    }

    #[test]
    fn missing_period_emits_one_warning_and_no_writes() {
        let mut sheet = sheet();
        let before = sheet.clone();
        let december = PeriodKey::new(2025, 12).expect("valid month");
        let logs = apply_totals(
            &mut sheet,
            &layout(),
            &totals(december, &[("Zeus", 1.0), ("Apollo", 2.0)]),
            &options(true, false),
        );
        assert_eq!(
            logs,
            vec!["[WARN] Month 'Dec-25' not found in master sheet '2025'. Skipped."]
        );
        assert_eq!(sheet, before);
    }

    #[test]
    fn unknown_category_is_warned_and_skipped() {
        let mut sheet = sheet();
        let logs = apply_totals(
            &mut sheet,
            &layout(),
            &totals(august(), &[("Hermes", 1.0)]),
            &options(false, false),
        );
        assert_eq!(
            logs,
            vec!["[WARN] Unknown category column 'Hermes' in master. Skipped."]
        );
    }

    #[test]
    fn rewriting_the_same_totals_is_idempotent() {
        let mut sheet = sheet();
        let totals = totals(august(), &[("Zeus", 500.0), ("Apollo", 250.0)]);
        apply_totals(&mut sheet, &layout(), &totals, &options(true, false));
        let first = sheet.clone();
        apply_totals(&mut sheet, &layout(), &totals, &options(true, false));
        assert_eq!(sheet, first);
    }
}

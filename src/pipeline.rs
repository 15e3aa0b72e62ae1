//! End-to-end reconciliation run: source log → totals → master ledger.

use tracing::{info, instrument, warn};

use crate::aggregate::{AggregationSettings, aggregate};
use crate::canonical::Canonicalizer;
use crate::config::{DeploymentProfile, RunOptions};
use crate::detect::detect_columns;
use crate::error::{ReconcileError, Result};
use crate::io::excel_read;
use crate::io::ledger_file::LedgerFile;
use crate::ledger::{self, LedgerLayout, WriteOptions, format_money};
use crate::model::{Grid, Totals, cell_count};
use crate::select::select_rows;

/// Warning returned when nothing could be aggregated.
pub const EMPTY_RESULT_WARNING: &str = "[WARN] No totals aggregated - check the status filter, \
     quantity parsing, nomination mapping, or the month format.";

/// Outcome of a run: the aggregated totals and the ordered change log.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub totals: Totals,
    pub logs: Vec<String>,
}

/// Runs the whole pipeline.
///
/// `progress` receives a short message at each milestone. Only detection and
/// validation failures are returned as errors; everything recoverable ends up
/// in [`RunReport::logs`].
#[instrument(
    level = "info",
    skip_all,
    fields(
        source = %options.source_path.display(),
        master = %options.master_path.display(),
        year = options.target_year
    )
)]
pub fn run<F>(options: &RunOptions, profile: &DeploymentProfile, mut progress: F) -> Result<RunReport>
where
    F: FnMut(&str),
{
    let layout = LedgerLayout::from_profile(profile)?;
    let sheet_name = profile.ledger_sheet_name(options.target_year);
    let (grid, mut ledger) = preflight(options, &sheet_name)?;

    let last_row = options.start_row + options.row_count.saturating_sub(1);
    progress(&format!(
        "Reading barge '{}' rows {}..{}",
        options.source_sheet, options.start_row, last_row
    ));
    info!(rows = grid.height(), "source sheet loaded");

    let columns = detect_columns(
        &grid,
        Some(options.start_row.saturating_sub(1)),
        &profile.header_aliases,
        &profile.fallback_columns,
    )?;
    let selection = select_rows(
        &grid,
        &columns,
        options.start_row,
        options.row_count,
        options.only_completed,
        options.target_year,
    );
    let header = selection
        .header_period
        .map_or_else(|| "-".to_string(), |period| period.to_string());
    progress(&format!(
        "Rows after filter: {} | header_month={header}",
        selection.rows.len()
    ));
    info!(
        header_row = columns.header_row,
        kept = selection.rows.len(),
        "rows selected"
    );

    let settings = AggregationSettings {
        policy: profile.compounding,
        force_header_period: profile.force_header_period,
        period_override: options.period_override,
    };
    let canonicalizer = Canonicalizer::from_profile(profile);
    let totals = aggregate(
        &selection.rows,
        options.target_year,
        selection.header_period,
        &settings,
        &canonicalizer,
    );
    let cells = cell_count(&totals);
    progress(&format!(
        "Aggregated months: {} | cells to write: {cells}",
        totals.len()
    ));
    info!(months = totals.len(), cells, "totals aggregated");

    if cells == 0 {
        warn!("no totals aggregated");
        progress(EMPTY_RESULT_WARNING);
        return Ok(RunReport {
            totals,
            logs: vec![EMPTY_RESULT_WARNING.to_string()],
        });
    }

    progress(&format!(
        "Writing to master sheet '{sheet_name}' (dry_run={}) ...",
        options.dry_run
    ));
    let write_options = WriteOptions {
        clear_before_write: options.clear_before_write,
        clear_value: profile.clear_value,
        dry_run: options.dry_run,
    };
    let logs = ledger::apply_to_master(
        &mut ledger,
        &sheet_name,
        &totals,
        &layout,
        &write_options,
    )?;

    progress("Done.");
    Ok(RunReport { totals, logs })
}

/// Validates the run inputs and loads both workbooks.
///
/// Fails before any processing when a file or sheet is missing or the start
/// row lies outside the source sheet.
pub fn preflight(options: &RunOptions, ledger_sheet: &str) -> Result<(Grid, LedgerFile)> {
    for path in [&options.source_path, &options.master_path] {
        if !path.exists() {
            return Err(ReconcileError::MissingInput(path.clone()));
        }
    }

    let grid = excel_read::read_grid(&options.source_path, &options.source_sheet)?;
    let max_row = grid.height();
    if options.start_row < 1 || options.start_row > max_row {
        return Err(ReconcileError::StartRowOutOfRange {
            start_row: options.start_row,
            max_row,
        });
    }

    let ledger = LedgerFile::open(&options.master_path)?;
    if !ledger.has_sheet(ledger_sheet) {
        return Err(ReconcileError::MissingSheet {
            path: options.master_path.clone(),
            sheet: ledger_sheet.to_string(),
        });
    }

    Ok((grid, ledger))
}

/// Renders totals as one line per period plus a grand total.
///
/// Categories appear in `categories` order; zero totals are left out.
pub fn format_summary(totals: &Totals, categories: &[String]) -> String {
    if totals.is_empty() {
        return "(no totals aggregated)".to_string();
    }

    let mut grand: Vec<f64> = vec![0.0; categories.len()];
    let mut lines = Vec::with_capacity(totals.len() + 1);
    for (period, by_category) in totals {
        let parts: Vec<String> = categories
            .iter()
            .enumerate()
            .filter_map(|(index, name)| {
                let value = by_category.get(name).copied().filter(|value| *value != 0.0)?;
                grand[index] += value;
                Some(format!("{name}={}", format_money(value)))
            })
            .collect();
        lines.push(format!("{period} | {}", parts.join(", ")));
    }

    let grand_parts: Vec<String> = categories
        .iter()
        .zip(&grand)
        .filter(|(_, value)| **value != 0.0)
        .map(|(name, value)| format!("{name}={}", format_money(*value)))
        .collect();
    if !grand_parts.is_empty() {
        lines.push(format!("Total | {}", grand_parts.join(", ")));
    }
    lines.join("\n")
}

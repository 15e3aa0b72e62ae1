//! Header row detection for the source log.
//!
//! Source templates get copy-pasted and shifted around, so the header row is
//! searched for in progressively wider windows and matched against alias
//! lists instead of fixed positions.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use tracing::{debug, warn};

use crate::config::column_index;
use crate::error::{ReconcileError, Result};
use crate::model::{ColumnMap, Grid, LogicalColumn};

/// Rows searched above and below the hint row.
const HINT_ROWS_ABOVE: usize = 50;
const HINT_ROWS_BELOW: usize = 200;
/// Leading rows searched when the hint window fails.
const SHALLOW_SCAN_ROWS: usize = 400;
const DEEP_SCAN_ROWS: usize = 1200;

/// Locates every logical column in `grid`.
///
/// `hint_row` is a zero-based row near which the header is expected. When no
/// search window yields a complete header row the static column letters are
/// used, and a detection error is raised if even those do not fit the grid.
pub fn detect_columns(
    grid: &Grid,
    hint_row: Option<usize>,
    aliases: &BTreeMap<LogicalColumn, Vec<String>>,
    fallback: &BTreeMap<LogicalColumn, String>,
) -> Result<ColumnMap> {
    let height = grid.height();
    let mut windows: Vec<Range<usize>> = Vec::with_capacity(3);
    if let Some(hint) = hint_row {
        windows.push(hint.saturating_sub(HINT_ROWS_ABOVE)..(hint + HINT_ROWS_BELOW).min(height));
    }
    windows.push(0..SHALLOW_SCAN_ROWS.min(height));
    windows.push(0..DEEP_SCAN_ROWS.min(height));

    for window in windows {
        let Some((row, columns)) = best_header_row(grid, window.clone(), aliases) else {
            continue;
        };
        if columns.len() == LogicalColumn::ALL.len() {
            debug!(?window, header_row = row, "header row detected");
            return Ok(ColumnMap {
                columns,
                header_row: row,
            });
        }
        debug!(?window, matched = columns.len(), "incomplete header candidate");
    }

    warn!("no complete header row found, using static column letters");
    fallback_columns(grid, fallback)
}

/// Picks the row in `window` matching the most logical columns.
///
/// Ties go to the earliest row; the scan stops as soon as one row matches
/// every column.
fn best_header_row(
    grid: &Grid,
    window: Range<usize>,
    aliases: &BTreeMap<LogicalColumn, Vec<String>>,
) -> Option<(usize, BTreeMap<LogicalColumn, usize>)> {
    let mut best: Option<(usize, BTreeMap<LogicalColumn, usize>)> = None;
    for row in window {
        let texts: Vec<String> = grid.row(row).iter().map(|cell| cell.normalized()).collect();
        let columns = match_header_cells(&texts, aliases);
        let best_len = best.as_ref().map_or(0, |(_, found)| found.len());
        if columns.len() > best_len {
            let complete = columns.len() == LogicalColumn::ALL.len();
            best = Some((row, columns));
            if complete {
                break;
            }
        }
    }
    best
}

/// Matches one normalised row against the alias table.
///
/// Exact alias matches are assigned first, then the remaining logical columns
/// may claim a still-free cell that merely contains an alias. Within each
/// pass the leftmost cell wins.
pub fn match_header_cells(
    texts: &[String],
    aliases: &BTreeMap<LogicalColumn, Vec<String>>,
) -> BTreeMap<LogicalColumn, usize> {
    let mut columns = BTreeMap::new();
    let mut claimed = BTreeSet::new();

    for (column, names) in aliases {
        let exact = texts.iter().enumerate().position(|(index, text)| {
            !text.is_empty()
                && !claimed.contains(&index)
                && names.iter().any(|alias| text == alias)
        });
        if let Some(index) = exact {
            claimed.insert(index);
            columns.insert(*column, index);
        }
    }

    for (column, names) in aliases {
        if columns.contains_key(column) {
            continue;
        }
        let partial = texts.iter().enumerate().position(|(index, text)| {
            !text.is_empty()
                && !claimed.contains(&index)
                && names.iter().any(|alias| text.contains(alias.as_str()))
        });
        if let Some(index) = partial {
            claimed.insert(index);
            columns.insert(*column, index);
        }
    }

    columns
}

fn fallback_columns(grid: &Grid, fallback: &BTreeMap<LogicalColumn, String>) -> Result<ColumnMap> {
    let width = grid.width();
    let columns: BTreeMap<LogicalColumn, usize> = fallback
        .iter()
        .filter_map(|(column, letter)| {
            column_index(letter)
                .filter(|index| *index < width)
                .map(|index| (*column, index))
        })
        .collect();

    let missing: Vec<LogicalColumn> = LogicalColumn::ALL
        .into_iter()
        .filter(|column| !columns.contains_key(column))
        .collect();
    if !missing.is_empty() {
        return Err(ReconcileError::Detection { missing });
    }

    Ok(ColumnMap {
        columns,
        header_row: 0,
    })
}

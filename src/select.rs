use std::collections::BTreeMap;

use tracing::debug;

use crate::model::{CellValue, ColumnMap, FilteredView, Grid, LogicalColumn, PeriodKey, SourceRow};
use crate::numeric::is_numeric;
use crate::period::resolve_month;

/// Rows scanned from the start of the block when looking for its period.
const HEADER_PERIOD_SCAN_ROWS: usize = 50;

const COMPLETED_STATUSES: [&str; 2] = ["COMPLETE", "COMPLETED"];

/// Rows picked out of the source grid for aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub rows: FilteredView,
    /// Period found near the top of the block, if any.
    pub header_period: Option<PeriodKey>,
    /// Zero-based first row of the block after moving below the header.
    pub first_row: usize,
}

/// Slices the requested block out of `grid` and applies the status filter.
///
/// `start_row` is one-based and `row_count == 0` runs to the end of the grid.
/// A block starting at or above the detected header is moved to the row just
/// below it.
pub fn select_rows(
    grid: &Grid,
    columns: &ColumnMap,
    start_row: usize,
    row_count: usize,
    only_completed: bool,
    target_year: i32,
) -> Selection {
    let mut first_row = start_row.saturating_sub(1);
    if first_row <= columns.header_row {
        first_row = columns.header_row + 1;
    }
    let height = grid.height();
    let end = if row_count > 0 {
        (first_row + row_count).min(height)
    } else {
        height
    };

    let header_period = find_header_period(grid, columns, first_row, target_year);

    let block: Vec<SourceRow> = (first_row..end.max(first_row))
        .map(|index| project_row(grid, columns, index))
        .collect();
    let rows = if only_completed {
        filter_completed(block)
    } else {
        block
    };
    debug!(first_row, end, kept = rows.len(), ?header_period, "rows selected");

    Selection {
        rows,
        header_period,
        first_row,
    }
}

/// First month found in the month column, then the row-number column, of the
/// rows following `first_row`.
fn find_header_period(
    grid: &Grid,
    columns: &ColumnMap,
    first_row: usize,
    target_year: i32,
) -> Option<PeriodKey> {
    let end = (first_row + HEADER_PERIOD_SCAN_ROWS).min(grid.height());
    (first_row..end).find_map(|row| {
        [LogicalColumn::Month, LogicalColumn::RowNumber]
            .into_iter()
            .filter_map(|column| columns.get(column))
            .map(|col| grid.get(row, col))
            .filter(|cell| !cell.is_blank())
            .find_map(|cell| resolve_month(cell, target_year).ok())
    })
}

fn project_row(grid: &Grid, columns: &ColumnMap, index: usize) -> SourceRow {
    let cells: BTreeMap<LogicalColumn, CellValue> = columns
        .columns
        .iter()
        .map(|(column, col)| (*column, grid.get(index, *col).clone()))
        .collect();
    SourceRow { index, cells }
}

/// Keeps rows whose effective status is complete.
///
/// A row with a blank status borrows the status written on the row directly
/// above it, provided it looks like data (facility or nomination filled in)
/// and carries a numeric quantity. Without a status column the rows are
/// filtered on their own (blank) status.
pub fn filter_completed(block: Vec<SourceRow>) -> Vec<SourceRow> {
    let statuses: Vec<String> = block.iter().map(status_of).collect();
    let can_carry = block.first().is_some_and(|row| {
        [
            LogicalColumn::Status,
            LogicalColumn::Facility,
            LogicalColumn::Nomination,
            LogicalColumn::ActualQuantity,
        ]
        .iter()
        .all(|column| row.cells.contains_key(column))
    });

    block
        .into_iter()
        .enumerate()
        .filter(|(index, row)| {
            let own = statuses[*index].as_str();
            let effective = if can_carry && own.is_empty() && continues_block(row) {
                index
                    .checked_sub(1)
                    .map_or("", |previous| statuses[previous].as_str())
            } else {
                own
            };
            COMPLETED_STATUSES.contains(&effective)
        })
        .map(|(_, row)| row)
        .collect()
}

fn status_of(row: &SourceRow) -> String {
    let status = row.cell(LogicalColumn::Status).normalized();
    if status == "NAN" { String::new() } else { status }
}

fn continues_block(row: &SourceRow) -> bool {
    let looks_like_data = !row.cell(LogicalColumn::Facility).is_blank()
        || !row.cell(LogicalColumn::Nomination).is_blank();
    looks_like_data && is_numeric(row.cell(LogicalColumn::ActualQuantity))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_row(index: usize, status: &str, facility: &str, quantity: &str) -> SourceRow {
        SourceRow {
            index,
            cells: BTreeMap::from([
                (LogicalColumn::Status, CellValue::from(status)),
                (LogicalColumn::Facility, CellValue::from(facility)),
                (LogicalColumn::Nomination, CellValue::Empty),
                (LogicalColumn::ActualQuantity, CellValue::from(quantity)),
            ]),
        }
    }

    #[test]
    fn blank_status_inherits_from_previous_data_row() {
        let block = vec![
            source_row(0, "COMPLETE", "A", "10"),
            source_row(1, "", "B", "20"),
            source_row(2, "", "", ""),
        ];
        let kept: Vec<usize> = filter_completed(block).iter().map(|row| row.index).collect();
        assert_eq!(kept, vec![0, 1]);
    }

    #[test]
    fn status_normalisation_accepts_completed_and_ignores_nan() {
        let block = vec![
            source_row(0, " completed ", "A", "10"),
            source_row(1, "nan", "", "x"),
            source_row(2, "Loading", "A", "5"),
            source_row(3, "", "A", "5"),
        ];
        let kept: Vec<usize> = filter_completed(block).iter().map(|row| row.index).collect();
        assert_eq!(kept, vec![0]);
    }

    #[test]
    fn without_facility_and_nomination_rows_keep_their_own_status() {
        let row = |index: usize, status: &str, quantity: &str| SourceRow {
            index,
            cells: BTreeMap::from([
                (LogicalColumn::Status, CellValue::from(status)),
                (LogicalColumn::ActualQuantity, CellValue::from(quantity)),
            ]),
        };
        let block = vec![row(0, "COMPLETE", "10"), row(1, "", "20"), row(2, "Completed", "30")];
        let kept: Vec<usize> = filter_completed(block).iter().map(|row| row.index).collect();
        assert_eq!(kept, vec![0, 2]);

        let no_status = vec![SourceRow {
            index: 0,
            cells: BTreeMap::from([(LogicalColumn::ActualQuantity, CellValue::from("10"))]),
        }];
        assert!(filter_completed(no_status).is_empty());
    }

    #[test]
    fn first_row_of_block_cannot_inherit() {
        let block = vec![source_row(7, "", "A", "10")];
        assert!(filter_completed(block).is_empty());
    }
}

use std::path::Path;

use calamine::{DataType, Range, Reader, Xlsx, open_workbook};

use crate::error::{ReconcileError, Result};
use crate::io::serial_to_datetime;
use crate::model::{CellValue, Grid};

/// Lists the worksheet names of a workbook in workbook order.
pub fn sheet_names(path: &Path) -> Result<Vec<String>> {
    let workbook: Xlsx<_> = open_workbook(path)?;
    Ok(workbook.sheet_names().to_vec())
}

/// Reads one worksheet into a grid anchored at cell `A1`.
pub fn read_grid(path: &Path, sheet: &str) -> Result<Grid> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = read_required_sheet(&mut workbook, path, sheet)?;
    Ok(range_to_grid(&range))
}

fn read_required_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    path: &Path,
    name: &str,
) -> Result<Range<DataType>> {
    let range_result = workbook
        .worksheet_range(name)
        .ok_or_else(|| ReconcileError::MissingSheet {
            path: path.to_path_buf(),
            sheet: name.to_string(),
        })?;
    let range = range_result.map_err(ReconcileError::from)?;
    Ok(range)
}

fn origin(start: Option<(u32, u32)>) -> (usize, usize) {
    start.map_or((0, 0), |(row, col)| (row as usize, col as usize))
}

/// calamine ranges start at the first used cell; the grid is re-anchored so
/// row and column indices match the sheet.
fn range_to_grid(range: &Range<DataType>) -> Grid {
    let (row0, col0) = origin(range.start());
    let mut grid = Grid::default();
    for (row, col, cell) in range.cells() {
        let value = to_cell_value(cell);
        if value != CellValue::Empty {
            grid.set(row0 + row, col0 + col, value);
        }
    }
    grid
}

fn to_cell_value(cell: &DataType) -> CellValue {
    match cell {
        DataType::Empty => CellValue::Empty,
        DataType::String(value) if value.is_empty() => CellValue::Empty,
        DataType::String(value) => CellValue::Text(value.clone()),
        DataType::Float(value) => CellValue::Number(*value),
        DataType::Int(value) => CellValue::Number(*value as f64),
        DataType::Bool(value) => CellValue::Bool(*value),
        DataType::DateTime(serial) => serial_to_datetime(*serial)
            .map(CellValue::Date)
            .unwrap_or(CellValue::Number(*serial)),
        other => CellValue::Text(other.to_string()),
    }
}

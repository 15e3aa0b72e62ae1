use crate::model::CellValue;

/// Parses a quantity cell, returning `0.0` for anything unparseable.
///
/// Text is normalised for locale separators first (see
/// [`normalize_separators`]); whatever is not a digit or `.` is then dropped,
/// so currency symbols, units and signs never reach the conversion.
pub fn parse_quantity(cell: &CellValue) -> f64 {
    match cell {
        CellValue::Number(value) => *value,
        CellValue::Bool(value) => f64::from(u8::from(*value)),
        CellValue::Text(text) => {
            let digits: String = normalize_separators(text)
                .chars()
                .filter(|ch| ch.is_ascii_digit() || *ch == '.')
                .collect();
            digits.parse().unwrap_or(0.0)
        }
        CellValue::Empty | CellValue::Date(_) => 0.0,
    }
}

/// Strict check used by status carry-forward: the cell must convert as a
/// whole after separator normalisation.
pub fn is_numeric(cell: &CellValue) -> bool {
    match cell {
        CellValue::Number(value) => value.is_finite(),
        CellValue::Text(text) => {
            let normalized = normalize_separators(text);
            normalized.chars().any(|ch| ch.is_ascii_digit())
                && normalized.parse::<f64>().is_ok()
        }
        _ => false,
    }
}

/// Rewrites locale-specific separators into a plain `1234.56` form.
///
/// With both `.` and `,` present, the one appearing last is the decimal
/// point. A lone `,` followed by exactly three digits is a thousands
/// separator, otherwise it is the decimal point. A lone `.` is kept.
pub fn normalize_separators(raw: &str) -> String {
    let compact: String = raw
        .trim()
        .chars()
        .filter(|ch| *ch != '\u{a0}' && *ch != ' ')
        .collect();

    let last_dot = compact.rfind('.');
    let last_comma = compact.rfind(',');
    match (last_dot, last_comma) {
        (Some(dot), Some(comma)) if dot < comma => compact.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => compact.replace(',', ""),
        (None, Some(comma)) => {
            let tail = &compact[comma + 1..];
            if tail.len() == 3 && tail.chars().all(|ch| ch.is_ascii_digit()) {
                compact.replace(',', "")
            } else {
                compact.replace(',', ".")
            }
        }
        _ => compact,
    }
}

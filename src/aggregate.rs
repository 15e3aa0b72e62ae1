use tracing::debug;

use crate::canonical::Canonicalizer;
use crate::config::CompoundingPolicy;
use crate::model::{LogicalColumn, PeriodKey, SourceRow, Totals};
use crate::numeric::parse_quantity;
use crate::period::resolve_month;

/// How rows are assigned to periods and categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationSettings {
    pub policy: CompoundingPolicy,
    /// Use the block's header period for every row when one was found.
    pub force_header_period: bool,
    /// Manual period applied to every row; wins over the header period.
    pub period_override: Option<PeriodKey>,
}

/// Sums row quantities per period and canonical category.
///
/// Rows whose period or nomination cannot be resolved are skipped silently.
pub fn aggregate(
    rows: &[SourceRow],
    target_year: i32,
    header_period: Option<PeriodKey>,
    settings: &AggregationSettings,
    canonicalizer: &Canonicalizer,
) -> Totals {
    let forced = settings.period_override.or(if settings.force_header_period {
        header_period
    } else {
        None
    });

    let mut totals = Totals::new();
    let mut skipped = 0usize;
    for row in rows {
        let period = match forced {
            Some(period) => period,
            None => match resolve_month(row.cell(LogicalColumn::Month), target_year) {
                Ok(period) => period,
                Err(_) => {
                    skipped += 1;
                    continue;
                }
            },
        };

        let nomination = row.cell(LogicalColumn::Nomination).to_text();
        let targets = canonicalizer.canonicalize(&nomination);
        if targets.is_empty() {
            skipped += 1;
            continue;
        }

        let quantity = parse_quantity(row.cell(LogicalColumn::ActualQuantity));
        let by_category = totals.entry(period).or_default();
        match settings.policy {
            CompoundingPolicy::Split => {
                let share = quantity / targets.len() as f64;
                for target in targets {
                    *by_category.entry(target).or_insert(0.0) += share;
                }
            }
            CompoundingPolicy::First => {
                if let Some(first) = targets.into_iter().next() {
                    *by_category.entry(first).or_insert(0.0) += quantity;
                }
            }
            CompoundingPolicy::Duplicate => {
                for target in targets {
                    *by_category.entry(target).or_insert(0.0) += quantity;
                }
            }
        }
    }

    debug!(periods = totals.len(), skipped, "rows aggregated");
    totals
}

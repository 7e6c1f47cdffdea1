//! FILENAME: core/step-engine/src/filter.rs
//! PURPOSE: Row selection: category membership, one numeric predicate, and a
//! semi/anti-join against a reference table.
//! CONTEXT: Sub-filters run in a fixed order (category, numeric, table), each
//! narrowing the surviving row positions of the previous one. The output keeps
//! the column set and, except for topk, the input row order.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use rustc_hash::FxHashSet;
use serde_json::Value as JsonValue;
use table::{GroupKey, Table};

use crate::definition::{FilterConfig, NumericFilter, RangeBound, TableFilter};
use crate::error::ValidationError;
use crate::result::StepExtras;

pub struct FilterOperator;

impl FilterOperator {
    /// Applies every configured sub-filter. A config with none returns the
    /// table unchanged.
    ///
    /// Unknown category columns are skipped with a warning. `execute` lets them
    /// through to here; `validate` with a table rejects them.
    pub fn apply(table: &Table, config: &FilterConfig, extras: &StepExtras) -> Result<Table, ValidationError> {
        let mut rows: Vec<usize> = (0..table.row_count()).collect();

        if let Some(categories) = &config.category_filter {
            rows = Self::by_category(table, categories, rows);
        }
        if let Some(numeric) = &config.numeric_filter {
            rows = Self::by_numeric(table, numeric, rows)?;
        }
        if let Some(filter) = config.table_filter.as_ref().filter(|f| f.enable) {
            rows = Self::by_reference(table, filter, extras, rows)?;
        }

        log::trace!("filter: kept {} of {} rows", rows.len(), table.row_count());
        Ok(table.select_rows(&rows))
    }

    // ========================================================================
    // CATEGORY
    // ========================================================================

    fn by_category(table: &Table, categories: &BTreeMap<String, Vec<JsonValue>>, mut rows: Vec<usize>) -> Vec<usize> {
        for (column, allowed) in categories {
            let Some(col) = table.column_index(column) else {
                log::warn!("category filter: column '{}' not in table, skipping", column);
                continue;
            };
            rows.retain(|&r| {
                let cell = &table.rows()[r][col];
                allowed.iter().any(|value| cell.matches_json(value))
            });
        }
        rows
    }

    // ========================================================================
    // NUMERIC
    // ========================================================================

    fn by_numeric(table: &Table, filter: &NumericFilter, rows: Vec<usize>) -> Result<Vec<usize>, ValidationError> {
        let column = filter.column();
        let col = table
            .column_index(column)
            .ok_or_else(|| ValidationError::unknown_column("numeric_filter.column", column, table))?;
        let value_at = |r: usize| table.rows()[r][col].as_number();

        Ok(match filter {
            NumericFilter::Range { min, max, .. } => {
                let (min, max) = (RangeBound::active(min), RangeBound::active(max));
                if min.is_none() && max.is_none() {
                    return Ok(rows);
                }
                rows.into_iter()
                    .filter(|&r| value_at(r).is_some_and(|v| within(v, min, max)))
                    .collect()
            }
            NumericFilter::TopK { k, ascending, .. } => {
                let k = usize::try_from(*k).ok().filter(|&k| k > 0).ok_or_else(|| {
                    ValidationError::new("k must be greater than 0")
                        .field("numeric_filter.k")
                        .with_detail("value", *k)
                })?;
                top_k(rows, k, *ascending, value_at)
            }
            NumericFilter::Percentage {
                min_percentile,
                max_percentile,
                ..
            } => {
                let mut values: Vec<f64> = rows.iter().filter_map(|&r| value_at(r)).collect();
                values.sort_by(f64::total_cmp);
                let (Some(lo), Some(hi)) = (
                    quantile(&values, *min_percentile),
                    quantile(&values, *max_percentile),
                ) else {
                    return Ok(Vec::new());
                };
                rows.into_iter()
                    .filter(|&r| value_at(r).is_some_and(|v| lo <= v && v <= hi))
                    .collect()
            }
        })
    }

    // ========================================================================
    // TABLE
    // ========================================================================

    fn by_reference(
        table: &Table,
        filter: &TableFilter,
        extras: &StepExtras,
        rows: Vec<usize>,
    ) -> Result<Vec<usize>, ValidationError> {
        let name = filter
            .reference
            .as_deref()
            .ok_or_else(|| ValidationError::new("table_filter requires a reference table").field("table_filter.reference"))?;
        let reference = extras.table(name).ok_or_else(|| {
            ValidationError::unknown_reference("table_filter.reference", name, extras.table_names())
        })?;

        let positions = |t: &Table| -> Result<Vec<usize>, ValidationError> {
            filter
                .key_columns
                .iter()
                .enumerate()
                .map(|(i, key)| {
                    t.column_index(key).ok_or_else(|| {
                        ValidationError::unknown_column(&format!("table_filter.key_columns[{}]", i), key, t)
                    })
                })
                .collect()
        };
        let own_keys = positions(table)?;
        let reference_keys = positions(reference)?;

        let keys: FxHashSet<GroupKey> = reference
            .rows()
            .iter()
            .map(|row| GroupKey::from_row(row, &reference_keys))
            .collect();

        Ok(rows
            .into_iter()
            .filter(|&r| keys.contains(&GroupKey::from_row(&table.rows()[r], &own_keys)) != filter.exclude_mode)
            .collect())
    }
}

fn within(value: f64, min: Option<RangeBound>, max: Option<RangeBound>) -> bool {
    let above = min.map_or(true, |b| if b.inclusive { value >= b.value } else { value > b.value });
    let below = max.map_or(true, |b| if b.inclusive { value <= b.value } else { value < b.value });
    above && below
}

/// Stable sort on the column value, non-numeric rows last in either
/// direction, then the first `k`.
fn top_k(mut rows: Vec<usize>, k: usize, ascending: bool, value_at: impl Fn(usize) -> Option<f64>) -> Vec<usize> {
    rows.sort_by(|&a, &b| match (value_at(a), value_at(b)) {
        (Some(x), Some(y)) => {
            let ord = x.total_cmp(&y);
            if ascending {
                ord
            } else {
                ord.reverse()
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    rows.truncate(k);
    rows
}

/// Linear-interpolation quantile of sorted values, `percentile` in 0..=100.
fn quantile(sorted: &[f64], percentile: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let position = (percentile / 100.0).clamp(0.0, 1.0) * last as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

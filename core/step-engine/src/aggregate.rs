//! FILENAME: core/step-engine/src/aggregate.rs
//! PURPOSE: Group-by with named reductions and combinators.
//! CONTEXT: Rows are grouped by the tuple of axis values. Each `column` entry
//! yields one value per group and binds it under its name; combinator entries
//! read two earlier bindings. Output has one row per group, first-seen order.

use rustc_hash::FxHashMap;
use table::{CellValue, GroupKey, Table};

use crate::accumulator::Accumulator;
use crate::definition::{AggregateConfig, MethodKind};
use crate::error::ValidationError;
use crate::named::NamedValues;

/// One value per group, aligned with the group order.
type GroupColumn = Vec<Option<f64>>;

pub struct AggregateOperator;

/// Rows of one group, in input order.
struct Group {
    key: GroupKey,
    rows: Vec<usize>,
}

impl AggregateOperator {
    pub fn apply(table: &Table, config: &AggregateConfig) -> Result<Table, ValidationError> {
        let axis_positions = config
            .axis
            .iter()
            .enumerate()
            .map(|(i, axis)| {
                table
                    .column_index(axis)
                    .ok_or_else(|| ValidationError::unknown_column(&format!("axis[{}]", i), axis, table))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let groups = Self::group_rows(table, &axis_positions);
        log::trace!("aggregate: {} rows into {} group(s)", table.row_count(), groups.len());

        let mut env: NamedValues<GroupColumn> = NamedValues::new();
        for (i, entry) in config.column.iter().enumerate() {
            let field = format!("column[{}].subject", i);
            let values = match entry.method.kind() {
                MethodKind::Reduce(reduction) => {
                    let column = entry.subject.as_single().ok_or_else(|| {
                        ValidationError::new(format!("{} must be a single column name", field)).field(field.as_str())
                    })?;
                    let position = table
                        .column_index(column)
                        .ok_or_else(|| ValidationError::unknown_column(&field, column, table))?;
                    groups
                        .iter()
                        .map(|group| {
                            let acc: Accumulator = group.rows.iter().map(|&r| &table.rows()[r][position]).collect();
                            acc.compute(reduction)
                        })
                        .collect()
                }
                MethodKind::Combine(op) => {
                    let (left, right) = entry.subject.as_pair().ok_or_else(|| {
                        ValidationError::new(format!("{} must list two names", field)).field(field.as_str())
                    })?;
                    let (left, right) = env.pair(&field, left, right)?;
                    left.iter()
                        .zip(right)
                        .map(|(&l, &r)| op.apply_opt(l, r))
                        .collect()
                }
            };
            env = env
                .bind(&entry.name, values)
                .map_err(|e| e.field(format!("column[{}].name", i)))?;
        }

        let mut columns = config.axis.clone();
        columns.extend(env.names().map(str::to_string));
        let computed = env.into_entries();

        let rows = groups
            .iter()
            .enumerate()
            .map(|(g, group)| {
                let mut row = group.key.to_cells();
                row.extend(computed.iter().map(|(_, values)| CellValue::from(values[g])));
                row
            })
            .collect();

        Ok(Table::from_rows(columns, rows)?)
    }

    /// Groups rows by axis tuple in first-seen order. Without axis columns the
    /// whole table is one group (a grand total row); an empty table has no
    /// groups either way.
    fn group_rows(table: &Table, axis_positions: &[usize]) -> Vec<Group> {
        if table.is_empty() {
            return Vec::new();
        }
        if axis_positions.is_empty() {
            return vec![Group {
                key: GroupKey::default(),
                rows: (0..table.row_count()).collect(),
            }];
        }

        let mut groups: Vec<Group> = Vec::new();
        let mut index: FxHashMap<GroupKey, usize> = FxHashMap::default();
        for (r, row) in table.rows().iter().enumerate() {
            let key = GroupKey::from_row(row, axis_positions);
            match index.get(&key) {
                Some(&g) => groups[g].rows.push(r),
                None => {
                    index.insert(key.clone(), groups.len());
                    groups.push(Group { key, rows: vec![r] });
                }
            }
        }
        groups
    }
}

//! FILENAME: core/step-engine/src/transform.rs
//! PURPOSE: Column-level rewrites: constant, copy, formula and mapping.
//! CONTEXT: Operations run in declaration order on a private copy of the
//! input table. Each one computes a full column and writes it under
//! `target_name`, creating or overwriting it, so later operations see the
//! columns written by earlier ones.

use table::{CellValue, Table};

use crate::definition::{Calculation, Operand, TransformConfig};
use crate::error::ValidationError;

pub struct TransformOperator;

/// A formula operand bound to the current table.
#[derive(Debug, Clone, Copy)]
enum Resolved {
    Column(usize),
    Literal(f64),
}

impl Resolved {
    fn value(self, row: &[CellValue]) -> Option<f64> {
        match self {
            Resolved::Column(col) => row[col].as_number(),
            Resolved::Literal(n) => Some(n),
        }
    }
}

impl TransformOperator {
    pub fn apply(table: &Table, config: &TransformConfig) -> Result<Table, ValidationError> {
        let mut out = table.clone();
        for (i, op) in config.operations.iter().enumerate() {
            let field = format!("operations[{}].calculation", i);
            let values = Self::calculate(&out, &op.calculation, &field)?;
            log::trace!("transform: {:?} '{}'", op.operation_type, op.target_name);
            out.set_column(&op.target_name, values)?;
        }
        Ok(out)
    }

    fn calculate(table: &Table, calculation: &Calculation, field: &str) -> Result<Vec<CellValue>, ValidationError> {
        let missing = |name: &str, sub: &str| {
            ValidationError::unknown_reference(
                &format!("{}.{}", field, sub),
                name,
                table.columns().iter().map(String::as_str),
            )
        };

        Ok(match calculation {
            Calculation::Constant { value } => vec![value.clone(); table.row_count()],
            Calculation::Copy { source } => table
                .column_values(source)
                .ok_or_else(|| missing(source, "source"))?
                .cloned()
                .collect(),
            Calculation::Formula { left, operator, right } => {
                let left = Self::resolve(table, left).ok_or_else(|| missing(&left.to_string(), "left"))?;
                let right = Self::resolve(table, right).ok_or_else(|| missing(&right.to_string(), "right"))?;
                table
                    .rows()
                    .iter()
                    .map(|row| CellValue::from(operator.apply_opt(left.value(row), right.value(row))))
                    .collect()
            }
            Calculation::Mapping { source, mapping } => table
                .column_values(source)
                .ok_or_else(|| missing(source, "source"))?
                .map(|cell| mapping.get(&cell.display_value()).cloned().unwrap_or_default())
                .collect(),
        })
    }

    /// A name matching a column wins over reading it as a number.
    fn resolve(table: &Table, operand: &Operand) -> Option<Resolved> {
        match operand {
            Operand::Number(n) => Some(Resolved::Literal(*n)),
            Operand::Name(name) => table
                .column_index(name)
                .map(Resolved::Column)
                .or_else(|| name.trim().parse::<f64>().ok().map(Resolved::Literal)),
        }
    }
}

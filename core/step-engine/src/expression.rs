//! FILENAME: core/step-engine/src/expression.rs
//! PURPOSE: Row-wise evaluation of parsed arithmetic formulas.
//! CONTEXT: Column references are resolved to positions once, then the tree is
//! walked per row. Empty cells make the row null; text that is not a number is
//! an error the summary step reports.

use parser::{BinaryOperator, Expression, UnaryOperator};
use rustc_hash::FxHashMap;
use table::{CellValue, Table};

use crate::definition::ArithmeticOp;
use crate::error::ValidationError;

impl From<BinaryOperator> for ArithmeticOp {
    fn from(op: BinaryOperator) -> Self {
        match op {
            BinaryOperator::Add => ArithmeticOp::Add,
            BinaryOperator::Subtract => ArithmeticOp::Subtract,
            BinaryOperator::Multiply => ArithmeticOp::Multiply,
            BinaryOperator::Divide => ArithmeticOp::Divide,
        }
    }
}

/// A formula bound to the column layout of one table.
#[derive(Debug)]
pub struct RowEvaluator<'a> {
    expression: &'a Expression,
    positions: FxHashMap<&'a str, usize>,
}

impl<'a> RowEvaluator<'a> {
    pub fn new(expression: &'a Expression, table: &Table) -> Result<Self, ValidationError> {
        let mut positions = FxHashMap::default();
        for column in expression.columns() {
            let position = table.column_index(column).ok_or_else(|| {
                ValidationError::unknown_reference(
                    "formula_text",
                    column,
                    table.columns().iter().map(String::as_str),
                )
            })?;
            positions.insert(column, position);
        }
        Ok(RowEvaluator {
            expression,
            positions,
        })
    }

    /// Evaluates one row. `Ok(None)` is a deliberate null (empty cell or
    /// division by zero).
    pub fn eval(&self, row: &[CellValue]) -> Result<Option<f64>, ValidationError> {
        self.eval_node(self.expression, row)
    }

    fn eval_node(&self, node: &Expression, row: &[CellValue]) -> Result<Option<f64>, ValidationError> {
        match node {
            Expression::Number(n) => Ok(Some(*n)),
            Expression::Column(name) => {
                let Some(&position) = self.positions.get(name.as_str()) else {
                    return Err(ValidationError::new(format!("Column '{}' is not bound", name))
                        .with_detail("value", name.as_str()));
                };
                let cell = &row[position];
                if cell.is_missing() {
                    return Ok(None);
                }
                cell.as_number().map(Some).ok_or_else(|| {
                    ValidationError::new(format!("Column '{}' holds a non-numeric value", name))
                        .with_detail("value", cell.to_json())
                        .with_detail("column", name.as_str())
                        .with_detail("reason", "non_numeric_cell")
                })
            }
            Expression::UnaryOp { op, operand } => {
                let value = self.eval_node(operand, row)?;
                Ok(match op {
                    UnaryOperator::Negate => value.map(|v| -v),
                })
            }
            Expression::BinaryOp { left, op, right } => {
                let left = self.eval_node(left, row)?;
                let right = self.eval_node(right, row)?;
                Ok(ArithmeticOp::from(*op).apply_opt(left, right))
            }
        }
    }

    /// Sums the formula over every row, skipping null rows.
    pub fn sum(&self, table: &Table) -> Result<f64, ValidationError> {
        let mut total = 0.0;
        for (index, row) in table.rows().iter().enumerate() {
            if let Some(value) = self.eval(row).map_err(|e| e.with_detail("row", index))? {
                total += value;
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> Table {
        Table::from_records(&[
            json!({"Unit Price": 2.5, "qty": 4, "discount": 0}),
            json!({"Unit Price": 10, "qty": null, "discount": 1}),
            json!({"Unit Price": 1, "qty": 2, "discount": 2}),
        ])
        .unwrap()
    }

    #[test]
    fn sums_over_rows_skipping_nulls() {
        let expr = parser::parse("'Unit Price' * qty").unwrap();
        let table = table();
        let eval = RowEvaluator::new(&expr, &table).unwrap();
        assert_eq!(eval.sum(&table).unwrap(), 12.0);
    }

    #[test]
    fn nan_text_is_a_null_row() {
        let table = Table::from_records(&[json!({"v": 3}), json!({"v": "NaN"})]).unwrap();
        let expr = parser::parse("v * 2").unwrap();
        let eval = RowEvaluator::new(&expr, &table).unwrap();
        assert_eq!(eval.eval(&table.rows()[1]).unwrap(), None);
        assert_eq!(eval.sum(&table).unwrap(), 6.0);
    }

    #[test]
    fn division_by_zero_nulls_only_that_row() {
        let expr = parser::parse("qty / discount").unwrap();
        let table = table();
        let eval = RowEvaluator::new(&expr, &table).unwrap();
        assert_eq!(eval.eval(&table.rows()[0]).unwrap(), None);
        assert_eq!(eval.eval(&table.rows()[2]).unwrap(), Some(1.0));
        assert_eq!(eval.sum(&table).unwrap(), 1.0);
    }

    #[test]
    fn text_cell_is_an_error() {
        let table = Table::from_records(&[json!({"a": "abc"})]).unwrap();
        let expr = parser::parse("-a + 1").unwrap();
        let eval = RowEvaluator::new(&expr, &table).unwrap();
        let err = eval.sum(&table).unwrap_err();
        assert_eq!(err.detail("reason"), Some(&json!("non_numeric_cell")));
        assert_eq!(err.detail("row"), Some(&json!(0)));
    }

    #[test]
    fn unknown_column_is_rejected_on_bind() {
        let table = table();
        let expr = parser::parse("price * qty").unwrap();
        let err = RowEvaluator::new(&expr, &table).unwrap_err();
        assert_eq!(err.detail("value"), Some(&json!("price")));
    }
}

//! FILENAME: core/table/src/table.rs
//! PURPOSE: The in-memory table every step operates on.
//! CONTEXT: Rows are positional vectors aligned with `columns`. Operators that
//! mutate work on a clone, so a borrowed `Table` is never changed in place by
//! the step engine.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::cell::CellValue;
use crate::error::TableError;

/// Ordered rows sharing one column set.
///
/// Serializes as `{"columns": [...], "rows": [[...], ...]}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "TableRepr")]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

#[derive(Deserialize)]
struct TableRepr {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<CellValue>>,
}

impl TryFrom<TableRepr> for Table {
    type Error = TableError;

    fn try_from(repr: TableRepr) -> Result<Self, Self::Error> {
        Table::from_rows(repr.columns, repr.rows)
    }
}

impl Table {
    /// Creates an empty table with the given columns.
    pub fn new(columns: Vec<String>) -> Result<Self, TableError> {
        let mut seen = FxHashSet::default();
        if let Some(name) = columns.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(TableError::DuplicateColumn(name.clone()));
        }
        Ok(Table {
            columns,
            rows: Vec::new(),
        })
    }

    /// Creates a table from positional rows, checking every row's width.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self, TableError> {
        let mut table = Table::new(columns)?;
        table.rows.reserve(rows.len());
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Builds a table from record-oriented JSON (an array of objects), the
    /// shape an uploaded sheet is delivered in.
    ///
    /// Column order is first-seen order across records; a key missing from a
    /// record becomes an empty cell.
    pub fn from_records(records: &[JsonValue]) -> Result<Self, TableError> {
        let mut columns: Vec<String> = Vec::new();
        for (index, record) in records.iter().enumerate() {
            let object = record
                .as_object()
                .ok_or(TableError::NotAnObject { index })?;
            for key in object.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            // Checked above
            let Some(object) = record.as_object() else {
                continue;
            };
            let mut row = Vec::with_capacity(columns.len());
            for column in &columns {
                let cell = match object.get(column) {
                    None => CellValue::Empty,
                    Some(value) => CellValue::from_json(value).ok_or_else(|| {
                        TableError::NonScalar {
                            column: column.clone(),
                        }
                    })?,
                };
                row.push(cell);
            }
            rows.push(row);
        }

        Ok(Table { columns, rows })
    }

    /// Converts the table back into record-oriented JSON.
    pub fn to_records(&self) -> Vec<JsonValue> {
        self.rows
            .iter()
            .map(|row| {
                let object: Map<String, JsonValue> = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(name, cell)| (name.clone(), cell.to_json()))
                    .collect();
                JsonValue::Object(object)
            })
            .collect()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Appends a row; its width must match the column count.
    pub fn push_row(&mut self, row: Vec<CellValue>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowLength {
                row: self.rows.len(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Returns the cell at `row` in column `name`, if both exist.
    pub fn cell(&self, row: usize, name: &str) -> Option<&CellValue> {
        let col = self.column_index(name)?;
        self.rows.get(row).map(|r| &r[col])
    }

    /// Iterates the values of one column in row order.
    pub fn column_values<'a>(
        &'a self,
        name: &str,
    ) -> Option<impl Iterator<Item = &'a CellValue> + 'a> {
        let col = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[col]))
    }

    /// A column is numeric when every non-missing cell coerces to a number.
    /// Unknown columns are not numeric.
    pub fn is_numeric_column(&self, name: &str) -> bool {
        match self.column_values(name) {
            Some(mut values) => values.all(|v| v.is_missing() || v.as_number().is_some()),
            None => false,
        }
    }

    /// Returns a new table holding the rows at `indices`, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Writes `values` into column `name`, creating it at the end when absent
    /// and overwriting it in place otherwise.
    pub fn set_column(&mut self, name: &str, values: Vec<CellValue>) -> Result<(), TableError> {
        if values.len() != self.rows.len() {
            return Err(TableError::RowLength {
                row: values.len().min(self.rows.len()),
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        match self.column_index(name) {
            Some(col) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[col] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Table {
        Table::from_records(&[
            json!({"region": "North", "sales": 10}),
            json!({"region": "South", "sales": "20"}),
            json!({"region": "East"}),
        ])
        .unwrap()
    }

    #[test]
    fn from_records_fills_missing_keys() {
        let table = sample();
        assert_eq!(table.columns(), ["region", "sales"]);
        assert_eq!(table.cell(2, "sales"), Some(&CellValue::Empty));
    }

    #[test]
    fn from_records_rejects_nested_values() {
        let err = Table::from_records(&[json!({"a": [1, 2]})]).unwrap_err();
        assert_eq!(err, TableError::NonScalar { column: "a".into() });
    }

    #[test]
    fn numeric_column_allows_blanks_and_numeric_text() {
        let table = sample();
        assert!(table.is_numeric_column("sales"));
        assert!(!table.is_numeric_column("region"));
        assert!(!table.is_numeric_column("missing"));
    }

    #[test]
    fn nan_text_counts_as_missing_not_as_number() {
        let table = Table::from_records(&[json!({"v": 10}), json!({"v": "NaN"})]).unwrap();
        assert!(table.is_numeric_column("v"));
        assert_eq!(table.cell(1, "v").and_then(CellValue::as_number), None);

        let table = Table::from_records(&[json!({"v": 10}), json!({"v": "inf"})]).unwrap();
        assert!(!table.is_numeric_column("v"));
    }

    #[test]
    fn push_row_checks_width() {
        let mut table = Table::new(vec!["a".into(), "b".into()]).unwrap();
        let err = table.push_row(vec![CellValue::from(1.0)]).unwrap_err();
        assert!(matches!(err, TableError::RowLength { expected: 2, found: 1, .. }));
    }

    #[test]
    fn duplicate_columns_are_rejected() {
        let err = Table::new(vec!["a".into(), "a".into()]).unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn("a".into()));
    }

    #[test]
    fn set_column_creates_then_overwrites() {
        let mut table = sample();
        table
            .set_column("flag", vec![true.into(), false.into(), true.into()])
            .unwrap();
        assert_eq!(table.columns().last().map(String::as_str), Some("flag"));

        table
            .set_column("region", vec!["a".into(), "b".into(), "c".into()])
            .unwrap();
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.cell(1, "region"), Some(&CellValue::from("b")));
    }

    #[test]
    fn serde_round_trip() {
        let table = sample();
        let encoded = serde_json::to_value(&table).unwrap();
        assert_eq!(encoded["columns"], json!(["region", "sales"]));
        let decoded: Table = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, table);
    }

    #[test]
    fn deserialize_rejects_ragged_rows() {
        let result: Result<Table, _> =
            serde_json::from_value(json!({"columns": ["a", "b"], "rows": [[1]]}));
        assert!(result.is_err());
    }

    #[test]
    fn to_records_preserves_order() {
        let table = sample();
        let records = table.to_records();
        assert_eq!(records[1], json!({"region": "South", "sales": "20"}));
        assert_eq!(records[2], json!({"region": "East", "sales": null}));
    }
}

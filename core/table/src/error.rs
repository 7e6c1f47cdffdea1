//! FILENAME: core/table/src/error.rs

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("Row {row} has {found} values but the table has {expected} columns")]
    RowLength {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Record {index} is not an object")]
    NotAnObject { index: usize },

    #[error("Column '{column}' holds a nested value; only scalars are supported")]
    NonScalar { column: String },

    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),
}

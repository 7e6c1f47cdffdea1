//! FILENAME: core/table/src/lib.rs
//! PURPOSE: Main library entry point for the table model.
//! CONTEXT: Re-exports the scalar, key and table types used by the step engine.
//!
//! A `Table` is an ordered list of rows sharing one column set. Rows are stored
//! positionally (one `CellValue` per column) and converted to and from
//! record-oriented JSON at the edges.

pub mod cell;
pub mod error;
pub mod key;
pub mod table;

pub use cell::CellValue;
pub use error::TableError;
pub use key::{GroupKey, KeyValue, NumberKey};
pub use table::Table;

//! FILENAME: core/table/src/key.rs
//! PURPOSE: Hashable cell values and multi-column group keys.
//! CONTEXT: Aggregation groups rows by the tuple of their axis values, and
//! table filters join on key tuples. `f64` is not `Eq`/`Hash`, so numbers are
//! stored as `NumberKey` before they can be used as map keys.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::cell::CellValue;

/// An f64 stored by bit pattern so it can be hashed.
/// -0.0 folds into 0.0 and every NaN folds into one canonical NaN, so
/// values that group together also hash together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NumberKey(u64);

impl NumberKey {
    pub fn new(n: f64) -> Self {
        let canonical = if n.is_nan() {
            f64::NAN
        } else if n == 0.0 {
            0.0
        } else {
            n
        };
        NumberKey(canonical.to_bits())
    }

    pub fn value(self) -> f64 {
        f64::from_bits(self.0)
    }
}

/// One cell of a group key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyValue {
    Empty,
    Boolean(bool),
    Number(NumberKey),
    Text(String),
}

impl From<&CellValue> for KeyValue {
    fn from(value: &CellValue) -> Self {
        match value {
            CellValue::Empty => KeyValue::Empty,
            CellValue::Boolean(b) => KeyValue::Boolean(*b),
            CellValue::Number(n) => KeyValue::Number(NumberKey::new(*n)),
            CellValue::Text(s) => KeyValue::Text(s.clone()),
        }
    }
}

impl From<&KeyValue> for CellValue {
    fn from(value: &KeyValue) -> Self {
        match value {
            KeyValue::Empty => CellValue::Empty,
            KeyValue::Boolean(b) => CellValue::Boolean(*b),
            KeyValue::Number(n) => CellValue::Number(n.value()),
            KeyValue::Text(s) => CellValue::Text(s.clone()),
        }
    }
}

/// A key representing a unique combination of axis values.
/// Axis lists are short, so up to four values stay inline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GroupKey {
    pub values: SmallVec<[KeyValue; 4]>,
}

impl GroupKey {
    /// Key of `row` over the columns at `positions`, in that order.
    pub fn from_row(row: &[CellValue], positions: &[usize]) -> Self {
        let values = positions.iter().map(|&i| KeyValue::from(&row[i])).collect();
        Self { values }
    }

    /// Converts the key back into cells, in axis order.
    pub fn to_cells(&self) -> Vec<CellValue> {
        self.values.iter().map(CellValue::from).collect()
    }
}

//! FILENAME: core/table/src/cell.rs
//! PURPOSE: Defines the scalar value held by one table cell.
//! CONTEXT: Uploaded spreadsheets arrive as JSON records, so a cell is exactly
//! one JSON scalar. `null` maps to `Empty`. It is designed to be lightweight as
//! tens of thousands of rows may be held per table.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Represents the raw data within a cell.
///
/// Serialized untagged, so a cell round-trips as the plain JSON scalar
/// (`null`, `true`, `12.5`, `"North"`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Empty, or text a dataframe export writes for a missing value ("NaN").
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().parse::<f64>().is_ok_and(f64::is_nan),
            _ => false,
        }
    }

    /// Coerces the cell to a finite number.
    ///
    /// Numbers pass through; text is accepted when it parses as a finite
    /// number after trimming (spreadsheet exports often store figures as
    /// text). "NaN" and "inf" text, booleans and empty cells are not numeric.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            CellValue::Empty | CellValue::Boolean(_) => None,
        }
    }

    /// Returns the display value of the cell as a String.
    /// Used as the lookup key for mapping dictionaries.
    pub fn display_value(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => {
                // Format without unnecessary decimal places
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{:.0}", n)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Text(s) => s.clone(),
            CellValue::Boolean(b) => {
                if *b { "true" } else { "false" }.to_string()
            }
        }
    }

    /// Converts a JSON scalar into a cell. Returns `None` for arrays and objects.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Null => Some(CellValue::Empty),
            JsonValue::Bool(b) => Some(CellValue::Boolean(*b)),
            JsonValue::Number(n) => n.as_f64().map(CellValue::Number),
            JsonValue::String(s) => Some(CellValue::Text(s.clone())),
            JsonValue::Array(_) | JsonValue::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            CellValue::Empty => JsonValue::Null,
            CellValue::Boolean(b) => JsonValue::Bool(*b),
            CellValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            CellValue::Text(s) => JsonValue::String(s.clone()),
        }
    }

    /// Exact-match comparison against a JSON scalar, as used by category
    /// filters. Numbers compare numerically (`1` matches `1.0`); there is no
    /// cross-type coercion.
    pub fn matches_json(&self, value: &JsonValue) -> bool {
        match (self, value) {
            (CellValue::Empty, JsonValue::Null) => true,
            (CellValue::Boolean(a), JsonValue::Bool(b)) => a == b,
            (CellValue::Number(a), JsonValue::Number(b)) => b.as_f64() == Some(*a),
            (CellValue::Text(a), JsonValue::String(b)) => a == b,
            _ => false,
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<Option<f64>> for CellValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(CellValue::Empty, CellValue::Number)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_text_coerces() {
        assert_eq!(CellValue::Text(" 12.5 ".into()).as_number(), Some(12.5));
        assert_eq!(CellValue::Text("north".into()).as_number(), None);
        assert_eq!(CellValue::Boolean(true).as_number(), None);
        assert_eq!(CellValue::Empty.as_number(), None);
    }

    #[test]
    fn non_finite_text_is_not_a_number() {
        for text in ["NaN", "nan", "inf", "-Infinity"] {
            assert_eq!(CellValue::Text(text.into()).as_number(), None, "{}", text);
        }
        assert!(CellValue::Text(" NaN ".into()).is_missing());
        assert!(!CellValue::Text("inf".into()).is_missing());
        assert!(!CellValue::Number(0.0).is_missing());
    }

    #[test]
    fn display_drops_trailing_zeroes() {
        assert_eq!(CellValue::Number(3.0).display_value(), "3");
        assert_eq!(CellValue::Number(2.5).display_value(), "2.5");
    }

    #[test]
    fn serializes_as_plain_scalar() {
        let cells = vec![
            CellValue::Empty,
            CellValue::Boolean(false),
            CellValue::Number(4.0),
            CellValue::Text("A".into()),
        ];
        let encoded = serde_json::to_value(&cells).unwrap();
        assert_eq!(encoded, json!([null, false, 4.0, "A"]));

        let decoded: Vec<CellValue> = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, cells);
    }

    #[test]
    fn matches_json_is_exact() {
        assert!(CellValue::Number(1.0).matches_json(&json!(1)));
        assert!(!CellValue::Number(1.0).matches_json(&json!("1")));
        assert!(CellValue::Text("A".into()).matches_json(&json!("A")));
        assert!(!CellValue::Text("a".into()).matches_json(&json!("A")));
    }
}

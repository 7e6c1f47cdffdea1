//! FILENAME: core/step-engine/src/error.rs
//! PURPOSE: The single error kind raised by validators and operators.
//! CONTEXT: Callers surface this as a client error. `details` carries the
//! offending field, the bad value and, for reference errors, the valid
//! alternatives, so a UI can point at the exact config entry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use table::{Table, TableError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    #[serde(default)]
    pub details: BTreeMap<String, JsonValue>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        ValidationError {
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    /// Adds one structured detail. Later values for the same key win.
    pub fn with_detail(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn field(self, field: impl Into<String>) -> Self {
        self.with_detail("field", field.into())
    }

    /// A config entry names a column the table does not have.
    pub fn unknown_column(field: &str, column: &str, table: &Table) -> Self {
        ValidationError::new(format!("Column '{}' not found in table", column))
            .field(field)
            .with_detail("value", column)
            .with_detail("available", table.columns().to_vec())
    }

    /// A config entry refers to a name that is not (yet) defined.
    pub fn unknown_reference<'a>(
        field: &str,
        name: &str,
        available: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let available: Vec<String> = available.into_iter().map(str::to_string).collect();
        ValidationError::new(format!("'{}' is not defined at this point", name))
            .field(field)
            .with_detail("value", name)
            .with_detail("available", available)
    }

    /// Looks up a detail, mostly for tests and callers building responses.
    pub fn detail(&self, key: &str) -> Option<&JsonValue> {
        self.details.get(key)
    }
}

impl From<TableError> for ValidationError {
    fn from(err: TableError) -> Self {
        ValidationError::new(err.to_string()).with_detail("reason", "table")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn details_accumulate() {
        let err = ValidationError::new("bad")
            .field("axis")
            .with_detail("value", 3);
        assert_eq!(err.to_string(), "bad");
        assert_eq!(err.detail("field"), Some(&json!("axis")));
        assert_eq!(err.detail("value"), Some(&json!(3)));
    }

    #[test]
    fn unknown_reference_lists_alternatives() {
        let err = ValidationError::unknown_reference("column[2].subject", "margin", ["revenue", "cost"]);
        assert_eq!(err.detail("available"), Some(&json!(["revenue", "cost"])));
    }
}

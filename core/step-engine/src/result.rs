//! FILENAME: core/step-engine/src/result.rs
//! PURPOSE: The uniform output envelope of every step, and the inputs a step
//! uses without owning them.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use table::Table;

use crate::chart::ChartDocument;

/// `{table?, chart?, formulas?}`. Built fresh by each call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StepResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<Table>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formulas: Option<Vec<FormulaResult>>,
}

impl StepResult {
    pub fn with_table(table: Table) -> Self {
        StepResult {
            table: Some(table),
            ..Default::default()
        }
    }
}

/// One computed summary scalar. `value` is `None` for a deliberate null
/// (e.g. division by zero).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaResult {
    pub name: String,
    pub kind: String,
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

/// Data a step needs but does not own, supplied by the caller.
///
/// Reference tables are addressed by name from `table_filter.reference`;
/// typically they are outputs of earlier steps held by the session layer.
#[derive(Debug, Clone, Default)]
pub struct StepExtras {
    tables: FxHashMap<String, Table>,
}

impl StepExtras {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: impl Into<String>, table: Table) -> Self {
        self.tables.insert(name.into(), table);
        self
    }

    pub fn insert_table(&mut self, name: impl Into<String>, table: Table) {
        self.tables.insert(name.into(), table);
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Reference names, sorted, for error details.
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

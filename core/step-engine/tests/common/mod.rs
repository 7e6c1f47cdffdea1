//! FILENAME: tests/common/mod.rs
//! Fixtures and assertion helpers for step-engine integration tests.

#![allow(dead_code)]

use serde_json::{json, Value as JsonValue};
use step_engine::{StepExtras, StepResult, StepType, ValidationError};
use table::{CellValue, Table};

// ============================================================================
// FIXTURES
// ============================================================================

pub struct SalesFixture;

impl SalesFixture {
    pub fn headers() -> Vec<&'static str> {
        vec!["Region", "Product", "Quarter", "Sales", "Quantity"]
    }

    pub fn data() -> Vec<(&'static str, &'static str, &'static str, f64, f64)> {
        vec![
            ("North", "Widget", "Q1", 10000.0, 100.0),
            ("North", "Widget", "Q2", 12000.0, 120.0),
            ("North", "Gadget", "Q1", 8000.0, 80.0),
            ("North", "Gadget", "Q2", 9000.0, 90.0),
            ("South", "Widget", "Q1", 15000.0, 150.0),
            ("South", "Widget", "Q2", 14000.0, 140.0),
            ("South", "Gadget", "Q1", 11000.0, 110.0),
            ("South", "Gadget", "Q2", 13000.0, 130.0),
            ("East", "Widget", "Q1", 9000.0, 90.0),
            ("East", "Widget", "Q2", 11000.0, 110.0),
            ("East", "Gadget", "Q1", 7000.0, 70.0),
            ("East", "Gadget", "Q2", 8500.0, 85.0),
        ]
    }

    /// The sales data as a table, built the way an upload arrives.
    pub fn table() -> Table {
        let headers = Self::headers();
        let records: Vec<JsonValue> = Self::data()
            .into_iter()
            .map(|(region, product, quarter, sales, quantity)| {
                json!({
                    (headers[0]): region,
                    (headers[1]): product,
                    (headers[2]): quarter,
                    (headers[3]): sales,
                    (headers[4]): quantity,
                })
            })
            .collect();
        Table::from_records(&records).expect("fixture table")
    }
}

/// A single-column table `v` with the given values.
pub fn values_table(values: &[JsonValue]) -> Table {
    let records: Vec<JsonValue> = values.iter().map(|v| json!({ "v": v })).collect();
    Table::from_records(&records).expect("values table")
}

// ============================================================================
// RUNNERS
// ============================================================================

pub fn run(step_type: StepType, table: &Table, config: JsonValue) -> Result<StepResult, ValidationError> {
    step_engine::execute(step_type, table, &config, &StepExtras::new())
}

pub fn run_table(step_type: StepType, table: &Table, config: JsonValue) -> Table {
    run(step_type, table, config)
        .expect("step should succeed")
        .table
        .expect("step should return a table")
}

// ============================================================================
// ASSERTION HELPERS
// ============================================================================

pub fn column(table: &Table, name: &str) -> Vec<CellValue> {
    table
        .column_values(name)
        .unwrap_or_else(|| panic!("column '{}' missing", name))
        .cloned()
        .collect()
}

pub fn numbers(values: &[f64]) -> Vec<CellValue> {
    values.iter().map(|&v| CellValue::Number(v)).collect()
}

/// Assert that `err` points at `field`.
pub fn assert_field(err: &ValidationError, field: &str) {
    assert_eq!(
        err.detail("field").and_then(JsonValue::as_str),
        Some(field),
        "unexpected error: {} {:?}",
        err,
        err.details
    );
}

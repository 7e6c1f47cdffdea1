//! FILENAME: core/step-engine/src/tests.rs
//! Unit tests for the public entry points: validate, execute and Pipeline.

use serde_json::json;
use table::{CellValue, Table};

use crate::*;

fn sales() -> Table {
    Table::from_records(&[
        json!({"region": "North", "revenue": 100, "cost": 60}),
        json!({"region": "South", "revenue": 80, "cost": 80}),
        json!({"region": "North", "revenue": 40, "cost": 10}),
    ])
    .unwrap()
}

// ============================================================================
// VALIDATE
// ============================================================================

#[test]
fn validate_without_table_skips_column_checks() {
    let config = json!({"axis": ["nowhere"], "column": [{"name": "n", "subject": "x", "method": "count"}]});
    assert!(validate(StepType::Aggregate, &config, None).is_ok());
    assert!(validate(StepType::Aggregate, &config, Some(&sales())).is_err());
}

#[test]
fn validate_rejects_malformed_config() {
    let err = validate(StepType::Transform, &json!({"operations": "none"}), None).unwrap_err();
    assert_eq!(err.detail("reason"), Some(&json!("malformed_config")));
    assert_eq!(err.detail("step_type"), Some(&json!("transform")));
}

#[test]
fn validate_does_not_mutate_inputs() {
    let table = sales();
    let config = json!({"numeric_filter": {"filter_type": "topk", "column": "revenue", "k": 1}});
    let before = (table.clone(), config.clone());
    validate(StepType::Filter, &config, Some(&table)).unwrap();
    assert_eq!((table, config), before);
}

// ============================================================================
// EXECUTE
// ============================================================================

#[test]
fn execute_skips_unknown_category_column() {
    let config = json!({"category_filter": {"zone": ["N"], "region": ["North"]}});
    assert!(validate(StepType::Filter, &config, Some(&sales())).is_err());

    let out = execute(StepType::Filter, &sales(), &config, &StepExtras::new())
        .unwrap()
        .table
        .unwrap();
    assert_eq!(out.row_count(), 2);
}

#[test]
fn execute_validates_first() {
    let err = execute(
        StepType::Filter,
        &sales(),
        &json!({"numeric_filter": {"filter_type": "topk", "column": "zone", "k": 1}}),
        &StepExtras::new(),
    )
    .unwrap_err();
    assert_eq!(err.detail("field"), Some(&json!("numeric_filter.column")));
}

#[test]
fn execute_leaves_input_untouched() {
    let table = sales();
    let result = execute(
        StepType::Transform,
        &table,
        &json!({"operations": [{"operation_type": "modify_subject", "target_name": "revenue",
            "calculation": {"type": "constant", "value": 0}}]}),
        &StepExtras::new(),
    )
    .unwrap();
    assert_eq!(table, sales());
    assert_eq!(result.table.unwrap().cell(0, "revenue"), Some(&CellValue::from(0.0)));
}

#[test]
fn result_serializes_without_absent_parts() {
    let result = execute(
        StepType::Summary,
        &sales(),
        &json!({"formula": [{"target_subject": "revenue", "type": "sum"}]}),
        &StepExtras::new(),
    )
    .unwrap();
    let encoded = serde_json::to_value(&result).unwrap();
    assert_eq!(
        encoded,
        json!({"formulas": [{"name": "sum(revenue)", "kind": "sum", "value": 220.0, "unit": null}]})
    );
}

#[test]
fn validation_error_serializes_details() {
    let err = validate(StepType::Summary, &json!({"chart": {"graph_type": "radar"}}), None).unwrap_err();
    let encoded = serde_json::to_value(&err).unwrap();
    assert_eq!(encoded["message"], json!("Unsupported chart type: radar"));
    assert_eq!(encoded["details"]["field"], json!("chart.graph_type"));
}

// ============================================================================
// PIPELINE
// ============================================================================

#[test]
fn pipeline_threads_tables_between_steps() {
    let pipeline = Pipeline::default()
        .push(
            StepType::Transform,
            json!({"operations": [{"operation_type": "add_subject", "target_name": "profit",
                "calculation": {"type": "formula", "left": "revenue", "operator": "-", "right": "cost"}}]}),
        )
        .push(
            StepType::Aggregate,
            json!({"axis": ["region"], "column": [{"name": "profit", "subject": "profit", "method": "sum"}]}),
        )
        .push(
            StepType::Summary,
            json!({"formula": [{"name": "total", "target_subject": "profit", "type": "sum"}]}),
        );

    let output = pipeline.run(&sales(), &StepExtras::new()).unwrap();
    assert_eq!(output.results.len(), 3);
    assert_eq!(output.table.row_count(), 2);
    let formulas = output.results[2].formulas.as_ref().unwrap();
    assert_eq!(formulas[0].value, Some(70.0));
}

#[test]
fn pipeline_reports_failing_step() {
    let pipeline = Pipeline::new(vec![
        PipelineStep::new(StepType::Filter, json!({})),
        PipelineStep::new(StepType::Aggregate, json!({"axis": ["missing"], "column": []})),
    ]);
    let err = pipeline.run(&sales(), &StepExtras::new()).unwrap_err();
    assert_eq!(err.detail("step_index"), Some(&json!(1)));
}

#[test]
fn pipeline_steps_decode_from_json() {
    let pipeline: Pipeline = serde_json::from_value(json!({"steps": [
        {"step_type": "filter", "config": {}},
        {"step_type": "summary", "config": {"include_table": true}}
    ]}))
    .unwrap();
    assert_eq!(pipeline.steps()[1].step_type, StepType::Summary);
    let output = pipeline.run(&sales(), &StepExtras::new()).unwrap();
    assert_eq!(output.table, sales());
}

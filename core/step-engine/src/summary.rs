//! FILENAME: core/step-engine/src/summary.rs
//! PURPOSE: Named scalar formulas and an optional chart over a table.
//! CONTEXT: Never changes the table. Formulas run in declaration order and
//! bind their (portion-scaled) value under their name, so later binary
//! formulas can combine earlier results.

use table::Table;

use crate::accumulator::Accumulator;
use crate::chart;
use crate::definition::{FormulaKind, FormulaSpec, SummaryConfig};
use crate::error::ValidationError;
use crate::expression::RowEvaluator;
use crate::named::NamedValues;
use crate::result::{FormulaResult, StepResult};

pub struct SummaryOperator;

impl SummaryOperator {
    pub fn apply(table: &Table, config: &SummaryConfig) -> Result<StepResult, ValidationError> {
        let formulas = match &config.formula {
            Some(specs) => Some(Self::evaluate(table, specs)?),
            None => None,
        };
        let chart = config
            .chart
            .as_ref()
            .map(|chart| chart::build_chart(table, chart))
            .transpose()?;

        Ok(StepResult {
            table: config.include_table.then(|| table.clone()),
            chart,
            formulas,
        })
    }

    fn evaluate(table: &Table, specs: &[FormulaSpec]) -> Result<Vec<FormulaResult>, ValidationError> {
        let mut env: NamedValues<Option<f64>> = NamedValues::new();

        for (i, spec) in specs.iter().enumerate() {
            let field = format!("formula[{}]", i);
            let value = Self::compute(table, spec, &env, &field)?.map(|v| v * spec.portion);

            if let Some(v) = value.filter(|v| !v.is_finite()) {
                return Err(ValidationError::new(format!(
                    "Formula '{}' did not produce a finite number",
                    spec.result_name()
                ))
                .field(field)
                .with_detail("value", v.to_string())
                .with_detail("reason", "non_numeric_result"));
            }

            env = env
                .bind(&spec.result_name(), value)
                .map_err(|e| e.field(format!("{}.name", field)))?;
        }

        Ok(env
            .into_entries()
            .into_iter()
            .zip(specs)
            .map(|((name, value), spec)| FormulaResult {
                name,
                kind: spec.formula_type.as_str().to_string(),
                value,
                unit: spec.unit.clone(),
            })
            .collect())
    }

    fn compute(
        table: &Table,
        spec: &FormulaSpec,
        env: &NamedValues<Option<f64>>,
        field: &str,
    ) -> Result<Option<f64>, ValidationError> {
        let subject_field = format!("{}.target_subject", field);
        match spec.formula_type.kind() {
            FormulaKind::Reduce(reduction) => {
                let column = spec
                    .target_subject
                    .as_ref()
                    .and_then(|s| s.as_single())
                    .ok_or_else(|| {
                        ValidationError::new(format!("{} must be a single column name", subject_field))
                            .field(subject_field.as_str())
                    })?;
                let acc: Accumulator = table
                    .column_values(column)
                    .ok_or_else(|| ValidationError::unknown_column(&subject_field, column, table))?
                    .collect();
                Ok(acc.compute(reduction))
            }
            FormulaKind::Arithmetic => {
                let text_field = format!("{}.formula_text", field);
                let text = spec.formula_text.as_deref().ok_or_else(|| {
                    ValidationError::new("arithmetic formula requires formula_text").field(text_field.as_str())
                })?;
                let expression = parser::parse(text).map_err(|e| {
                    ValidationError::new(e.to_string())
                        .field(text_field.as_str())
                        .with_detail("value", text)
                        .with_detail("reason", "parse")
                })?;
                let evaluator = RowEvaluator::new(&expression, table).map_err(|e| e.field(text_field.as_str()))?;
                evaluator.sum(table).map(Some).map_err(|e| e.field(text_field.as_str()))
            }
            FormulaKind::Combine(op) => {
                let (left, right) = spec
                    .target_subject
                    .as_ref()
                    .and_then(|s| s.as_pair())
                    .ok_or_else(|| {
                        ValidationError::new(format!("{} must list two formula names", subject_field))
                            .field(subject_field.as_str())
                    })?;
                let (left, right) = env.pair(&subject_field, left, right)?;
                Ok(op.apply_opt(*left, *right))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{StepConfig, StepType};
    use serde_json::json;

    fn sales() -> Table {
        Table::from_records(&[
            json!({"region": "North", "revenue": 100, "cost": 60, "note": "ok"}),
            json!({"region": "South", "revenue": 50, "cost": 40, "note": "late"}),
        ])
        .unwrap()
    }

    fn run(raw: serde_json::Value) -> Result<StepResult, ValidationError> {
        let StepConfig::Summary(config) = StepConfig::decode(StepType::Summary, &raw).unwrap() else {
            panic!("expected summary config");
        };
        SummaryOperator::apply(&sales(), &config)
    }

    #[test]
    fn formulas_chain_by_name() {
        let result = run(json!({"formula": [
            {"name": "rev", "target_subject": "revenue", "type": "sum", "unit": "EUR"},
            {"name": "profit", "type": "arithmetic", "formula_text": "revenue - cost"},
            {"name": "margin", "target_subject": ["profit", "rev"], "type": "/", "portion": 100}
        ]}))
        .unwrap();
        let formulas = result.formulas.unwrap();
        assert_eq!(formulas[0].value, Some(150.0));
        assert_eq!(formulas[0].unit.as_deref(), Some("EUR"));
        assert_eq!(formulas[1].value, Some(50.0));
        assert_eq!(formulas[2].kind, "/");
        assert!((formulas[2].value.unwrap() - 33.333333).abs() < 1e-4);
        assert!(result.table.is_none());
        assert!(result.chart.is_none());
    }

    #[test]
    fn division_by_zero_is_null_not_error() {
        let result = run(json!({"formula": [
            {"name": "a", "target_subject": "revenue", "type": "sum"},
            {"name": "z", "target_subject": "revenue", "type": "sum", "portion": 0},
            {"name": "q", "target_subject": ["a", "z"], "type": "/"},
            {"name": "after", "target_subject": "cost", "type": "max"}
        ]}))
        .unwrap();
        let formulas = result.formulas.unwrap();
        assert_eq!(formulas[2].value, None);
        assert_eq!(formulas[3].value, Some(60.0));
    }

    #[test]
    fn non_numeric_cell_in_arithmetic_is_an_error() {
        let err = run(json!({"formula": [{"type": "arithmetic", "formula_text": "revenue * note"}]})).unwrap_err();
        assert_eq!(err.detail("reason"), Some(&json!("non_numeric_cell")));
        assert_eq!(err.detail("field"), Some(&json!("formula[0].formula_text")));
    }

    #[test]
    fn overflow_is_rejected() {
        let err = run(json!({"formula": [
            {"target_subject": "revenue", "type": "sum", "portion": 1e308}
        ]}))
        .unwrap_err();
        assert_eq!(err.detail("reason"), Some(&json!("non_numeric_result")));
    }

    #[test]
    fn include_table_echoes_input() {
        let result = run(json!({"include_table": true})).unwrap();
        assert_eq!(result.table, Some(sales()));
        assert!(result.formulas.is_none());
    }

    #[test]
    fn chart_is_built() {
        let result = run(json!({"chart": {"graph_type": "pie", "names": "region", "values": "revenue"}})).unwrap();
        assert_eq!(result.chart.unwrap().kind, "pie");
    }
}

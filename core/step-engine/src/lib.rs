//! FILENAME: core/step-engine/src/lib.rs
//! PURPOSE: Main library entry point for the step engine.
//! CONTEXT: A step is one operator call over an in-memory table: aggregate,
//! filter, transform or summary. Callers hand over a raw JSON config, the
//! engine decodes and validates it, then runs the operator and returns a
//! uniform `StepResult`.
//!
//! The engine is synchronous and holds no state between calls. Input tables
//! are borrowed immutably; operators that change rows work on a copy.

pub mod accumulator;
pub mod aggregate;
pub mod chart;
pub mod definition;
pub mod error;
pub mod expression;
pub mod filter;
pub mod named;
pub mod pipeline;
pub mod result;
pub mod summary;
pub mod transform;
pub mod validator;

#[cfg(test)]
mod tests;

use serde_json::Value as JsonValue;
use table::Table;

use crate::validator::CategoryColumns;

pub use aggregate::AggregateOperator;
pub use chart::{ChartDocument, GraphType};
pub use definition::{StepConfig, StepType};
pub use error::ValidationError;
pub use filter::FilterOperator;
pub use named::NamedValues;
pub use pipeline::{Pipeline, PipelineOutput, PipelineStep};
pub use result::{FormulaResult, StepExtras, StepResult};
pub use summary::SummaryOperator;
pub use transform::TransformOperator;

/// Decodes and validates a step config. Column checks only run when a table
/// is given.
pub fn validate(step_type: StepType, config: &JsonValue, table: Option<&Table>) -> Result<(), ValidationError> {
    prepare(step_type, config, table, CategoryColumns::Require).map(|_| ())
}

fn prepare(
    step_type: StepType,
    config: &JsonValue,
    table: Option<&Table>,
    categories: CategoryColumns,
) -> Result<StepConfig, ValidationError> {
    let config = StepConfig::decode(step_type, config)?;
    validator::validate_config_with(&config, table, categories)?;
    Ok(config)
}

/// Validates the config against `table`, then runs the step.
///
/// Unlike `validate`, an unknown `category_filter` column is not an error
/// here: the filter skips it with a warning so stale configs still run.
pub fn execute(
    step_type: StepType,
    table: &Table,
    config: &JsonValue,
    extras: &StepExtras,
) -> Result<StepResult, ValidationError> {
    log::debug!(
        "executing {} step over {} rows x {} columns",
        step_type,
        table.row_count(),
        table.column_count()
    );

    let config = prepare(step_type, config, Some(table), CategoryColumns::Skip)
        .inspect_err(|e| log::debug!("{} step rejected: {}", step_type, e))?;

    let result = match &config {
        StepConfig::Aggregate(c) => StepResult::with_table(AggregateOperator::apply(table, c)?),
        StepConfig::Filter(c) => StepResult::with_table(FilterOperator::apply(table, c, extras)?),
        StepConfig::Transform(c) => StepResult::with_table(TransformOperator::apply(table, c)?),
        StepConfig::Summary(c) => SummaryOperator::apply(table, c)?,
    };

    log::debug!(
        "{} step done: table={} chart={} formulas={}",
        step_type,
        result.table.as_ref().map_or(0, Table::row_count),
        result.chart.is_some(),
        result.formulas.as_ref().map_or(0, Vec::len)
    );
    Ok(result)
}

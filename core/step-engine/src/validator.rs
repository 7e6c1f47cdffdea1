//! FILENAME: core/step-engine/src/validator.rs
//! Config Validator - Fail-fast checks that run before any step executes.
//!
//! Validation happens in two passes per operator:
//! 1. Structure: shapes, ranges and cross-references between entries of the
//!    same config (e.g. a combinator naming an earlier entry). Needs no table.
//! 2. Table: column existence and numeric-ness. Only runs when a table is
//!    available.
//!
//! The first violation wins. Nothing here mutates the config or the table.

use table::Table;

use crate::chart;
use crate::definition::{
    AggregateConfig, Calculation, FilterConfig, FormulaKind, MethodKind, NumericFilter, Operand,
    RangeBound, StepConfig, SummaryConfig, TransformConfig,
};
use crate::error::ValidationError;
use crate::named::NamedValues;

/// How a known table is used to check `category_filter` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryColumns {
    /// Unknown columns are rejected. Used by `validate`.
    Require,
    /// Unknown columns are left for the operator to skip. Used by `execute`.
    Skip,
}

/// Validates a decoded config, optionally against the table it will run on.
pub fn validate_config(config: &StepConfig, table: Option<&Table>) -> Result<(), ValidationError> {
    validate_config_with(config, table, CategoryColumns::Require)
}

pub fn validate_config_with(
    config: &StepConfig,
    table: Option<&Table>,
    categories: CategoryColumns,
) -> Result<(), ValidationError> {
    match config {
        StepConfig::Aggregate(c) => validate_aggregate(c, table),
        StepConfig::Filter(c) => validate_filter(c, table, categories),
        StepConfig::Transform(c) => validate_transform(c, table),
        StepConfig::Summary(c) => validate_summary(c, table),
    }
}

// ============================================================================
// SHARED CHECKS
// ============================================================================

fn require_column(table: &Table, field: &str, column: &str) -> Result<(), ValidationError> {
    if table.has_column(column) {
        Ok(())
    } else {
        Err(ValidationError::unknown_column(field, column, table))
    }
}

fn require_numeric_column(table: &Table, field: &str, column: &str) -> Result<(), ValidationError> {
    require_column(table, field, column)?;
    if table.is_numeric_column(column) {
        Ok(())
    } else {
        Err(ValidationError::new(format!("Column '{}' is not numeric", column))
            .field(field)
            .with_detail("value", column)
            .with_detail("reason", "not_numeric"))
    }
}

fn require_name(field: &str, name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        Err(ValidationError::new(format!("{} must not be empty", field)).field(field))
    } else {
        Ok(())
    }
}

fn wrong_shape(field: &str, expected: &str, got: serde_json::Value) -> ValidationError {
    ValidationError::new(format!("{} must be {}", field, expected))
        .field(field)
        .with_detail("expected", expected)
        .with_detail("value", got)
}

// ============================================================================
// AGGREGATE
// ============================================================================

pub fn validate_aggregate(config: &AggregateConfig, table: Option<&Table>) -> Result<(), ValidationError> {
    for (i, axis) in config.axis.iter().enumerate() {
        let field = format!("axis[{}]", i);
        require_name(&field, axis)?;
        if config.axis[..i].contains(axis) {
            return Err(ValidationError::new(format!("Axis column '{}' is listed twice", axis))
                .field(field)
                .with_detail("value", axis.as_str()));
        }
    }

    // Single left-to-right pass: a combinator only sees names bound before it.
    let mut bound: NamedValues<()> = NamedValues::new();
    for (i, entry) in config.column.iter().enumerate() {
        let field = format!("column[{}]", i);
        require_name(&format!("{}.name", field), &entry.name)?;
        if config.axis.contains(&entry.name) {
            return Err(ValidationError::new(format!(
                "Column name '{}' collides with an axis column",
                entry.name
            ))
            .field(format!("{}.name", field))
            .with_detail("value", entry.name.as_str()));
        }

        let subject_field = format!("{}.subject", field);
        match entry.method.kind() {
            MethodKind::Reduce(_) => {
                if entry.subject.as_single().is_none() {
                    return Err(wrong_shape(&subject_field, "a single column name", entry.subject.describe()));
                }
            }
            MethodKind::Combine(_) => {
                let (left, right) = entry.subject.as_pair().ok_or_else(|| {
                    wrong_shape(&subject_field, "a list of two defined names", entry.subject.describe())
                })?;
                bound.pair(&subject_field, left, right)?;
            }
        }

        bound = bound
            .bind(&entry.name, ())
            .map_err(|e| e.field(format!("{}.name", field)))?;
    }

    let Some(table) = table else {
        return Ok(());
    };

    for (i, axis) in config.axis.iter().enumerate() {
        require_column(table, &format!("axis[{}]", i), axis)?;
    }
    for (i, entry) in config.column.iter().enumerate() {
        if let (MethodKind::Reduce(reduction), Some(column)) = (entry.method.kind(), entry.subject.as_single()) {
            let field = format!("column[{}].subject", i);
            if reduction.needs_numeric() {
                require_numeric_column(table, &field, column)?;
            } else {
                require_column(table, &field, column)?;
            }
        }
    }

    Ok(())
}

// ============================================================================
// FILTER
// ============================================================================

pub fn validate_filter(
    config: &FilterConfig,
    table: Option<&Table>,
    categories: CategoryColumns,
) -> Result<(), ValidationError> {
    if let Some(filter) = &config.category_filter {
        for (column, allowed) in filter {
            let field = format!("category_filter.{}", column);
            if let Some(bad) = allowed.iter().find(|v| v.is_array() || v.is_object()) {
                return Err(ValidationError::new(format!("{} may only list scalar values", field))
                    .field(field)
                    .with_detail("value", bad.clone()));
            }
        }
    }

    if let Some(numeric) = &config.numeric_filter {
        require_name("numeric_filter.column", numeric.column())?;
        match numeric {
            NumericFilter::Range { min, max, .. } => {
                if let (Some(lo), Some(hi)) = (RangeBound::active(min), RangeBound::active(max)) {
                    if lo.value > hi.value {
                        return Err(ValidationError::new("Range minimum is greater than maximum")
                            .field("numeric_filter.min")
                            .with_detail("min", lo.value)
                            .with_detail("max", hi.value));
                    }
                }
            }
            NumericFilter::TopK { k, .. } => {
                if *k <= 0 {
                    return Err(ValidationError::new("k must be greater than 0")
                        .field("numeric_filter.k")
                        .with_detail("value", *k));
                }
            }
            NumericFilter::Percentage {
                min_percentile,
                max_percentile,
                ..
            } => {
                for (field, p) in [
                    ("numeric_filter.min_percentile", *min_percentile),
                    ("numeric_filter.max_percentile", *max_percentile),
                ] {
                    if !(0.0..=100.0).contains(&p) {
                        return Err(ValidationError::new("Percentile must be between 0 and 100")
                            .field(field)
                            .with_detail("value", p));
                    }
                }
                if min_percentile > max_percentile {
                    return Err(ValidationError::new("min_percentile is greater than max_percentile")
                        .field("numeric_filter.min_percentile")
                        .with_detail("min", *min_percentile)
                        .with_detail("max", *max_percentile));
                }
            }
        }
    }

    if let Some(filter) = config.table_filter.as_ref().filter(|f| f.enable) {
        if filter.key_columns.is_empty() {
            return Err(ValidationError::new("table_filter requires at least one key column")
                .field("table_filter.key_columns"));
        }
        match filter.reference.as_deref() {
            Some(reference) if !reference.trim().is_empty() => {}
            _ => {
                return Err(ValidationError::new("table_filter requires a reference table")
                    .field("table_filter.reference"));
            }
        }
    }

    let Some(table) = table else {
        return Ok(());
    };

    if let (Some(filter), CategoryColumns::Require) = (&config.category_filter, categories) {
        for column in filter.keys() {
            require_column(table, &format!("category_filter.{}", column), column)?;
        }
    }
    if let Some(numeric) = &config.numeric_filter {
        require_numeric_column(table, "numeric_filter.column", numeric.column())?;
    }
    if let Some(filter) = config.table_filter.as_ref().filter(|f| f.enable) {
        for (i, key) in filter.key_columns.iter().enumerate() {
            require_column(table, &format!("table_filter.key_columns[{}]", i), key)?;
        }
    }

    Ok(())
}

// ============================================================================
// TRANSFORM
// ============================================================================

pub fn validate_transform(config: &TransformConfig, table: Option<&Table>) -> Result<(), ValidationError> {
    for (i, op) in config.operations.iter().enumerate() {
        require_name(&format!("operations[{}].target_name", i), &op.target_name)?;
    }

    let Some(table) = table else {
        return Ok(());
    };

    // Later operations see the columns produced by earlier ones.
    let mut columns: Vec<String> = table.columns().to_vec();
    for (i, op) in config.operations.iter().enumerate() {
        let field = format!("operations[{}].calculation", i);
        let missing = |name: &str, sub: &str| {
            ValidationError::unknown_reference(&format!("{}.{}", field, sub), name, columns.iter().map(String::as_str))
        };

        match &op.calculation {
            Calculation::Constant { .. } => {}
            Calculation::Copy { source } | Calculation::Mapping { source, .. } => {
                if !columns.contains(source) {
                    return Err(missing(source, "source"));
                }
            }
            Calculation::Formula { left, right, .. } => {
                for (sub, operand) in [("left", left), ("right", right)] {
                    if let Operand::Name(name) = operand {
                        if !columns.contains(name) && name.trim().parse::<f64>().is_err() {
                            return Err(missing(name, sub)
                                .with_detail("reason", "not a column or numeric literal"));
                        }
                    }
                }
            }
        }

        if !columns.contains(&op.target_name) {
            columns.push(op.target_name.clone());
        }
    }

    Ok(())
}

// ============================================================================
// SUMMARY
// ============================================================================

pub fn validate_summary(config: &SummaryConfig, table: Option<&Table>) -> Result<(), ValidationError> {
    let formulas = config.formula.as_deref().unwrap_or_default();

    let mut bound: NamedValues<()> = NamedValues::new();
    for (i, spec) in formulas.iter().enumerate() {
        let field = format!("formula[{}]", i);
        if !spec.portion.is_finite() {
            return Err(ValidationError::new("portion must be a finite number")
                .field(format!("{}.portion", field))
                .with_detail("value", spec.portion.to_string()));
        }

        let subject_field = format!("{}.target_subject", field);
        match spec.formula_type.kind() {
            FormulaKind::Reduce(_) => match &spec.target_subject {
                Some(subject) if subject.as_single().is_some() => {}
                other => {
                    let got = other.as_ref().map(|s| s.describe()).unwrap_or_default();
                    return Err(wrong_shape(&subject_field, "a single column name", got));
                }
            },
            FormulaKind::Arithmetic => {
                let text_field = format!("{}.formula_text", field);
                let text = spec
                    .formula_text
                    .as_deref()
                    .ok_or_else(|| ValidationError::new("arithmetic formula requires formula_text").field(text_field.as_str()))?;
                parser::parse(text).map_err(|e| {
                    ValidationError::new(e.to_string())
                        .field(text_field.as_str())
                        .with_detail("value", text)
                        .with_detail("reason", "parse")
                })?;
            }
            FormulaKind::Combine(_) => {
                let (left, right) = spec
                    .target_subject
                    .as_ref()
                    .and_then(|s| s.as_pair())
                    .ok_or_else(|| {
                        let got = spec.target_subject.as_ref().map(|s| s.describe()).unwrap_or_default();
                        wrong_shape(&subject_field, "a list of two earlier formula names", got)
                    })?;
                bound.pair(&subject_field, left, right)?;
            }
        }

        bound = bound
            .bind(&spec.result_name(), ())
            .map_err(|e| e.field(format!("{}.name", field)))?;
    }

    if let Some(chart) = &config.chart {
        chart::validate_chart(chart, table)?;
    }

    let Some(table) = table else {
        return Ok(());
    };

    for (i, spec) in formulas.iter().enumerate() {
        match spec.formula_type.kind() {
            FormulaKind::Reduce(reduction) => {
                if let Some(column) = spec.target_subject.as_ref().and_then(|s| s.as_single()) {
                    let field = format!("formula[{}].target_subject", i);
                    if reduction.needs_numeric() {
                        require_numeric_column(table, &field, column)?;
                    } else {
                        require_column(table, &field, column)?;
                    }
                }
            }
            FormulaKind::Arithmetic => {
                let field = format!("formula[{}].formula_text", i);
                if let Some(expr) = spec.formula_text.as_deref().and_then(|t| parser::parse(t).ok()) {
                    for column in expr.columns() {
                        if !table.has_column(column) {
                            return Err(ValidationError::unknown_reference(
                                &field,
                                column,
                                table.columns().iter().map(String::as_str),
                            ));
                        }
                        require_numeric_column(table, &field, column)?;
                    }
                }
            }
            FormulaKind::Combine(_) => {}
        }
    }

    Ok(())
}

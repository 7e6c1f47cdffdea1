//! FILENAME: core/step-engine/src/definition.rs
//! Step Definitions - The serializable configuration of every operator.
//!
//! This module contains all the types needed to DESCRIBE a step.
//! These structures are designed to be:
//! - Decoded from the JSON the session layer sends
//! - Immutable for the duration of one call
//! - Closed enums wherever the wire format uses a type tag, so every
//!   dispatch is an exhaustive `match`

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use table::CellValue;

use crate::error::ValidationError;

// ============================================================================
// STEP TYPE
// ============================================================================

/// The four operator kinds a step can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Aggregate,
    Filter,
    Transform,
    Summary,
}

impl StepType {
    pub const ALL: [StepType; 4] = [
        StepType::Aggregate,
        StepType::Filter,
        StepType::Transform,
        StepType::Summary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Aggregate => "aggregate",
            StepType::Filter => "filter",
            StepType::Transform => "transform",
            StepType::Summary => "summary",
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                let supported: Vec<&str> = StepType::ALL.iter().map(StepType::as_str).collect();
                ValidationError::new(format!("Unsupported step type: {}", s))
                    .field("step_type")
                    .with_detail("value", s)
                    .with_detail("supported", supported)
            })
    }
}

// ============================================================================
// STEP CONFIG
// ============================================================================

/// A decoded step configuration, one variant per operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StepConfig {
    Aggregate(AggregateConfig),
    Filter(FilterConfig),
    Transform(TransformConfig),
    Summary(SummaryConfig),
}

impl StepConfig {
    /// Structural decoding of a raw config. Missing sub-fields, wrong shapes
    /// and unknown tags fail here, before any table is looked at.
    pub fn decode(step_type: StepType, raw: &JsonValue) -> Result<Self, ValidationError> {
        fn typed<T: serde::de::DeserializeOwned>(
            step_type: StepType,
            raw: &JsonValue,
        ) -> Result<T, ValidationError> {
            T::deserialize(raw).map_err(|e| {
                ValidationError::new(format!("Invalid {} config: {}", step_type, e))
                    .with_detail("step_type", step_type.as_str())
                    .with_detail("reason", "malformed_config")
            })
        }

        Ok(match step_type {
            StepType::Aggregate => StepConfig::Aggregate(typed(step_type, raw)?),
            StepType::Filter => StepConfig::Filter(typed(step_type, raw)?),
            StepType::Transform => StepConfig::Transform(typed(step_type, raw)?),
            StepType::Summary => StepConfig::Summary(typed(step_type, raw)?),
        })
    }

    pub fn step_type(&self) -> StepType {
        match self {
            StepConfig::Aggregate(_) => StepType::Aggregate,
            StepConfig::Filter(_) => StepType::Filter,
            StepConfig::Transform(_) => StepType::Transform,
            StepConfig::Summary(_) => StepType::Summary,
        }
    }
}

// ============================================================================
// SHARED PIECES
// ============================================================================

/// Elementwise arithmetic shared by aggregate combinators, transform formulas
/// and summary binary formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithmeticOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
}

impl ArithmeticOp {
    /// Applies the operator. Division by zero yields `None` (null), never an error.
    pub fn apply(self, left: f64, right: f64) -> Option<f64> {
        match self {
            ArithmeticOp::Add => Some(left + right),
            ArithmeticOp::Subtract => Some(left - right),
            ArithmeticOp::Multiply => Some(left * right),
            ArithmeticOp::Divide => {
                if right == 0.0 {
                    None
                } else {
                    Some(left / right)
                }
            }
        }
    }

    /// Null-propagating variant used over optional intermediate values.
    pub fn apply_opt(self, left: Option<f64>, right: Option<f64>) -> Option<f64> {
        self.apply(left?, right?)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
        }
    }
}

/// The basic column reductions available to aggregate and summary steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    Sum,
    Mean,
    Count,
    Max,
    Min,
}

impl Reduction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reduction::Sum => "sum",
            Reduction::Mean => "mean",
            Reduction::Count => "count",
            Reduction::Max => "max",
            Reduction::Min => "min",
        }
    }

    /// `count` works on any column; the others need numbers.
    pub fn needs_numeric(&self) -> bool {
        !matches!(self, Reduction::Count)
    }
}

/// Either a single column/name or a pair of names.
///
/// Basic methods take a single column; combinators take exactly two
/// previously bound names. The shape is checked against the method by the
/// validator, not by the decoder, so the error can say which entry is wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Subject {
    Single(String),
    List(Vec<String>),
}

impl Subject {
    pub fn as_single(&self) -> Option<&str> {
        match self {
            Subject::Single(s) => Some(s),
            Subject::List(_) => None,
        }
    }

    pub fn as_pair(&self) -> Option<(&str, &str)> {
        match self {
            Subject::List(items) if items.len() == 2 => Some((&items[0], &items[1])),
            _ => None,
        }
    }

    pub fn describe(&self) -> JsonValue {
        match self {
            Subject::Single(s) => JsonValue::String(s.clone()),
            Subject::List(items) => JsonValue::from(items.clone()),
        }
    }
}

// ============================================================================
// AGGREGATE
// ============================================================================

/// `{axis: [column...], column: [{name, subject, method}...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateConfig {
    pub axis: Vec<String>,
    pub column: Vec<AggregateColumn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateColumn {
    pub name: String,
    pub subject: Subject,
    pub method: AggregateMethod,
}

/// Aggregate methods: five reductions over a raw column, four combinators
/// over two already-bound names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateMethod {
    #[serde(rename = "sum")]
    Sum,
    #[serde(rename = "mean")]
    Mean,
    #[serde(rename = "count")]
    Count,
    #[serde(rename = "max")]
    Max,
    #[serde(rename = "min")]
    Min,
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
}

/// What an aggregate or summary entry computes, split by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Reduce(Reduction),
    Combine(ArithmeticOp),
}

impl AggregateMethod {
    pub fn kind(&self) -> MethodKind {
        match self {
            AggregateMethod::Sum => MethodKind::Reduce(Reduction::Sum),
            AggregateMethod::Mean => MethodKind::Reduce(Reduction::Mean),
            AggregateMethod::Count => MethodKind::Reduce(Reduction::Count),
            AggregateMethod::Max => MethodKind::Reduce(Reduction::Max),
            AggregateMethod::Min => MethodKind::Reduce(Reduction::Min),
            AggregateMethod::Add => MethodKind::Combine(ArithmeticOp::Add),
            AggregateMethod::Subtract => MethodKind::Combine(ArithmeticOp::Subtract),
            AggregateMethod::Multiply => MethodKind::Combine(ArithmeticOp::Multiply),
            AggregateMethod::Divide => MethodKind::Combine(ArithmeticOp::Divide),
        }
    }
}

// ============================================================================
// FILTER
// ============================================================================

/// `{category_filter?, numeric_filter?, table_filter?}`, applied in that order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Column -> allowed values.
    #[serde(default)]
    pub category_filter: Option<BTreeMap<String, Vec<JsonValue>>>,
    #[serde(default)]
    pub numeric_filter: Option<NumericFilter>,
    #[serde(default)]
    pub table_filter: Option<TableFilter>,
}

impl FilterConfig {
    pub fn is_identity(&self) -> bool {
        self.category_filter.is_none() && self.numeric_filter.is_none() && self.table_filter.is_none()
    }
}

/// Exactly one numeric predicate, selected by `filter_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "filter_type", rename_all = "snake_case")]
pub enum NumericFilter {
    Range {
        column: String,
        #[serde(default)]
        min: Option<RangeBound>,
        #[serde(default)]
        max: Option<RangeBound>,
    },
    #[serde(rename = "topk")]
    TopK {
        column: String,
        k: i64,
        #[serde(default)]
        ascending: bool,
    },
    Percentage {
        column: String,
        #[serde(default)]
        min_percentile: f64,
        #[serde(default = "default_max_percentile")]
        max_percentile: f64,
    },
}

impl NumericFilter {
    pub fn column(&self) -> &str {
        match self {
            NumericFilter::Range { column, .. }
            | NumericFilter::TopK { column, .. }
            | NumericFilter::Percentage { column, .. } => column,
        }
    }
}

/// One side of a range filter. A disabled bound imposes no constraint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeBound {
    pub value: f64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub inclusive: bool,
}

impl RangeBound {
    /// The bound if it is enabled.
    pub fn active(bound: &Option<RangeBound>) -> Option<RangeBound> {
        bound.filter(|b| b.enabled)
    }
}

/// Semi-join / anti-join against a caller-supplied reference table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableFilter {
    #[serde(default = "default_true")]
    pub enable: bool,
    /// Name of the reference table in [`crate::StepExtras`].
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub key_columns: Vec<String>,
    #[serde(default)]
    pub exclude_mode: bool,
}

// ============================================================================
// TRANSFORM
// ============================================================================

/// `{operations: [{operation_type, target_name, calculation}...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    pub operations: Vec<TransformOperation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformOperation {
    pub operation_type: OperationType,
    pub target_name: String,
    pub calculation: Calculation,
}

/// Caller intent only: every operation creates or overwrites `target_name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    AddAxis,
    ModifyAxis,
    AddSubject,
    ModifySubject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Calculation {
    /// Broadcast one value to every row.
    Constant {
        #[serde(default)]
        value: CellValue,
    },
    /// Copy an existing column verbatim.
    Copy { source: String },
    /// Elementwise `left operator right`.
    Formula {
        left: Operand,
        operator: ArithmeticOp,
        right: Operand,
    },
    /// Look `source` values up by display string; misses become null.
    Mapping {
        source: String,
        mapping: BTreeMap<String, CellValue>,
    },
}

/// A formula operand: a column name if one matches, otherwise a numeric literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Number(f64),
    Name(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Number(n) => write!(f, "{}", n),
            Operand::Name(s) => f.write_str(s),
        }
    }
}

// ============================================================================
// SUMMARY
// ============================================================================

/// `{formula?: [...], chart?: {graph_type, ...}, include_table?}`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryConfig {
    #[serde(default)]
    pub formula: Option<Vec<FormulaSpec>>,
    #[serde(default)]
    pub chart: Option<ChartConfig>,
    /// Echo the source table back in the result.
    #[serde(default)]
    pub include_table: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaSpec {
    /// Name under which the result is bound. Derived when absent.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub target_subject: Option<Subject>,
    #[serde(rename = "type")]
    pub formula_type: FormulaType,
    #[serde(default)]
    pub formula_text: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default = "default_portion")]
    pub portion: f64,
}

impl FormulaSpec {
    /// The name later formulas use to reference this one.
    pub fn result_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        match (self.formula_type.kind(), &self.target_subject) {
            (FormulaKind::Reduce(r), Some(Subject::Single(col))) => format!("{}({})", r.as_str(), col),
            (FormulaKind::Arithmetic, _) => self.formula_text.clone().unwrap_or_default(),
            (FormulaKind::Combine(op), Some(subject)) => match subject.as_pair() {
                Some((a, b)) => format!("{} {} {}", a, op.symbol(), b),
                None => self.formula_type.as_str().to_string(),
            },
            _ => self.formula_type.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormulaType {
    #[serde(rename = "sum")]
    Sum,
    #[serde(rename = "mean")]
    Mean,
    #[serde(rename = "count")]
    Count,
    #[serde(rename = "max")]
    Max,
    #[serde(rename = "min")]
    Min,
    #[serde(rename = "arithmetic")]
    Arithmetic,
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaKind {
    Reduce(Reduction),
    Arithmetic,
    Combine(ArithmeticOp),
}

impl FormulaType {
    pub fn kind(&self) -> FormulaKind {
        match self {
            FormulaType::Sum => FormulaKind::Reduce(Reduction::Sum),
            FormulaType::Mean => FormulaKind::Reduce(Reduction::Mean),
            FormulaType::Count => FormulaKind::Reduce(Reduction::Count),
            FormulaType::Max => FormulaKind::Reduce(Reduction::Max),
            FormulaType::Min => FormulaKind::Reduce(Reduction::Min),
            FormulaType::Arithmetic => FormulaKind::Arithmetic,
            FormulaType::Add => FormulaKind::Combine(ArithmeticOp::Add),
            FormulaType::Subtract => FormulaKind::Combine(ArithmeticOp::Subtract),
            FormulaType::Multiply => FormulaKind::Combine(ArithmeticOp::Multiply),
            FormulaType::Divide => FormulaKind::Combine(ArithmeticOp::Divide),
        }
    }

    /// The wire tag, echoed back as the result `kind`.
    pub fn as_str(&self) -> &'static str {
        match self.kind() {
            FormulaKind::Reduce(r) => r.as_str(),
            FormulaKind::Arithmetic => "arithmetic",
            FormulaKind::Combine(op) => op.symbol(),
        }
    }
}

/// `{graph_type, ...options}`. The tag stays a string here so an unsupported
/// value can be reported with the full supported list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    pub graph_type: String,
    #[serde(flatten)]
    pub options: Map<String, JsonValue>,
}

fn default_true() -> bool {
    true
}

fn default_portion() -> f64 {
    1.0
}

fn default_max_percentile() -> f64 {
    100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn step_type_parses_wire_tags() {
        assert_eq!("summary".parse::<StepType>().unwrap(), StepType::Summary);
        let err = "pivot".parse::<StepType>().unwrap_err();
        assert_eq!(
            err.detail("supported"),
            Some(&json!(["aggregate", "filter", "transform", "summary"]))
        );
    }

    #[test]
    fn decode_aggregate_with_both_subject_shapes() {
        let raw = json!({
            "axis": ["region"],
            "column": [
                {"name": "rev", "subject": "revenue", "method": "sum"},
                {"name": "cost", "subject": "cost", "method": "sum"},
                {"name": "margin", "subject": ["rev", "cost"], "method": "-"}
            ]
        });
        let StepConfig::Aggregate(config) = StepConfig::decode(StepType::Aggregate, &raw).unwrap() else {
            panic!("expected aggregate config");
        };
        assert_eq!(config.column[2].subject.as_pair(), Some(("rev", "cost")));
        assert_eq!(
            config.column[2].method.kind(),
            MethodKind::Combine(ArithmeticOp::Subtract)
        );
    }

    #[test]
    fn decode_rejects_non_list_axis() {
        let raw = json!({"axis": "region", "column": []});
        let err = StepConfig::decode(StepType::Aggregate, &raw).unwrap_err();
        assert_eq!(err.detail("reason"), Some(&json!("malformed_config")));
    }

    #[test]
    fn decode_rejects_unknown_method() {
        let raw = json!({"axis": [], "column": [{"name": "m", "subject": "x", "method": "median"}]});
        let err = StepConfig::decode(StepType::Aggregate, &raw).unwrap_err();
        assert!(err.message.contains("median"));
    }

    #[test]
    fn range_bounds_default_to_enabled_and_inclusive() {
        let raw = json!({"numeric_filter": {"filter_type": "range", "column": "v", "min": {"value": 1}}});
        let StepConfig::Filter(config) = StepConfig::decode(StepType::Filter, &raw).unwrap() else {
            panic!("expected filter config");
        };
        let Some(NumericFilter::Range { min: Some(min), max, .. }) = config.numeric_filter else {
            panic!("expected range filter");
        };
        assert!(min.enabled && min.inclusive);
        assert!(max.is_none());
    }

    #[test]
    fn decode_transform_calculations() {
        let raw = json!({"operations": [
            {"operation_type": "add_subject", "target_name": "k", "calculation": {"type": "constant", "value": 1}},
            {"operation_type": "modify_axis", "target_name": "r", "calculation": {"type": "mapping", "source": "r", "mapping": {"N": "North"}}},
            {"operation_type": "add_subject", "target_name": "m", "calculation": {"type": "formula", "left": "revenue", "operator": "/", "right": 2}}
        ]});
        let StepConfig::Transform(config) = StepConfig::decode(StepType::Transform, &raw).unwrap() else {
            panic!("expected transform config");
        };
        assert_eq!(
            config.operations[0].calculation,
            Calculation::Constant { value: CellValue::Number(1.0) }
        );
        assert_eq!(
            config.operations[2].calculation,
            Calculation::Formula {
                left: Operand::Name("revenue".into()),
                operator: ArithmeticOp::Divide,
                right: Operand::Number(2.0),
            }
        );
    }

    #[test]
    fn formula_names_are_derived() {
        let raw = json!({"formula": [
            {"target_subject": "revenue", "type": "sum"},
            {"type": "arithmetic", "formula_text": "revenue - cost"},
            {"target_subject": ["a", "b"], "type": "/"},
            {"name": "explicit", "target_subject": "x", "type": "max"}
        ]});
        let StepConfig::Summary(config) = StepConfig::decode(StepType::Summary, &raw).unwrap() else {
            panic!("expected summary config");
        };
        let names: Vec<String> = config.formula.unwrap().iter().map(FormulaSpec::result_name).collect();
        assert_eq!(names, ["sum(revenue)", "revenue - cost", "a / b", "explicit"]);
    }

    #[test]
    fn chart_options_are_flattened() {
        let raw = json!({"chart": {"graph_type": "bar", "x": "region", "y": "sales"}});
        let StepConfig::Summary(config) = StepConfig::decode(StepType::Summary, &raw).unwrap() else {
            panic!("expected summary config");
        };
        let chart = config.chart.unwrap();
        assert_eq!(chart.graph_type, "bar");
        assert_eq!(chart.options.get("x"), Some(&json!("region")));
        assert!(!chart.options.contains_key("graph_type"));
    }

    #[test]
    fn division_by_zero_is_null() {
        assert_eq!(ArithmeticOp::Divide.apply(1.0, 0.0), None);
        assert_eq!(ArithmeticOp::Divide.apply(1.0, 4.0), Some(0.25));
        assert_eq!(ArithmeticOp::Add.apply_opt(None, Some(1.0)), None);
    }
}

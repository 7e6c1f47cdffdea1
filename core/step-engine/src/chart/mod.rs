//! FILENAME: core/step-engine/src/chart/mod.rs
//! PURPOSE: Chart specification builders for the summary step.
//! CONTEXT: A chart is never rendered here. Each builder turns table columns
//! into a declarative document (`kind`, `data` traces, `layout`) that a client
//! renderer draws. Builders are selected by the `graph_type` tag; three tags
//! are orientation/mode aliases of bar and line.

mod cartesian;
mod distribution;
mod hierarchy;

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};
use table::Table;
use thiserror::Error;

use crate::definition::ChartConfig;
use crate::error::ValidationError;

pub use cartesian::CartesianChart;
pub use distribution::{BoxChart, HeatmapChart, HistogramChart};
pub use hierarchy::{HierarchyChart, PieChart};

// ============================================================================
// GRAPH TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphType {
    Bar,
    Line,
    Pie,
    Scatter,
    Heatmap,
    Box,
    Histogram,
    Area,
    Waterfall,
    Sunburst,
    Treemap,
    /// Bar with horizontal orientation.
    HorizontalBar,
    /// Bar with stacked bar mode.
    StackedBar,
    /// Line with markers on every point.
    LineMarkers,
}

impl GraphType {
    /// The eleven chart kinds a document can have.
    pub const BASE: [GraphType; 11] = [
        GraphType::Bar,
        GraphType::Line,
        GraphType::Pie,
        GraphType::Scatter,
        GraphType::Heatmap,
        GraphType::Box,
        GraphType::Histogram,
        GraphType::Area,
        GraphType::Waterfall,
        GraphType::Sunburst,
        GraphType::Treemap,
    ];

    /// Every accepted `graph_type` tag, base kinds first.
    pub const ALL: [GraphType; 14] = [
        GraphType::Bar,
        GraphType::Line,
        GraphType::Pie,
        GraphType::Scatter,
        GraphType::Heatmap,
        GraphType::Box,
        GraphType::Histogram,
        GraphType::Area,
        GraphType::Waterfall,
        GraphType::Sunburst,
        GraphType::Treemap,
        GraphType::HorizontalBar,
        GraphType::StackedBar,
        GraphType::LineMarkers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GraphType::Bar => "bar",
            GraphType::Line => "line",
            GraphType::Pie => "pie",
            GraphType::Scatter => "scatter",
            GraphType::Heatmap => "heatmap",
            GraphType::Box => "box",
            GraphType::Histogram => "histogram",
            GraphType::Area => "area",
            GraphType::Waterfall => "waterfall",
            GraphType::Sunburst => "sunburst",
            GraphType::Treemap => "treemap",
            GraphType::HorizontalBar => "horizontal_bar",
            GraphType::StackedBar => "stacked_bar",
            GraphType::LineMarkers => "line_markers",
        }
    }

    pub fn parse(tag: &str) -> Option<GraphType> {
        GraphType::ALL.into_iter().find(|t| t.as_str() == tag)
    }

    /// The document kind: aliases resolve to the chart they modify.
    pub fn base(&self) -> GraphType {
        match self {
            GraphType::HorizontalBar | GraphType::StackedBar => GraphType::Bar,
            GraphType::LineMarkers => GraphType::Line,
            other => *other,
        }
    }

    pub fn builder(&self) -> &'static dyn ChartBuilder {
        match self {
            GraphType::Bar
            | GraphType::HorizontalBar
            | GraphType::StackedBar
            | GraphType::Line
            | GraphType::LineMarkers
            | GraphType::Scatter
            | GraphType::Area
            | GraphType::Waterfall => &CartesianChart,
            GraphType::Pie => &PieChart,
            GraphType::Heatmap => &HeatmapChart,
            GraphType::Box => &BoxChart,
            GraphType::Histogram => &HistogramChart,
            GraphType::Sunburst | GraphType::Treemap => &HierarchyChart,
        }
    }

    fn supported() -> Vec<&'static str> {
        GraphType::ALL.iter().map(GraphType::as_str).collect()
    }
}

impl fmt::Display for GraphType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// DOCUMENT
// ============================================================================

/// A renderer-ready chart description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDocument {
    pub kind: String,
    pub data: Vec<JsonValue>,
    pub layout: JsonValue,
}

/// What a builder produces before the shared layout keys are added.
#[derive(Debug, Clone, Default)]
pub struct ChartParts {
    pub data: Vec<JsonValue>,
    pub layout: Map<String, JsonValue>,
}

// ============================================================================
// BUILDERS
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    #[error("Missing required chart option '{0}'")]
    MissingOption(String),
    #[error("Chart option '{option}' is invalid: {reason}")]
    InvalidOption { option: String, reason: String },
    #[error("Chart option '{option}' names unknown column '{column}'")]
    UnknownColumn { option: String, column: String },
}

impl ChartError {
    pub fn option(&self) -> &str {
        match self {
            ChartError::MissingOption(option)
            | ChartError::InvalidOption { option, .. }
            | ChartError::UnknownColumn { option, .. } => option,
        }
    }

    fn invalid(option: &str, reason: impl Into<String>) -> Self {
        ChartError::InvalidOption {
            option: option.to_string(),
            reason: reason.into(),
        }
    }
}

/// One chart construction strategy.
pub trait ChartBuilder: Sync {
    /// Options that must be present for the document to be built at all.
    fn required_options(&self) -> &'static [&'static str];

    fn build(&self, table: &Table, options: &ChartOptions<'_>) -> Result<ChartParts, ChartError>;
}

/// Typed access to the free-form options of a chart config.
pub struct ChartOptions<'a> {
    pub graph_type: GraphType,
    values: &'a Map<String, JsonValue>,
}

impl<'a> ChartOptions<'a> {
    pub fn new(graph_type: GraphType, values: &'a Map<String, JsonValue>) -> Self {
        ChartOptions { graph_type, values }
    }

    pub fn get(&self, key: &str) -> Option<&'a JsonValue> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    /// A required option naming one existing column.
    pub fn column(&self, table: &Table, key: &str) -> Result<&'a str, ChartError> {
        self.optional_column(table, key)?
            .ok_or_else(|| ChartError::MissingOption(key.to_string()))
    }

    pub fn optional_column(&self, table: &Table, key: &str) -> Result<Option<&'a str>, ChartError> {
        match self.get(key) {
            None => Ok(None),
            Some(JsonValue::String(name)) => existing(table, key, name).map(Some),
            Some(_) => Err(ChartError::invalid(key, "expected a column name")),
        }
    }

    /// A required option naming one column or a non-empty list of columns.
    pub fn columns(&self, table: &Table, key: &str) -> Result<Vec<&'a str>, ChartError> {
        match self.get(key) {
            None => Err(ChartError::MissingOption(key.to_string())),
            Some(JsonValue::String(name)) => Ok(vec![existing(table, key, name)?]),
            Some(JsonValue::Array(items)) if !items.is_empty() => items
                .iter()
                .map(|item| match item {
                    JsonValue::String(name) => existing(table, key, name),
                    _ => Err(ChartError::invalid(key, "expected a list of column names")),
                })
                .collect(),
            Some(_) => Err(ChartError::invalid(key, "expected a column name or a non-empty list of column names")),
        }
    }

    pub fn number(&self, key: &str) -> Result<Option<f64>, ChartError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| ChartError::invalid(key, "expected a number")),
        }
    }

    pub fn title(&self) -> Option<&'a str> {
        self.get("title").and_then(JsonValue::as_str)
    }
}

fn existing<'a>(table: &Table, key: &str, name: &'a str) -> Result<&'a str, ChartError> {
    if table.has_column(name) {
        Ok(name)
    } else {
        Err(ChartError::UnknownColumn {
            option: key.to_string(),
            column: name.to_string(),
        })
    }
}

/// Column cells as JSON scalars, in row order.
pub(crate) fn column_json(table: &Table, column: &str) -> Vec<JsonValue> {
    table
        .column_values(column)
        .map(|values| values.map(|v| v.to_json()).collect())
        .unwrap_or_default()
}

/// Column cells coerced to numbers; anything non-numeric becomes null.
pub(crate) fn column_numbers(table: &Table, column: &str) -> Vec<JsonValue> {
    table
        .column_values(column)
        .map(|values| values.map(|v| JsonValue::from(v.as_number())).collect())
        .unwrap_or_default()
}

/// Distinct display values of a column in first-seen order, plus the
/// category index of every row.
pub(crate) fn categories(table: &Table, column: &str) -> (Vec<String>, Vec<usize>) {
    let mut labels: Vec<String> = Vec::new();
    let mut seen: FxHashMap<String, usize> = FxHashMap::default();
    let mut assignment = Vec::with_capacity(table.row_count());

    if let Some(values) = table.column_values(column) {
        for value in values {
            let label = value.display_value();
            let index = match seen.get(&label) {
                Some(&index) => index,
                None => {
                    seen.insert(label.clone(), labels.len());
                    labels.push(label);
                    labels.len() - 1
                }
            };
            assignment.push(index);
        }
    }
    (labels, assignment)
}

/// Row positions grouped by the display value of `column`, first-seen order.
pub(crate) fn split_rows(table: &Table, column: &str) -> Vec<(String, Vec<usize>)> {
    let (labels, assignment) = categories(table, column);
    let mut groups: Vec<(String, Vec<usize>)> = labels.into_iter().map(|l| (l, Vec::new())).collect();
    for (row, index) in assignment.into_iter().enumerate() {
        groups[index].1.push(row);
    }
    groups
}

// ============================================================================
// ENTRY POINTS
// ============================================================================

fn unsupported(tag: &str) -> ValidationError {
    ValidationError::new(format!("Unsupported chart type: {}", tag))
        .field("chart.graph_type")
        .with_detail("value", tag)
        .with_detail("supported", GraphType::supported())
}

fn wrap(graph_type: GraphType, config: &ChartConfig, err: ChartError) -> ValidationError {
    ValidationError::new(format!("Cannot build {} chart: {}", graph_type, err))
        .field(format!("chart.{}", err.option()))
        .with_detail("chart_type", graph_type.as_str())
        .with_detail("options", JsonValue::Object(config.options.clone()))
}

/// Builds the chart document for `config` from `table`.
pub fn build_chart(table: &Table, config: &ChartConfig) -> Result<ChartDocument, ValidationError> {
    let graph_type = GraphType::parse(&config.graph_type).ok_or_else(|| unsupported(&config.graph_type))?;
    let options = ChartOptions::new(graph_type, &config.options);

    let parts = graph_type
        .builder()
        .build(table, &options)
        .map_err(|e| wrap(graph_type, config, e))?;

    let mut layout = parts.layout;
    if let Some(title) = options.title() {
        layout.insert("title".to_string(), json!({ "text": title }));
    }

    log::trace!(
        "built {} chart with {} trace(s)",
        graph_type,
        parts.data.len()
    );

    Ok(ChartDocument {
        kind: graph_type.base().as_str().to_string(),
        data: parts.data,
        layout: JsonValue::Object(layout),
    })
}

/// Checks the tag and required options; with a table, also does a dry-run build.
pub fn validate_chart(config: &ChartConfig, table: Option<&Table>) -> Result<(), ValidationError> {
    let graph_type = GraphType::parse(&config.graph_type).ok_or_else(|| unsupported(&config.graph_type))?;

    let options = ChartOptions::new(graph_type, &config.options);
    for key in graph_type.builder().required_options() {
        if options.get(key).is_none() {
            return Err(wrap(graph_type, config, ChartError::MissingOption(key.to_string())));
        }
    }

    if let Some(table) = table {
        build_chart(table, config)?;
    }
    Ok(())
}

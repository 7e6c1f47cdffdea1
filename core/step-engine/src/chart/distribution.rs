//! FILENAME: core/step-engine/src/chart/distribution.rs
//! PURPOSE: Charts that describe how values are spread: box, histogram and
//! heatmap.

use serde_json::{json, Map, Value as JsonValue};
use table::Table;

use super::{categories, column_json, column_numbers, ChartBuilder, ChartError, ChartOptions, ChartParts};

// ============================================================================
// BOX
// ============================================================================

pub struct BoxChart;

impl ChartBuilder for BoxChart {
    fn required_options(&self) -> &'static [&'static str] {
        &["y"]
    }

    fn build(&self, table: &Table, options: &ChartOptions<'_>) -> Result<ChartParts, ChartError> {
        let ys = options.columns(table, "y")?;
        let x = options.optional_column(table, "x")?;
        let x_values = x.map(|x| column_json(table, x));

        let data = ys
            .iter()
            .map(|y| {
                let mut trace = Map::new();
                trace.insert("type".to_string(), json!("box"));
                trace.insert("name".to_string(), json!(y));
                trace.insert("y".to_string(), JsonValue::Array(column_numbers(table, y)));
                if let Some(x_values) = &x_values {
                    trace.insert("x".to_string(), JsonValue::Array(x_values.clone()));
                }
                JsonValue::Object(trace)
            })
            .collect();

        let mut layout = Map::new();
        layout.insert("yaxis".to_string(), json!({ "title": { "text": ys.join(", ") } }));
        if let Some(x) = x {
            layout.insert("xaxis".to_string(), json!({ "title": { "text": x } }));
            layout.insert("boxmode".to_string(), json!("group"));
        }
        Ok(ChartParts { data, layout })
    }
}

// ============================================================================
// HISTOGRAM
// ============================================================================

pub struct HistogramChart;

impl ChartBuilder for HistogramChart {
    fn required_options(&self) -> &'static [&'static str] {
        &["x"]
    }

    fn build(&self, table: &Table, options: &ChartOptions<'_>) -> Result<ChartParts, ChartError> {
        let xs = options.columns(table, "x")?;
        let nbins = match options.number("nbins")? {
            None => None,
            Some(n) if n >= 1.0 && n.fract() == 0.0 => Some(n as u64),
            Some(_) => {
                return Err(ChartError::InvalidOption {
                    option: "nbins".to_string(),
                    reason: "expected a positive whole number".to_string(),
                })
            }
        };

        let data = xs
            .iter()
            .map(|x| {
                let mut trace = Map::new();
                trace.insert("type".to_string(), json!("histogram"));
                trace.insert("name".to_string(), json!(x));
                trace.insert("x".to_string(), JsonValue::Array(column_numbers(table, x)));
                if let Some(nbins) = nbins {
                    trace.insert("nbinsx".to_string(), json!(nbins));
                }
                JsonValue::Object(trace)
            })
            .collect();

        let mut layout = Map::new();
        layout.insert("xaxis".to_string(), json!({ "title": { "text": xs.join(", ") } }));
        layout.insert("yaxis".to_string(), json!({ "title": { "text": "count" } }));
        if xs.len() > 1 {
            layout.insert("barmode".to_string(), json!("overlay"));
        }
        Ok(ChartParts { data, layout })
    }
}

// ============================================================================
// HEATMAP
// ============================================================================

pub struct HeatmapChart;

impl ChartBuilder for HeatmapChart {
    fn required_options(&self) -> &'static [&'static str] {
        &["x", "y", "z"]
    }

    /// Pivots the rows into a `z[y][x]` matrix. Rows sharing an (x, y) cell
    /// are summed; cells no row reaches stay null.
    fn build(&self, table: &Table, options: &ChartOptions<'_>) -> Result<ChartParts, ChartError> {
        let x = options.column(table, "x")?;
        let y = options.column(table, "y")?;
        let z = options.column(table, "z")?;

        let (x_labels, x_index) = categories(table, x);
        let (y_labels, y_index) = categories(table, y);

        let mut matrix: Vec<Vec<Option<f64>>> = vec![vec![None; x_labels.len()]; y_labels.len()];
        if let Some(values) = table.column_values(z) {
            for (row, value) in values.enumerate() {
                if let Some(n) = value.as_number() {
                    let cell = &mut matrix[y_index[row]][x_index[row]];
                    *cell = Some(cell.unwrap_or(0.0) + n);
                }
            }
        }

        let trace = json!({
            "type": "heatmap",
            "name": z,
            "x": x_labels,
            "y": y_labels,
            "z": matrix,
        });

        let mut layout = Map::new();
        layout.insert("xaxis".to_string(), json!({ "title": { "text": x } }));
        layout.insert("yaxis".to_string(), json!({ "title": { "text": y } }));
        Ok(ChartParts {
            data: vec![trace],
            layout,
        })
    }
}

//! FILENAME: core/step-engine/src/chart/cartesian.rs
//! PURPOSE: x/y charts: bar, line, area, scatter and waterfall.
//! CONTEXT: One trace per `y` column. With a `color` column every y trace is
//! further split by the distinct color values, in first-seen order.

use serde_json::{json, Map, Value as JsonValue};
use table::Table;

use super::{column_json, column_numbers, split_rows, ChartBuilder, ChartError, ChartOptions, ChartParts, GraphType};

pub struct CartesianChart;

/// Per-kind trace attributes.
struct TraceStyle {
    trace_type: &'static str,
    mode: Option<&'static str>,
    fill: Option<&'static str>,
    horizontal: bool,
    barmode: Option<&'static str>,
}

impl TraceStyle {
    fn for_type(graph_type: GraphType) -> TraceStyle {
        let plain = |trace_type: &'static str| TraceStyle {
            trace_type,
            mode: None,
            fill: None,
            horizontal: false,
            barmode: None,
        };
        match graph_type {
            GraphType::HorizontalBar => TraceStyle {
                horizontal: true,
                barmode: Some("group"),
                ..plain("bar")
            },
            GraphType::StackedBar => TraceStyle {
                barmode: Some("stack"),
                ..plain("bar")
            },
            GraphType::Line => TraceStyle {
                mode: Some("lines"),
                ..plain("scatter")
            },
            GraphType::LineMarkers => TraceStyle {
                mode: Some("lines+markers"),
                ..plain("scatter")
            },
            GraphType::Area => TraceStyle {
                mode: Some("lines"),
                fill: Some("tozeroy"),
                ..plain("scatter")
            },
            GraphType::Scatter => TraceStyle {
                mode: Some("markers"),
                ..plain("scatter")
            },
            GraphType::Waterfall => plain("waterfall"),
            _ => TraceStyle {
                barmode: Some("group"),
                ..plain("bar")
            },
        }
    }

    fn trace(&self, name: &str, x: Vec<JsonValue>, y: Vec<JsonValue>) -> JsonValue {
        let mut trace = Map::new();
        trace.insert("type".to_string(), json!(self.trace_type));
        trace.insert("name".to_string(), json!(name));
        if self.trace_type == "waterfall" {
            trace.insert("measure".to_string(), json!(vec!["relative"; x.len()]));
        }
        if self.horizontal {
            trace.insert("orientation".to_string(), json!("h"));
            trace.insert("x".to_string(), JsonValue::Array(y));
            trace.insert("y".to_string(), JsonValue::Array(x));
        } else {
            trace.insert("x".to_string(), JsonValue::Array(x));
            trace.insert("y".to_string(), JsonValue::Array(y));
        }
        if let Some(mode) = self.mode {
            trace.insert("mode".to_string(), json!(mode));
        }
        if let Some(fill) = self.fill {
            trace.insert("fill".to_string(), json!(fill));
        }
        JsonValue::Object(trace)
    }
}

fn pick(values: &[JsonValue], rows: &[usize]) -> Vec<JsonValue> {
    rows.iter().map(|&row| values[row].clone()).collect()
}

impl ChartBuilder for CartesianChart {
    fn required_options(&self) -> &'static [&'static str] {
        &["x", "y"]
    }

    fn build(&self, table: &Table, options: &ChartOptions<'_>) -> Result<ChartParts, ChartError> {
        let x = options.column(table, "x")?;
        let ys = options.columns(table, "y")?;
        let color = options.optional_column(table, "color")?;
        let style = TraceStyle::for_type(options.graph_type);

        let x_values = column_json(table, x);
        let color_groups = color.map(|c| split_rows(table, c));

        let mut data = Vec::new();
        for y in &ys {
            let y_values = column_numbers(table, y);
            match &color_groups {
                None => data.push(style.trace(y, x_values.clone(), y_values)),
                Some(groups) => {
                    for (label, rows) in groups {
                        let name = if ys.len() > 1 {
                            format!("{} - {}", y, label)
                        } else {
                            label.clone()
                        };
                        data.push(style.trace(&name, pick(&x_values, rows), pick(&y_values, rows)));
                    }
                }
            }
        }

        let x_title = x.to_string();
        let y_title = ys.join(", ");
        let (x_title, y_title) = if style.horizontal {
            (y_title, x_title)
        } else {
            (x_title, y_title)
        };

        let mut layout = Map::new();
        layout.insert("xaxis".to_string(), json!({ "title": { "text": x_title } }));
        layout.insert("yaxis".to_string(), json!({ "title": { "text": y_title } }));
        if let Some(barmode) = style.barmode {
            layout.insert("barmode".to_string(), json!(barmode));
        }
        if color.is_some() {
            layout.insert("showlegend".to_string(), json!(true));
        }

        Ok(ChartParts { data, layout })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales() -> Table {
        Table::from_records(&[
            json!({"month": "Jan", "region": "North", "revenue": 100, "cost": 60}),
            json!({"month": "Jan", "region": "South", "revenue": 80, "cost": 50}),
            json!({"month": "Feb", "region": "North", "revenue": 120, "cost": "n/a"}),
        ])
        .unwrap()
    }

    fn build(raw: JsonValue) -> Result<ChartParts, ChartError> {
        let map = raw.as_object().cloned().unwrap();
        let graph_type = GraphType::parse(map["graph_type"].as_str().unwrap()).unwrap();
        CartesianChart.build(&sales(), &ChartOptions::new(graph_type, &map))
    }

    #[test]
    fn one_trace_per_y_column() {
        let parts = build(json!({"graph_type": "bar", "x": "month", "y": ["revenue", "cost"]})).unwrap();
        assert_eq!(parts.data.len(), 2);
        assert_eq!(parts.data[1]["name"], json!("cost"));
        // Non-numeric cells plot as gaps.
        assert_eq!(parts.data[1]["y"], json!([60.0, 50.0, null]));
        assert_eq!(parts.layout["barmode"], json!("group"));
    }

    #[test]
    fn color_splits_traces_in_first_seen_order() {
        let parts = build(json!({"graph_type": "line", "x": "month", "y": "revenue", "color": "region"})).unwrap();
        let names: Vec<&str> = parts.data.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(names, ["North", "South"]);
        assert_eq!(parts.data[0]["x"], json!(["Jan", "Feb"]));
        assert_eq!(parts.data[0]["mode"], json!("lines"));
    }

    #[test]
    fn aliases_adjust_style() {
        let stacked = build(json!({"graph_type": "stacked_bar", "x": "month", "y": "revenue"})).unwrap();
        assert_eq!(stacked.layout["barmode"], json!("stack"));

        let markers = build(json!({"graph_type": "line_markers", "x": "month", "y": "revenue"})).unwrap();
        assert_eq!(markers.data[0]["mode"], json!("lines+markers"));

        let horizontal = build(json!({"graph_type": "horizontal_bar", "x": "month", "y": "revenue"})).unwrap();
        assert_eq!(horizontal.data[0]["y"], json!(["Jan", "Jan", "Feb"]));
        assert_eq!(horizontal.layout["yaxis"]["title"]["text"], json!("month"));
    }

    #[test]
    fn waterfall_marks_every_step_relative() {
        let parts = build(json!({"graph_type": "waterfall", "x": "month", "y": "revenue"})).unwrap();
        assert_eq!(parts.data[0]["type"], json!("waterfall"));
        assert_eq!(parts.data[0]["measure"], json!(["relative", "relative", "relative"]));
    }

    #[test]
    fn missing_y_is_reported() {
        let err = build(json!({"graph_type": "area", "x": "month"})).unwrap_err();
        assert_eq!(err, ChartError::MissingOption("y".to_string()));
    }
}

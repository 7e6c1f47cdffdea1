//! FILENAME: core/step-engine/src/chart/hierarchy.rs
//! PURPOSE: Part-of-whole charts: pie, sunburst and treemap.
//! CONTEXT: Sunburst and treemap flatten a `path` of category columns into
//! `ids`/`labels`/`parents`/`values` node arrays. Node ids join the path
//! labels with '/', so equal labels under different parents stay distinct.

use rustc_hash::FxHashMap;
use serde_json::{json, Map, Value as JsonValue};
use table::Table;

use super::{column_json, column_numbers, ChartBuilder, ChartError, ChartOptions, ChartParts};

const BLANK_LABEL: &str = "(blank)";

// ============================================================================
// PIE
// ============================================================================

pub struct PieChart;

impl ChartBuilder for PieChart {
    fn required_options(&self) -> &'static [&'static str] {
        &["names", "values"]
    }

    fn build(&self, table: &Table, options: &ChartOptions<'_>) -> Result<ChartParts, ChartError> {
        let names = options.column(table, "names")?;
        let values = options.column(table, "values")?;

        let mut trace = Map::new();
        trace.insert("type".to_string(), json!("pie"));
        trace.insert("name".to_string(), json!(values));
        trace.insert("labels".to_string(), JsonValue::Array(column_json(table, names)));
        trace.insert("values".to_string(), JsonValue::Array(column_numbers(table, values)));

        if let Some(hole) = options.number("hole")? {
            if !(0.0..1.0).contains(&hole) {
                return Err(ChartError::InvalidOption {
                    option: "hole".to_string(),
                    reason: "expected a number in [0, 1)".to_string(),
                });
            }
            trace.insert("hole".to_string(), json!(hole));
        }

        Ok(ChartParts {
            data: vec![JsonValue::Object(trace)],
            layout: Map::new(),
        })
    }
}

// ============================================================================
// SUNBURST / TREEMAP
// ============================================================================

pub struct HierarchyChart;

#[derive(Default)]
struct NodeSet {
    ids: Vec<String>,
    labels: Vec<String>,
    parents: Vec<String>,
    values: Vec<f64>,
    index: FxHashMap<String, usize>,
}

impl NodeSet {
    /// Adds `amount` to the node, creating it on first sight.
    fn add(&mut self, id: String, label: String, parent: String, amount: f64) {
        match self.index.get(&id) {
            Some(&i) => self.values[i] += amount,
            None => {
                self.index.insert(id.clone(), self.ids.len());
                self.ids.push(id);
                self.labels.push(label);
                self.parents.push(parent);
                self.values.push(amount);
            }
        }
    }
}

impl ChartBuilder for HierarchyChart {
    fn required_options(&self) -> &'static [&'static str] {
        &["path"]
    }

    /// Every row contributes its value (or 1 without a `values` column) to
    /// each node along its path, so parents carry the total of their children.
    fn build(&self, table: &Table, options: &ChartOptions<'_>) -> Result<ChartParts, ChartError> {
        let path = options.columns(table, "path")?;
        let values = options.optional_column(table, "values")?;

        let positions: Vec<usize> = path.iter().filter_map(|c| table.column_index(c)).collect();
        let value_position = values.and_then(|c| table.column_index(c));

        let mut nodes = NodeSet::default();
        for row in table.rows() {
            let amount = match value_position {
                Some(col) => row[col].as_number().unwrap_or(0.0),
                None => 1.0,
            };

            let mut parent = String::new();
            for &col in &positions {
                let label = match row[col].display_value() {
                    label if label.is_empty() => BLANK_LABEL.to_string(),
                    label => label,
                };
                let id = if parent.is_empty() {
                    label.clone()
                } else {
                    format!("{}/{}", parent, label)
                };
                nodes.add(id.clone(), label, parent, amount);
                parent = id;
            }
        }

        let trace = json!({
            "type": options.graph_type.base().as_str(),
            "name": values.unwrap_or("count"),
            "ids": nodes.ids,
            "labels": nodes.labels,
            "parents": nodes.parents,
            "values": nodes.values,
            "branchvalues": "total",
        });

        Ok(ChartParts {
            data: vec![trace],
            layout: Map::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::GraphType;

    fn sales() -> Table {
        Table::from_records(&[
            json!({"region": "North", "city": "Oslo", "revenue": 10}),
            json!({"region": "North", "city": "Bergen", "revenue": 5}),
            json!({"region": "South", "city": "Oslo", "revenue": 7}),
            json!({"region": "North", "city": "Oslo", "revenue": 1}),
        ])
        .unwrap()
    }

    fn build(builder: &dyn ChartBuilder, graph_type: GraphType, raw: JsonValue) -> Result<ChartParts, ChartError> {
        let map = raw.as_object().cloned().unwrap();
        builder.build(&sales(), &ChartOptions::new(graph_type, &map))
    }

    #[test]
    fn parents_hold_totals() {
        let parts = build(
            &HierarchyChart,
            GraphType::Sunburst,
            json!({"path": ["region", "city"], "values": "revenue"}),
        )
        .unwrap();
        let trace = &parts.data[0];
        assert_eq!(trace["type"], json!("sunburst"));
        assert_eq!(
            trace["ids"],
            json!(["North", "North/Oslo", "North/Bergen", "South", "South/Oslo"])
        );
        assert_eq!(trace["parents"], json!(["", "North", "North", "", "South"]));
        assert_eq!(trace["values"], json!([16.0, 11.0, 5.0, 7.0, 7.0]));
    }

    #[test]
    fn treemap_counts_rows_without_values() {
        let parts = build(&HierarchyChart, GraphType::Treemap, json!({"path": "region"})).unwrap();
        assert_eq!(parts.data[0]["values"], json!([3.0, 1.0]));
        assert_eq!(parts.data[0]["type"], json!("treemap"));
    }

    #[test]
    fn pie_hole_must_be_fraction() {
        let err = build(
            &PieChart,
            GraphType::Pie,
            json!({"names": "city", "values": "revenue", "hole": 1.5}),
        )
        .unwrap_err();
        assert_eq!(err.option(), "hole");
    }
}

// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use super::{
    axis_fields, distinct_labels, ensure_object_parameters, extract_column, generate_title,
    heatmap_value_column, lookup, SpecGenerator,
};
use crate::error::Result;
use crate::model::{ChartSpecification, ChartType, Framework, VisualizationRequest};
use quarry::Row;
use serde_json::{json, Value as Json};

/// Plotly `{data, layout}` documents. Unsupported kinds render as bars.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlotlySpecGenerator;

impl SpecGenerator for PlotlySpecGenerator {
    fn framework(&self) -> Framework {
        Framework::Plotly
    }

    fn generate(&self, request: &VisualizationRequest, rows: &[Row]) -> Result<ChartSpecification> {
        let chart_type = request.effective_chart_type();
        ensure_object_parameters(request, &chart_type)?;
        let spec = match chart_type {
            ChartType::Line => line(request, rows),
            ChartType::Scatter => scatter(request, rows),
            ChartType::Pie => pie(request, rows),
            ChartType::Heatmap => heatmap(request, rows),
            ChartType::Bar
            | ChartType::Area
            | ChartType::Combo
            | ChartType::ExecutiveDashboard
            | ChartType::GradientArea
            | ChartType::InteractiveHeatmap
            | ChartType::Candlestick
            | ChartType::Radar
            | ChartType::Sunburst
            | ChartType::Other(_) => bar(request, rows),
        };
        Ok(ChartSpecification::new(Framework::Plotly, chart_type, spec))
    }
}

fn axis_title(column: Option<&String>, fallback: &str) -> Json {
    json!({ "title": column.map_or(fallback, String::as_str) })
}

fn bar(request: &VisualizationRequest, rows: &[Row]) -> Json {
    let trace = json!({
        "x": extract_column(rows, request.x_column.as_deref()),
        "y": extract_column(rows, request.y_column.as_deref()),
        "type": "bar",
        "name": request.y_column.as_deref().unwrap_or("Value"),
        "marker": { "color": "#3498db" },
    });
    json!({
        "data": [trace],
        "layout": {
            "title": generate_title(request),
            "xaxis": axis_title(request.x_column.as_ref(), "Category"),
            "yaxis": axis_title(request.y_column.as_ref(), "Value"),
            "hovermode": "closest",
        },
    })
}

fn line(request: &VisualizationRequest, rows: &[Row]) -> Json {
    let trace = json!({
        "x": extract_column(rows, request.x_column.as_deref()),
        "y": extract_column(rows, request.y_column.as_deref()),
        "type": "scatter",
        "mode": "lines+markers",
        "name": request.y_column.as_deref().unwrap_or("Value"),
        "line": { "color": "#e74c3c" },
    });
    json!({
        "data": [trace],
        "layout": {
            "title": generate_title(request),
            "xaxis": axis_title(request.x_column.as_ref(), "X Axis"),
            "yaxis": axis_title(request.y_column.as_ref(), "Y Axis"),
            "hovermode": "x",
        },
    })
}

fn scatter(request: &VisualizationRequest, rows: &[Row]) -> Json {
    let marker = match request.color_column.as_deref() {
        Some(color) => json!({
            "color": extract_column(rows, Some(color)),
            "colorscale": "Viridis",
            "showscale": true,
        }),
        None => json!({ "color": "#9b59b6" }),
    };
    let trace = json!({
        "x": extract_column(rows, request.x_column.as_deref()),
        "y": extract_column(rows, request.y_column.as_deref()),
        "type": "scatter",
        "mode": "markers",
        "name": "Data Points",
        "marker": marker,
    });
    json!({
        "data": [trace],
        "layout": {
            "title": generate_title(request),
            "xaxis": axis_title(request.x_column.as_ref(), "X Axis"),
            "yaxis": axis_title(request.y_column.as_ref(), "Y Axis"),
            "hovermode": "closest",
        },
    })
}

fn pie(request: &VisualizationRequest, rows: &[Row]) -> Json {
    let trace = json!({
        "labels": extract_column(rows, request.x_column.as_deref()),
        "values": extract_column(rows, request.y_column.as_deref()),
        "type": "pie",
        "hole": 0.3,
        "textinfo": "label+percent",
    });
    json!({
        "data": [trace],
        "layout": { "title": generate_title(request), "showlegend": true },
    })
}

/// Dense `[y][x]` matrix; absent, non-numeric or non-finite cells are zero.
fn heatmap(request: &VisualizationRequest, rows: &[Row]) -> Json {
    let (x_col, y_col) = axis_fields(request, rows);
    let z_col = heatmap_value_column(request, rows);

    let x_labels = distinct_labels(rows, &x_col);
    let y_labels = distinct_labels(rows, &y_col);
    let mut z = vec![vec![0.0_f64; x_labels.len()]; y_labels.len()];
    for row in rows {
        let (Some(x), Some(y)) = (lookup(row, &x_col), lookup(row, &y_col)) else {
            continue;
        };
        let (Some(xi), Some(yi)) = (
            x_labels.get_index_of(&x.to_string()),
            y_labels.get_index_of(&y.to_string()),
        ) else {
            continue;
        };
        z[yi][xi] = lookup(row, &z_col)
            .and_then(quarry::Value::to_f64_lenient)
            .filter(|v| v.is_finite())
            .unwrap_or(0.0);
    }

    let trace = json!({
        "x": x_labels.into_values().collect::<Vec<_>>(),
        "y": y_labels.into_values().collect::<Vec<_>>(),
        "z": z,
        "type": "heatmap",
        "colorscale": "RdYlBu",
        "showscale": true,
    });
    json!({
        "data": [trace],
        "layout": {
            "title": generate_title(request),
            "xaxis": { "title": x_col },
            "yaxis": { "title": y_col },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry::Value;

    fn cell(x: &str, y: &str, v: i64) -> Row {
        [
            ("X".to_string(), Value::from(x)),
            ("Y".to_string(), Value::from(y)),
            ("VALUE".to_string(), Value::from(v)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn heatmap_matrix_is_dense_with_zero_fill() {
        let rows = vec![cell("A", "P", 5), cell("B", "P", 3), cell("A", "Q", 1)];
        let req = VisualizationRequest::new("T")
            .with_chart_type(ChartType::Heatmap)
            .with_axes("X", "Y");
        let spec = PlotlySpecGenerator.generate(&req, &rows).unwrap();
        let trace = &spec.specification()["data"][0];
        assert_eq!(trace["x"], json!(["A", "B"]));
        assert_eq!(trace["y"], json!(["P", "Q"]));
        assert_eq!(trace["z"], json!([[5.0, 3.0], [1.0, 0.0]]));
    }

    #[test]
    fn heatmap_cells_that_are_not_finite_become_zero() {
        let mut rows = vec![cell("A", "P", 0), cell("B", "P", 0), cell("A", "Q", 0)];
        rows[0].insert("VALUE".to_string(), Value::from("NaN"));
        rows[1].insert("VALUE".to_string(), Value::from(f64::INFINITY));
        rows[2].insert("VALUE".to_string(), Value::from(f64::NAN));
        let req = VisualizationRequest::new("T")
            .with_chart_type(ChartType::Heatmap)
            .with_axes("X", "Y");
        let spec = PlotlySpecGenerator.generate(&req, &rows).unwrap();
        let z = &spec.specification()["data"][0]["z"];
        assert_eq!(z, &json!([[0.0, 0.0], [0.0, 0.0]]));
        assert!(z.as_array().unwrap().iter().flat_map(|r| r.as_array().unwrap()).all(Json::is_number));
    }

    #[test]
    fn scatter_with_color_column_uses_continuous_scale() {
        let rows = vec![cell("1", "P", 10), cell("2", "Q", 20)];
        let mut req = VisualizationRequest::new("T")
            .with_chart_type(ChartType::Scatter)
            .with_axes("X", "VALUE");
        req.color_column = Some("VALUE".to_string());
        let spec = PlotlySpecGenerator.generate(&req, &rows).unwrap();
        let trace = &spec.specification()["data"][0];
        assert_eq!(trace["mode"], "markers");
        assert_eq!(trace["marker"]["color"], json!([10, 20]));
        assert_eq!(trace["marker"]["colorscale"], "Viridis");
        assert_eq!(trace["marker"]["showscale"], true);

        req.color_column = None;
        let plain = PlotlySpecGenerator.generate(&req, &rows).unwrap();
        assert_eq!(plain.specification()["data"][0]["marker"], json!({ "color": "#9b59b6" }));
    }

    #[test]
    fn pie_takes_labels_from_x_and_values_from_y() {
        let rows = vec![cell("North", "P", 40), cell("South", "P", 60)];
        let req = VisualizationRequest::new("T")
            .with_chart_type(ChartType::Pie)
            .with_axes("X", "VALUE");
        let spec = PlotlySpecGenerator.generate(&req, &rows).unwrap();
        let trace = &spec.specification()["data"][0];
        assert_eq!(trace["type"], "pie");
        assert_eq!(trace["labels"], json!(["North", "South"]));
        assert_eq!(trace["values"], json!([40, 60]));
        assert_eq!(trace["hole"], 0.3);
        assert_eq!(spec.specification()["layout"]["title"], "VALUE by X");
    }

    #[test]
    fn unsupported_kinds_render_as_bar_but_keep_their_tag() {
        let req = VisualizationRequest::new("T")
            .with_chart_type(ChartType::Radar)
            .with_axes("X", "VALUE");
        let spec = PlotlySpecGenerator.generate(&req, &[cell("A", "P", 1)]).unwrap();
        assert_eq!(spec.chart_type(), &ChartType::Radar);
        assert_eq!(spec.specification()["data"][0]["type"], "bar");
    }
}

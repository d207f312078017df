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
    axis_fields, ensure_object_parameters, generate_title, heatmap_value_column, lookup,
    rows_to_json, SpecGenerator,
};
use crate::error::Result;
use crate::model::{ChartSpecification, ChartType, Framework, VisualizationRequest};
use quarry::Row;
use serde_json::{json, Value as Json};

pub const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

/// Single-view Vega-Lite v5 documents with inline data.
#[derive(Debug, Default, Clone, Copy)]
pub struct VegaLiteSpecGenerator;

impl SpecGenerator for VegaLiteSpecGenerator {
    fn framework(&self) -> Framework {
        Framework::VegaLite
    }

    fn generate(&self, request: &VisualizationRequest, rows: &[Row]) -> Result<ChartSpecification> {
        let chart_type = request.effective_chart_type();
        ensure_object_parameters(request, &chart_type)?;
        let (x, y) = axis_fields(request, rows);

        let (mark, encoding) = match chart_type {
            ChartType::Line => {
                let x_type = if rows
                    .first()
                    .and_then(|r| lookup(r, &x))
                    .is_some_and(quarry::Value::is_temporal)
                {
                    "temporal"
                } else {
                    "ordinal"
                };
                (
                    json!({ "type": "line", "point": true }),
                    json!({
                        "x": { "field": x, "type": x_type, "title": x },
                        "y": { "field": y, "type": "quantitative", "title": y },
                    }),
                )
            }
            ChartType::Scatter => {
                let mut encoding = json!({
                    "x": { "field": x, "type": "quantitative", "title": x },
                    "y": { "field": y, "type": "quantitative", "title": y },
                });
                if let Some(ref color) = request.color_column {
                    encoding["color"] = json!({ "field": color, "type": "nominal" });
                }
                if let Some(ref size) = request.size_column {
                    encoding["size"] = json!({ "field": size, "type": "quantitative" });
                }
                (json!("circle"), encoding)
            }
            ChartType::Pie => (
                json!({ "type": "arc", "innerRadius": 40 }),
                json!({
                    "theta": { "field": y, "type": "quantitative" },
                    "color": { "field": x, "type": "nominal" },
                }),
            ),
            ChartType::Heatmap => {
                let z = heatmap_value_column(request, rows);
                (
                    json!("rect"),
                    json!({
                        "x": { "field": x, "type": "ordinal", "title": x },
                        "y": { "field": y, "type": "ordinal", "title": y },
                        "color": { "field": z, "type": "quantitative", "title": z },
                    }),
                )
            }
            ChartType::Bar
            | ChartType::Area
            | ChartType::Combo
            | ChartType::ExecutiveDashboard
            | ChartType::GradientArea
            | ChartType::InteractiveHeatmap
            | ChartType::Candlestick
            | ChartType::Radar
            | ChartType::Sunburst
            | ChartType::Other(_) => (
                json!("bar"),
                json!({
                    "x": { "field": x, "type": "nominal", "title": x },
                    "y": { "field": y, "type": "quantitative", "title": y },
                }),
            ),
        };

        let spec = json!({
            "$schema": VEGA_LITE_SCHEMA,
            "description": generate_title(request),
            "title": generate_title(request),
            "data": { "values": rows_to_json(rows, &chart_type)? },
            "mark": mark,
            "encoding": encoding,
        });
        Ok(ChartSpecification::new(Framework::VegaLite, chart_type, spec))
    }
}

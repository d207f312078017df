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

//! Themed Vega-Lite charts for dashboards.
//!
//! Field names resolve in order: the request's axis roles, then
//! `parameters` (`xField`, `yField`, `colorField`, `lowField`, ...), then a
//! per-chart default. `parameters.theme` picks the palette and
//! `parameters.title` overrides the heading.

use super::theme::{self, PaletteCatalog, DEFAULT_PALETTE};
use super::vegalite::{VegaLiteSpecGenerator, VEGA_LITE_SCHEMA};
use super::{ensure_object_parameters, rows_to_json, SpecGenerator};
use crate::error::Result;
use crate::model::{ChartSpecification, ChartType, Framework, VisualizationRequest};
use quarry::Row;
use serde_json::{json, Value as Json};
use std::sync::Arc;
use tracing::debug;

pub struct ProfessionalChartGenerator {
    palettes: Arc<PaletteCatalog>,
    fallback: VegaLiteSpecGenerator,
}

impl ProfessionalChartGenerator {
    pub fn new(palettes: Arc<PaletteCatalog>) -> Self {
        Self {
            palettes,
            fallback: VegaLiteSpecGenerator,
        }
    }

    pub fn palettes(&self) -> &PaletteCatalog {
        &self.palettes
    }
}

fn field(request: &VisualizationRequest, role: Option<&String>, key: &str, default: &str) -> String {
    role.cloned()
        .or_else(|| request.parameter_str(key).map(str::to_string))
        .unwrap_or_else(|| default.to_string())
}

fn heading(request: &VisualizationRequest, default: &str) -> Json {
    theme::title(request.parameter_str("title").unwrap_or(default))
}

impl SpecGenerator for ProfessionalChartGenerator {
    fn framework(&self) -> Framework {
        Framework::VegaLite
    }

    fn generate(&self, request: &VisualizationRequest, rows: &[Row]) -> Result<ChartSpecification> {
        let chart_type = request.effective_chart_type();
        ensure_object_parameters(request, &chart_type)?;
        let default_theme = if chart_type == ChartType::Candlestick {
            "financial"
        } else {
            DEFAULT_PALETTE
        };
        let theme_name = request.parameter_str("theme").unwrap_or(default_theme);
        let palette = self.palettes.get(theme_name);
        debug!(chart_type = %chart_type, theme = %theme_name, "Rendering themed chart");

        let body = match chart_type {
            ChartType::ExecutiveDashboard => {
                let x = field(request, request.x_column.as_ref(), "xField", "branch_name");
                let y = field(request, request.y_column.as_ref(), "yField", "total_amount");
                json!({
                    "description": "Executive KPI dashboard",
                    "title": heading(request, "Executive Performance Dashboard"),
                    "mark": { "type": "bar", "cornerRadiusEnd": 4 },
                    "encoding": {
                        "x": { "field": x, "type": "nominal", "title": "Branch", "sort": "-y" },
                        "y": { "field": y, "type": "quantitative", "title": "Amount ($M)" },
                        "color": { "value": palette[1] },
                        "tooltip": [
                            { "field": x, "type": "nominal" },
                            { "field": y, "type": "quantitative", "format": ",.2f" },
                        ],
                    },
                    "width": 800,
                    "height": 400,
                })
            }
            ChartType::GradientArea => {
                let x = field(request, request.x_column.as_ref(), "xField", "month");
                let y = field(request, request.y_column.as_ref(), "yField", "avg_loan_amount");
                json!({
                    "description": "Gradient area chart for time series",
                    "title": heading(request, "Revenue Trend Analysis"),
                    "mark": {
                        "type": "area",
                        "interpolate": "monotone",
                        "fillOpacity": 0.8,
                        "line": { "color": palette[0] },
                        "color": {
                            "x1": 1, "y1": 1, "x2": 1, "y2": 0,
                            "gradient": "linear",
                            "stops": [
                                { "offset": 0, "color": palette[4] },
                                { "offset": 1, "color": palette[1] },
                            ],
                        },
                    },
                    "encoding": {
                        "x": { "field": x, "type": "temporal", "title": "Time Period" },
                        "y": { "field": y, "type": "quantitative", "title": "Revenue ($M)" },
                    },
                    "width": 700,
                    "height": 350,
                })
            }
            ChartType::InteractiveHeatmap => {
                let x = field(request, request.x_column.as_ref(), "xField", "risk_category");
                let y = field(request, request.y_column.as_ref(), "yField", "loan_type");
                let color = field(request, request.color_column.as_ref(), "colorField", "roi_percentage");
                json!({
                    "description": "Interactive risk-performance heatmap",
                    "title": heading(request, "Portfolio Risk-Return Matrix"),
                    "params": [{
                        "name": "highlight",
                        "select": { "type": "point", "on": "pointerover" },
                    }],
                    "mark": { "type": "rect", "stroke": "#ffffff", "strokeWidth": 2 },
                    "encoding": {
                        "x": { "field": x, "type": "ordinal", "title": "Risk Level" },
                        "y": { "field": y, "type": "ordinal", "title": "Loan Product" },
                        "color": {
                            "field": color,
                            "type": "quantitative",
                            "title": "ROI %",
                            "scale": { "scheme": "redyellowgreen", "reverse": false },
                        },
                        "opacity": {
                            "condition": { "param": "highlight", "value": 1 },
                            "value": 0.6,
                        },
                        "tooltip": [
                            { "field": x, "type": "ordinal" },
                            { "field": y, "type": "ordinal" },
                            { "field": color, "type": "quantitative" },
                        ],
                    },
                    "width": 400,
                    "height": 300,
                })
            }
            ChartType::Candlestick => {
                let x = field(request, request.x_column.as_ref(), "xField", "date");
                let low = field(request, None, "lowField", "low");
                let high = field(request, None, "highField", "high");
                let open = field(request, None, "openField", "open");
                let close = field(request, None, "closeField", "close");
                let rising = format!("datum[{}] < datum[{}]", json!(open), json!(close));
                json!({
                    "description": "Financial candlestick chart",
                    "title": heading(request, "Loan Rate Analysis - OHLC"),
                    "encoding": {
                        "x": { "field": x, "type": "temporal", "title": "Date" },
                        "color": {
                            "condition": { "test": rising, "value": "#22c55e" },
                            "value": "#ef4444",
                        },
                    },
                    "layer": [
                        {
                            "mark": "rule",
                            "encoding": {
                                "y": { "field": low, "type": "quantitative", "scale": { "zero": false } },
                                "y2": { "field": high },
                            },
                        },
                        {
                            "mark": { "type": "bar", "width": 8 },
                            "encoding": {
                                "y": { "field": open, "type": "quantitative" },
                                "y2": { "field": close },
                            },
                        },
                    ],
                    "width": 700,
                    "height": 300,
                })
            }
            ChartType::Bar
            | ChartType::Line
            | ChartType::Scatter
            | ChartType::Pie
            | ChartType::Heatmap
            | ChartType::Area
            | ChartType::Combo
            | ChartType::Radar
            | ChartType::Sunburst
            | ChartType::Other(_) => {
                let plain = self.fallback.generate(request, rows)?;
                let mut spec = plain.specification().clone();
                spec["config"] = theme::theme_config(palette);
                spec["title"] = heading(request, &super::generate_title(request));
                return Ok(ChartSpecification::new(Framework::VegaLite, chart_type, spec));
            }
        };

        let mut spec = json!({
            "$schema": VEGA_LITE_SCHEMA,
            "data": { "values": rows_to_json(rows, &chart_type)? },
            "config": theme::theme_config(palette),
        });
        if let (Some(target), Json::Object(parts)) = (spec.as_object_mut(), body) {
            target.extend(parts);
        }
        Ok(ChartSpecification::new(Framework::VegaLite, chart_type, spec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> ProfessionalChartGenerator {
        ProfessionalChartGenerator::new(Arc::new(PaletteCatalog::default()))
    }

    #[test]
    fn executive_dashboard_uses_catalog_defaults_and_theme() {
        let req = VisualizationRequest::new("LOANS")
            .with_chart_type(ChartType::ExecutiveDashboard)
            .with_parameters(json!({ "theme": "ocean", "title": "Q3 Branches" }));
        let spec = generator().generate(&req, &[]).unwrap();
        let doc = spec.specification();
        assert_eq!(doc["encoding"]["x"]["field"], "branch_name");
        assert_eq!(doc["encoding"]["y"]["field"], "total_amount");
        assert_eq!(doc["encoding"]["color"]["value"], "#0891b2");
        assert_eq!(doc["title"]["text"], "Q3 Branches");
        assert_eq!(doc["title"]["fontSize"], 18);
        assert_eq!(doc["config"]["axis"]["gridColor"], "#e2e8f0");
    }

    #[test]
    fn request_roles_override_parameter_fields() {
        let req = VisualizationRequest::new("LOANS")
            .with_chart_type(ChartType::InteractiveHeatmap)
            .with_axes("RISK_CATEGORY", "LOAN_TYPE")
            .with_parameters(json!({ "xField": "ignored", "colorField": "ROI_PERCENTAGE" }));
        let doc = generator().generate(&req, &[]).unwrap().specification().clone();
        assert_eq!(doc["encoding"]["x"]["field"], "RISK_CATEGORY");
        assert_eq!(doc["encoding"]["color"]["field"], "ROI_PERCENTAGE");
        assert_eq!(doc["mark"]["type"], "rect");
    }

    #[test]
    fn candlestick_defaults_to_financial_palette_and_ohlc_fields() {
        let req = VisualizationRequest::new("RATES").with_chart_type(ChartType::Candlestick);
        let doc = generator().generate(&req, &[]).unwrap().specification().clone();
        assert_eq!(doc["config"]["range"]["category"][0], "#134e4a");
        assert_eq!(doc["encoding"]["color"]["condition"]["test"], "datum[\"open\"] < datum[\"close\"]");
        assert_eq!(doc["layer"][0]["encoding"]["y2"]["field"], "high");
    }

    #[test]
    fn non_object_parameters_fail_generation() {
        let req = VisualizationRequest::new("LOANS")
            .with_chart_type(ChartType::GradientArea)
            .with_parameters(json!(["theme", "ocean"]));
        let err = generator().generate(&req, &[]).unwrap_err();
        assert_eq!(err.code(), "SPEC_GENERATION_FAILURE");
    }

    #[test]
    fn other_kinds_delegate_with_theme_config() {
        let req = VisualizationRequest::new("SALES")
            .with_chart_type(ChartType::Radar)
            .with_axes("REGION", "AMOUNT");
        let doc = generator().generate(&req, &[]).unwrap().specification().clone();
        assert_eq!(doc["mark"], "bar");
        assert_eq!(doc["title"]["text"], "AMOUNT by REGION");
        assert_eq!(doc["config"]["background"], "#f8fafc");
    }
}

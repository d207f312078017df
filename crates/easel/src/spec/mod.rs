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

//! Declarative chart specifications.
//!
//! Three generators share one seam: the minimal Plotly and Vega-Lite
//! generators cover the common chart kinds, and the professional generator
//! renders the themed dashboard kinds. [`GeneratorSet::select`] routes a
//! request to one of them.

pub mod plotly;
pub mod professional;
pub mod theme;
pub mod vegalite;

pub use plotly::PlotlySpecGenerator;
pub use professional::ProfessionalChartGenerator;
pub use theme::PaletteCatalog;
pub use vegalite::VegaLiteSpecGenerator;

use crate::error::{Result, VizError};
use crate::model::{ChartSpecification, ChartType, Framework, VisualizationRequest};
use indexmap::IndexMap;
use quarry::{Row, Value};
use std::sync::Arc;

pub trait SpecGenerator: Send + Sync {
    fn framework(&self) -> Framework;
    fn generate(&self, request: &VisualizationRequest, rows: &[Row]) -> Result<ChartSpecification>;
}

pub struct GeneratorSet {
    plotly: PlotlySpecGenerator,
    vega_lite: VegaLiteSpecGenerator,
    professional: ProfessionalChartGenerator,
}

impl GeneratorSet {
    pub fn new(palettes: Arc<PaletteCatalog>) -> Self {
        Self {
            plotly: PlotlySpecGenerator,
            vega_lite: VegaLiteSpecGenerator,
            professional: ProfessionalChartGenerator::new(palettes),
        }
    }

    /// Themed kinds always go to the professional generator; the rest follow the framework.
    pub fn select(&self, chart_type: &ChartType, framework: Framework) -> &dyn SpecGenerator {
        if chart_type.is_professional() {
            return &self.professional;
        }
        match framework {
            Framework::Plotly => &self.plotly,
            Framework::VegaLite => &self.vega_lite,
        }
    }
}

impl Default for GeneratorSet {
    fn default() -> Self {
        Self::new(Arc::new(PaletteCatalog::default()))
    }
}

/// Exact key first, then a case-insensitive match; Oracle reports upper-case labels.
pub fn lookup<'a>(row: &'a Row, column: &str) -> Option<&'a Value> {
    row.get(column).or_else(|| {
        row.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(column))
            .map(|(_, v)| v)
    })
}

/// Column-wise values with nulls skipped; without a column, the first value of each row.
pub fn extract_column(rows: &[Row], column: Option<&str>) -> Vec<serde_json::Value> {
    match column {
        Some(column) => rows
            .iter()
            .filter_map(|row| lookup(row, column))
            .map(Value::to_json)
            .collect(),
        None => rows
            .iter()
            .filter_map(|row| row.values().next())
            .map(Value::to_json)
            .collect(),
    }
}

/// "{y} by {x}", either half alone, or "Data from {table}".
pub fn generate_title(request: &VisualizationRequest) -> String {
    match (request.y_column.as_deref(), request.x_column.as_deref()) {
        (Some(y), Some(x)) => format!("{y} by {x}"),
        (Some(y), None) => y.to_string(),
        (None, Some(x)) => x.to_string(),
        (None, None) => format!("Data from {}", request.table_name),
    }
}

/// Column holding heatmap intensity.
pub fn heatmap_value_column(request: &VisualizationRequest, rows: &[Row]) -> String {
    if let Some(ref color) = request.color_column {
        return color.clone();
    }
    if rows.iter().any(|row| lookup(row, "VALUE").is_some()) {
        return "VALUE".to_string();
    }
    let is_axis = |name: &str| {
        [request.x_column.as_deref(), request.y_column.as_deref()]
            .into_iter()
            .flatten()
            .any(|axis| axis.eq_ignore_ascii_case(name))
    };
    rows.first()
        .and_then(|row| {
            row.iter()
                .find(|(name, value)| value.is_numeric() && !is_axis(name))
                .map(|(name, _)| name.clone())
        })
        .unwrap_or_else(|| "VALUE".to_string())
}

/// Axis fields, falling back to the first and second column of the first row.
pub(crate) fn axis_fields(request: &VisualizationRequest, rows: &[Row]) -> (String, String) {
    let mut names = rows
        .first()
        .map(|r| r.keys().cloned().collect::<Vec<_>>())
        .unwrap_or_default()
        .into_iter();
    let first = names.next();
    let second = names.next();
    let x = request
        .x_column
        .clone()
        .or_else(|| first.clone())
        .unwrap_or_else(|| "x".to_string());
    let y = request
        .y_column
        .clone()
        .or(second)
        .or(first)
        .unwrap_or_else(|| "y".to_string());
    (x, y)
}

pub(crate) fn ensure_object_parameters(request: &VisualizationRequest, chart_type: &ChartType) -> Result<()> {
    match request.parameters {
        None | Some(serde_json::Value::Object(_)) | Some(serde_json::Value::Null) => Ok(()),
        Some(ref other) => Err(VizError::spec_generation(
            chart_type.as_str(),
            format!("parameters must be a JSON object, got {other}"),
        )),
    }
}

pub(crate) fn rows_to_json(rows: &[Row], chart_type: &ChartType) -> Result<serde_json::Value> {
    serde_json::to_value(rows).map_err(|e| VizError::spec_generation(chart_type.as_str(), e.to_string()))
}

/// Distinct labels in order of first appearance, keyed by display form.
pub(crate) fn distinct_labels(rows: &[Row], column: &str) -> IndexMap<String, serde_json::Value> {
    let mut labels = IndexMap::new();
    for value in rows.iter().filter_map(|row| lookup(row, column)) {
        labels.entry(value.to_string()).or_insert_with(|| value.to_json());
    }
    labels
}

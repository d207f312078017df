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

use crate::optimizer::OptimizationMetrics;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use quarry::Row;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChartType {
    Bar,
    Line,
    Scatter,
    Pie,
    Heatmap,
    Area,
    Combo,
    ExecutiveDashboard,
    GradientArea,
    InteractiveHeatmap,
    Candlestick,
    Radar,
    Sunburst,
    Other(String),
}

impl ChartType {
    /// Case-insensitive; hyphens read as underscores. Blank tags are absent.
    pub fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim().to_ascii_lowercase().replace('-', "_");
        let parsed = match tag.as_str() {
            "" => return None,
            "bar" => Self::Bar,
            "line" => Self::Line,
            "scatter" => Self::Scatter,
            "pie" => Self::Pie,
            "heatmap" => Self::Heatmap,
            "area" => Self::Area,
            "combo" => Self::Combo,
            "executive_dashboard" => Self::ExecutiveDashboard,
            "gradient_area" => Self::GradientArea,
            "interactive_heatmap" => Self::InteractiveHeatmap,
            "candlestick" => Self::Candlestick,
            "radar" => Self::Radar,
            "sunburst" => Self::Sunburst,
            _ => Self::Other(tag),
        };
        Some(parsed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Scatter => "scatter",
            Self::Pie => "pie",
            Self::Heatmap => "heatmap",
            Self::Area => "area",
            Self::Combo => "combo",
            Self::ExecutiveDashboard => "executive_dashboard",
            Self::GradientArea => "gradient_area",
            Self::InteractiveHeatmap => "interactive_heatmap",
            Self::Candlestick => "candlestick",
            Self::Radar => "radar",
            Self::Sunburst => "sunburst",
            Self::Other(tag) => tag,
        }
    }

    /// Kinds rendered by the themed generator regardless of framework.
    pub const fn is_professional(&self) -> bool {
        matches!(
            self,
            Self::ExecutiveDashboard | Self::GradientArea | Self::InteractiveHeatmap | Self::Candlestick
        )
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ChartType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ChartType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).ok_or_else(|| de::Error::custom("chart type tag is blank"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Framework {
    #[default]
    Plotly,
    VegaLite,
}

impl Framework {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "plotly" => Some(Self::Plotly),
            "vega-lite" | "vegalite" | "vega_lite" | "vega" => Some(Self::VegaLite),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Plotly => "plotly",
            Self::VegaLite => "vega-lite",
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Framework {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Framework {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).ok_or_else(|| de::Error::custom(format!("unknown framework '{raw}'")))
    }
}

fn optional_chart_type<'de, D: Deserializer<'de>>(d: D) -> Result<Option<ChartType>, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.as_deref().and_then(ChartType::parse))
}

fn optional_framework<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Framework>, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.as_deref().and_then(|tag| {
        let parsed = Framework::parse(tag);
        if parsed.is_none() && !tag.trim().is_empty() {
            warn!(framework = %tag, "Unknown framework requested; using configured default");
        }
        parsed
    }))
}

fn blank_as_none<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationRequest {
    pub table_name: String,
    #[serde(default, deserialize_with = "optional_chart_type", skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<ChartType>,
    #[serde(default, deserialize_with = "optional_framework", skip_serializing_if = "Option::is_none")]
    pub framework: Option<Framework>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub x_column: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub y_column: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub color_column: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub size_column: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub aggregation_type: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

impl VisualizationRequest {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Default::default()
        }
    }

    pub fn with_chart_type(mut self, chart_type: ChartType) -> Self {
        self.chart_type = Some(chart_type);
        self
    }

    pub fn with_framework(mut self, framework: Framework) -> Self {
        self.framework = Some(framework);
        self
    }

    pub fn with_axes(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.x_column = Some(x.into());
        self.y_column = Some(y.into());
        self
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Bar when no tag was given.
    pub fn effective_chart_type(&self) -> ChartType {
        self.chart_type.clone().unwrap_or(ChartType::Bar)
    }

    pub fn parameter(&self, key: &str) -> Option<&serde_json::Value> {
        self.parameters.as_ref().and_then(|p| p.get(key))
    }

    pub fn parameter_str(&self, key: &str) -> Option<&str> {
        self.parameter(key).and_then(serde_json::Value::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Temporal,
    Categorical,
}

impl ColumnKind {
    /// Substring match on the upper-cased declared type; unknown types are categorical.
    pub fn from_declared_type(data_type: &str) -> Self {
        let upper = data_type.to_ascii_uppercase();
        if ["NUMBER", "DECIMAL", "FLOAT", "INTEGER"]
            .iter()
            .any(|t| upper.contains(t))
        {
            Self::Numeric
        } else if upper.contains("DATE") || upper.contains("TIMESTAMP") {
            Self::Temporal
        } else {
            Self::Categorical
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStatistics {
    pub average: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    #[serde(rename = "rowCount")]
    pub row_count: usize,
    #[serde(flatten)]
    pub columns: IndexMap<String, ColumnStatistics>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataAnalysis {
    pub table_name: String,
    pub data: Vec<Row>,
    pub column_types: IndexMap<String, String>,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub date_columns: Vec<String>,
    pub statistics: Statistics,
    pub suggested_chart_types: Vec<ChartType>,
}

impl DataAnalysis {
    pub fn kind_of(&self, column: &str) -> Option<ColumnKind> {
        let has = |list: &[String]| list.iter().any(|c| c.eq_ignore_ascii_case(column));
        if has(&self.numeric_columns) {
            Some(ColumnKind::Numeric)
        } else if has(&self.date_columns) {
            Some(ColumnKind::Temporal)
        } else if has(&self.categorical_columns) {
            Some(ColumnKind::Categorical)
        } else {
            None
        }
    }

    pub fn first_column(&self) -> Option<&str> {
        self.column_types.keys().next().map(String::as_str)
    }

    /// Preferred x axis: categorical, then temporal, then numeric, then whatever comes first.
    pub fn best_x_column(&self) -> Option<String> {
        self.categorical_columns
            .first()
            .or_else(|| self.date_columns.first())
            .or_else(|| self.numeric_columns.first())
            .cloned()
            .or_else(|| self.first_column().map(str::to_string))
    }

    pub fn best_y_column(&self) -> Option<String> {
        self.numeric_columns
            .first()
            .or_else(|| self.categorical_columns.first())
            .cloned()
            .or_else(|| self.first_column().map(str::to_string))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    pub row_count: usize,
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub framework: Framework,
    pub chart_type: ChartType,
    pub fetched_rows: usize,
    pub width: u32,
    pub height: u32,
    pub responsive: bool,
    pub animation: bool,
    pub optimization: OptimizationMetrics,
}

/// A rendered chart. Immutable once built; metadata is attached by consuming the value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpecification {
    framework: Framework,
    chart_type: ChartType,
    specification: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<ChartMetadata>,
}

impl ChartSpecification {
    pub fn new(framework: Framework, chart_type: ChartType, specification: serde_json::Value) -> Self {
        Self {
            framework,
            chart_type,
            specification,
            metadata: None,
        }
    }

    #[must_use]
    pub fn with_metadata(self, metadata: ChartMetadata) -> Self {
        Self {
            metadata: Some(metadata),
            ..self
        }
    }

    pub const fn framework(&self) -> Framework {
        self.framework
    }

    pub const fn chart_type(&self) -> &ChartType {
        &self.chart_type
    }

    pub const fn specification(&self) -> &serde_json::Value {
        &self.specification
    }

    pub const fn metadata(&self) -> Option<&ChartMetadata> {
        self.metadata.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_type_tags_parse_case_insensitively() {
        assert_eq!(ChartType::parse(" BAR "), Some(ChartType::Bar));
        assert_eq!(ChartType::parse("Gradient-Area"), Some(ChartType::GradientArea));
        assert_eq!(ChartType::parse("   "), None);
        assert_eq!(ChartType::parse("Bubble"), Some(ChartType::Other("bubble".into())));
    }

    #[test]
    fn request_deserializes_blank_and_unknown_tags_as_absent() {
        let req: VisualizationRequest = serde_json::from_value(serde_json::json!({
            "tableName": "SALES",
            "chartType": "",
            "framework": "d3",
            "xColumn": " ",
            "yColumn": "AMOUNT",
            "limit": 10
        }))
        .unwrap();
        assert_eq!(req.chart_type, None);
        assert_eq!(req.framework, None);
        assert_eq!(req.x_column, None);
        assert_eq!(req.y_column.as_deref(), Some("AMOUNT"));
        assert_eq!(req.limit, Some(10));
    }

    #[test]
    fn framework_aliases() {
        assert_eq!(Framework::parse("VegaLite"), Some(Framework::VegaLite));
        assert_eq!(Framework::parse("vega"), Some(Framework::VegaLite));
        assert_eq!(serde_json::to_value(Framework::VegaLite).unwrap(), "vega-lite");
    }

    fn analysis(columns: &[(&str, ColumnKind)]) -> DataAnalysis {
        let pick = |kind: ColumnKind| {
            columns
                .iter()
                .filter(|(_, k)| *k == kind)
                .map(|(name, _)| name.to_string())
                .collect::<Vec<_>>()
        };
        DataAnalysis {
            table_name: "T".to_string(),
            data: Vec::new(),
            column_types: columns
                .iter()
                .map(|(name, _)| (name.to_string(), "VARCHAR2".to_string()))
                .collect(),
            numeric_columns: pick(ColumnKind::Numeric),
            categorical_columns: pick(ColumnKind::Categorical),
            date_columns: pick(ColumnKind::Temporal),
            statistics: Statistics::default(),
            suggested_chart_types: Vec::new(),
        }
    }

    #[test]
    fn x_axis_prefers_categorical_then_temporal_then_numeric() {
        let mixed = analysis(&[
            ("AMOUNT", ColumnKind::Numeric),
            ("SALE_DATE", ColumnKind::Temporal),
            ("REGION", ColumnKind::Categorical),
        ]);
        assert_eq!(mixed.best_x_column().as_deref(), Some("REGION"));
        assert_eq!(mixed.best_y_column().as_deref(), Some("AMOUNT"));

        let dated = analysis(&[("AMOUNT", ColumnKind::Numeric), ("SALE_DATE", ColumnKind::Temporal)]);
        assert_eq!(dated.best_x_column().as_deref(), Some("SALE_DATE"));

        let numeric = analysis(&[("AMOUNT", ColumnKind::Numeric)]);
        assert_eq!(numeric.best_x_column().as_deref(), Some("AMOUNT"));
    }

    #[test]
    fn declared_types_classify_by_substring() {
        assert_eq!(ColumnKind::from_declared_type("number(10,2)"), ColumnKind::Numeric);
        assert_eq!(ColumnKind::from_declared_type("BINARY_FLOAT"), ColumnKind::Numeric);
        assert_eq!(ColumnKind::from_declared_type("TIMESTAMP(6)"), ColumnKind::Temporal);
        assert_eq!(ColumnKind::from_declared_type("CLOB"), ColumnKind::Categorical);
    }
}

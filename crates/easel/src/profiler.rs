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

//! Column semantics and sample statistics for an arbitrary table.

use crate::cache::ResultCache;
use crate::error::{Result, VizError};
use crate::model::{ChartType, ColumnKind, ColumnStatistics, DataAnalysis, Statistics};
use crate::policy::TableAccessPolicy;
use indexmap::IndexMap;
use quarry::{sparse, ColumnMeta, DataSource, Row, Sanitizer, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct SchemaProfiler {
    source: Arc<dyn DataSource>,
    sanitizer: Sanitizer,
    policy: Arc<TableAccessPolicy>,
    cache: Arc<dyn ResultCache<DataAnalysis>>,
    sample_size: usize,
}

impl SchemaProfiler {
    pub fn new(
        source: Arc<dyn DataSource>,
        sanitizer: Sanitizer,
        policy: Arc<TableAccessPolicy>,
        cache: Arc<dyn ResultCache<DataAnalysis>>,
        sample_size: usize,
    ) -> Self {
        Self {
            source,
            sanitizer,
            policy,
            cache,
            sample_size,
        }
    }

    pub async fn analyze(&self, table: &str) -> Result<DataAnalysis> {
        let table = self.sanitizer.table_name(table)?;
        self.policy.check(&table)?;
        if let Some(hit) = self.cache.get(&table).await {
            debug!(table = %table, "Analysis served from cache");
            return Ok(hit);
        }

        info!(table = %table, "Analyzing table structure");
        let columns = self.resolve_columns(&table).await?;
        let sample = self.sample(&table).await;
        let analysis = build_analysis(&table, &columns, sample);
        self.cache.insert(table, analysis.clone()).await;
        Ok(analysis)
    }

    async fn resolve_columns(&self, table: &str) -> Result<Vec<ColumnMeta>> {
        let (owner, name) = split_owner(table);
        match self.source.columns(owner, name).await {
            Ok(columns) if !columns.is_empty() => return Ok(columns),
            Ok(_) => warn!(table = %table, "Catalog returned no columns; inferring from a sample row"),
            Err(e) => warn!(table = %table, error = %e, "Catalog lookup failed; inferring from a sample row"),
        }

        let sql = format!("SELECT * FROM {table} FETCH FIRST 1 ROWS ONLY");
        let rows = self.source.query(&sql, &[]).await.map_err(|e| VizError::Analysis {
            table: table.to_string(),
            reason: e.to_string(),
        })?;
        let columns = rows
            .first()
            .map(|row| {
                row.iter()
                    .map(|(name, value)| ColumnMeta::new(name.clone(), inferred_type(value.as_ref())))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        if columns.is_empty() {
            return Err(VizError::Analysis {
                table: table.to_string(),
                reason: "no columns could be determined".to_string(),
            });
        }
        Ok(columns)
    }

    async fn sample(&self, table: &str) -> Vec<Row> {
        let sql = format!("SELECT * FROM {table} FETCH FIRST {} ROWS ONLY", self.sample_size);
        match self.source.query(&sql, &[]).await {
            Ok(rows) => rows.into_iter().map(sparse).collect(),
            Err(e) => {
                warn!(table = %table, error = %e, "Sample query failed; statistics will be empty");
                Vec::new()
            }
        }
    }
}

fn split_owner(table: &str) -> (Option<&str>, &str) {
    match table.split_once('.') {
        Some((owner, name)) => (Some(owner), name),
        None => (None, table),
    }
}

fn inferred_type(value: Option<&Value>) -> &'static str {
    match value {
        Some(v) if v.is_numeric() => "NUMBER",
        Some(v) if v.is_temporal() => "DATE",
        _ => "VARCHAR2",
    }
}

pub fn build_analysis(table: &str, columns: &[ColumnMeta], sample: Vec<Row>) -> DataAnalysis {
    let mut column_types = IndexMap::new();
    let mut numeric = Vec::new();
    let mut categorical = Vec::new();
    let mut dates = Vec::new();
    for column in columns {
        column_types.insert(column.name.clone(), column.data_type.clone());
        match ColumnKind::from_declared_type(&column.data_type) {
            ColumnKind::Numeric => numeric.push(column.name.clone()),
            ColumnKind::Temporal => dates.push(column.name.clone()),
            ColumnKind::Categorical => categorical.push(column.name.clone()),
        }
    }
    let statistics = statistics(&sample, &numeric);
    let suggested = suggest_chart_types(numeric.len(), categorical.len(), dates.len());
    DataAnalysis {
        table_name: table.to_string(),
        data: sample,
        column_types,
        numeric_columns: numeric,
        categorical_columns: categorical,
        date_columns: dates,
        statistics,
        suggested_chart_types: suggested,
    }
}

/// Average/min/max per numeric column over the sample only.
pub fn statistics(sample: &[Row], numeric_columns: &[String]) -> Statistics {
    let mut columns = IndexMap::new();
    for column in numeric_columns {
        let values: Vec<f64> = sample
            .iter()
            .filter_map(|row| row.get(column))
            .filter_map(Value::to_f64_lenient)
            .collect();
        if values.is_empty() {
            continue;
        }
        let sum: f64 = values.iter().sum();
        columns.insert(
            column.clone(),
            ColumnStatistics {
                average: sum / values.len() as f64,
                min: values.iter().copied().fold(f64::INFINITY, f64::min),
                max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            },
        );
    }
    Statistics {
        row_count: sample.len(),
        columns,
    }
}

pub fn suggest_chart_types(numeric: usize, categorical: usize, temporal: usize) -> Vec<ChartType> {
    let mut out = Vec::new();
    if categorical > 0 && numeric > 0 {
        out.extend([ChartType::Bar, ChartType::Pie]);
    }
    if numeric >= 2 {
        out.push(ChartType::Scatter);
    }
    if temporal > 0 && numeric > 0 {
        out.extend([ChartType::Line, ChartType::Area]);
    }
    if categorical >= 2 {
        out.push(ChartType::Heatmap);
    }
    if out.is_empty() {
        out.push(ChartType::Bar);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestion_rules_fire_in_order() {
        assert_eq!(
            suggest_chart_types(1, 1, 1),
            vec![ChartType::Bar, ChartType::Pie, ChartType::Line, ChartType::Area]
        );
        assert_eq!(
            suggest_chart_types(2, 2, 0),
            vec![ChartType::Bar, ChartType::Pie, ChartType::Scatter, ChartType::Heatmap]
        );
        assert_eq!(suggest_chart_types(0, 1, 1), vec![ChartType::Bar]);
    }

    #[test]
    fn statistics_parse_numeric_text_and_skip_empty_columns() {
        let mut a = Row::new();
        a.insert("AMOUNT".into(), Value::from(10));
        a.insert("RATE".into(), Value::from("n/a"));
        let mut b = Row::new();
        b.insert("AMOUNT".into(), Value::from("30"));
        let stats = statistics(&[a, b], &["AMOUNT".into(), "RATE".into()]);
        assert_eq!(stats.row_count, 2);
        let amount = &stats.columns["AMOUNT"];
        assert_eq!((amount.average, amount.min, amount.max), (20.0, 10.0, 30.0));
        assert!(!stats.columns.contains_key("RATE"));
    }
}

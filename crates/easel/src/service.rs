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

//! Pipeline orchestration: profile, query, reduce, render.

use crate::cache::{build_cache, fingerprint, ResultCache};
use crate::config::EaselConfig;
use crate::error::{ConfigError, Result};
use crate::model::{
    ChartMetadata, ChartSpecification, ChartType, ColumnKind, DataAnalysis, Framework,
    VisualizationRequest,
};
use crate::optimizer::{DataOptimizer, OptimizeOptions};
use crate::policy::TableAccessPolicy;
use crate::profiler::SchemaProfiler;
use crate::query_builder::{BuiltQuery, QueryBuilder};
use crate::spec::{GeneratorSet, PaletteCatalog};
use chrono::Utc;
use quarry::{DataSource, Row, Sanitizer};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Entry point for every visualization operation. Cheap to share behind an `Arc`.
pub struct VisualizationService {
    config: EaselConfig,
    sanitizer: Sanitizer,
    policy: Arc<TableAccessPolicy>,
    profiler: SchemaProfiler,
    query_builder: QueryBuilder,
    optimizer: DataOptimizer,
    generators: GeneratorSet,
    spec_cache: Arc<dyn ResultCache<ChartSpecification>>,
}

impl VisualizationService {
    pub fn new(source: Arc<dyn DataSource>, config: EaselConfig) -> std::result::Result<Self, ConfigError> {
        let sanitizer = Sanitizer::new(config.security.sanitize_mode);
        let policy = Arc::new(TableAccessPolicy::from_settings(&config.security)?);
        let analysis_cache = build_cache::<DataAnalysis>(
            config.cache.enabled,
            config.cache.analysis_ttl_secs,
            config.cache.max_capacity,
        );
        let spec_cache = build_cache::<ChartSpecification>(
            config.cache.enabled,
            config.cache.spec_ttl_secs,
            config.cache.max_capacity,
        );
        let profiler = SchemaProfiler::new(
            Arc::clone(&source),
            sanitizer,
            Arc::clone(&policy),
            analysis_cache,
            config.visualization.sample_size,
        );
        let query_builder = QueryBuilder::new(source, sanitizer, config.visualization.default_limit);
        let optimizer = DataOptimizer::new(config.optimizer.clone());

        info!(
            sanitize_mode = ?config.security.sanitize_mode,
            cache_enabled = config.cache.enabled,
            max_data_points = config.visualization.max_data_points,
            "Visualization service ready"
        );
        Ok(Self {
            config,
            sanitizer,
            policy,
            profiler,
            query_builder,
            optimizer,
            generators: GeneratorSet::new(Arc::new(PaletteCatalog::default())),
            spec_cache,
        })
    }

    pub fn config(&self) -> &EaselConfig {
        &self.config
    }

    pub async fn generate_visualization(&self, request: VisualizationRequest) -> Result<ChartSpecification> {
        let table = self.sanitizer.table_name(&request.table_name)?;
        self.policy.check(&table)?;

        let key = fingerprint(&request);
        if let Some(hit) = self.spec_cache.get(&key).await {
            debug!(table = %table, "Chart served from cache");
            return Ok(hit);
        }

        let mut request = request;
        let needs_axes = request.columns.is_empty()
            || request.x_column.is_none()
            || request.y_column.is_none();
        if self.config.visualization.auto_detect_columns && needs_axes {
            let analysis = self.profiler.analyze(&table).await?;
            self.fill_axes(&mut request, &analysis);
        }
        self.cap_limit(&mut request);

        let rows = self.query_builder.fetch_data(&request).await?;
        let fetched = rows.len();
        let chart_type = request.effective_chart_type();

        let options = OptimizeOptions {
            magnitude_field: request.parameter_str("magnitudeField").map(str::to_string),
        };
        let started = Instant::now();
        let rows = self.optimizer.optimize(rows, &chart_type, &options);
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let optimization = self.optimizer.metrics(&chart_type, fetched, rows.len(), elapsed_ms);

        let framework = request
            .framework
            .unwrap_or(self.config.visualization.default_framework);
        let spec = self
            .generators
            .select(&chart_type, framework)
            .generate(&request, &rows)?;

        let chart = &self.config.chart;
        let metadata = ChartMetadata {
            row_count: rows.len(),
            generated_at: Utc::now(),
            source: table.clone(),
            framework: spec.framework(),
            chart_type: chart_type.clone(),
            fetched_rows: fetched,
            width: chart.width,
            height: chart.height,
            responsive: chart.responsive,
            animation: chart.animation,
            optimization,
        };
        let spec = spec.with_metadata(metadata);
        info!(
            table = %table,
            chart_type = %chart_type,
            framework = %spec.framework().as_str(),
            fetched,
            rendered = rows.len(),
            "Generated visualization"
        );

        self.spec_cache.insert(key, spec.clone()).await;
        Ok(spec)
    }

    /// Profiles the table, fills the missing axes and infers a chart type from them.
    pub async fn generate_smart_visualization(
        &self,
        table: &str,
        x_column: Option<String>,
        y_column: Option<String>,
        framework: Option<Framework>,
    ) -> Result<ChartSpecification> {
        let analysis = self.profiler.analyze(table).await?;
        let mut request = VisualizationRequest::new(table);
        request.x_column = x_column;
        request.y_column = y_column;
        request.framework = Some(framework.unwrap_or(self.config.visualization.default_framework));
        self.fill_axes(&mut request, &analysis);
        request.chart_type = Some(infer_chart_type(
            &analysis,
            request.x_column.as_deref(),
            request.y_column.as_deref(),
        ));
        request.limit = i64::try_from(self.config.visualization.max_data_points).ok();
        self.generate_visualization(request).await
    }

    pub async fn analyze_table(&self, table: &str) -> Result<DataAnalysis> {
        self.profiler.analyze(table).await
    }

    pub async fn fetch_data(&self, request: &VisualizationRequest) -> Result<Vec<Row>> {
        let table = self.sanitizer.table_name(&request.table_name)?;
        self.policy.check(&table)?;
        self.query_builder.fetch_data(request).await
    }

    pub fn build_query(&self, request: &VisualizationRequest) -> Result<BuiltQuery> {
        self.query_builder.build_query(request)
    }

    fn fill_axes(&self, request: &mut VisualizationRequest, analysis: &DataAnalysis) {
        if request.x_column.is_none() {
            request.x_column = analysis.best_x_column();
        }
        if request.y_column.is_none() {
            request.y_column = analysis.best_y_column();
        }
        debug!(
            x = ?request.x_column,
            y = ?request.y_column,
            "Resolved axis columns from analysis"
        );
    }

    fn cap_limit(&self, request: &mut VisualizationRequest) {
        let cap = self.config.visualization.max_data_points;
        let over = match request.limit {
            None => true,
            Some(limit) => usize::try_from(limit).is_ok_and(|l| l > cap),
        };
        if over {
            request.limit = i64::try_from(cap).ok();
            warn!(table = %request.table_name, cap, "Data limited to the maximum point count");
        }
    }
}

/// Chart kind suited to an x/y pair.
pub fn infer_chart_type(analysis: &DataAnalysis, x: Option<&str>, y: Option<&str>) -> ChartType {
    let kind = |c: Option<&str>| c.and_then(|c| analysis.kind_of(c));
    match (kind(x), kind(y)) {
        (Some(ColumnKind::Temporal), Some(ColumnKind::Numeric)) => ChartType::Line,
        (Some(ColumnKind::Numeric), Some(ColumnKind::Numeric)) => ChartType::Scatter,
        _ => ChartType::Bar,
    }
}

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

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod optimizer;
pub mod policy;
pub mod profiler;
pub mod query_builder;
pub mod service;
pub mod spec;

pub use cache::{build_cache, fingerprint, DisabledCache, MokaCache, ResultCache};
pub use config::{
    CacheSettings, ChartSettings, EaselConfig, OptimizerSettings, SamplingStrategy,
    SecuritySettings, VisualizationSettings,
};
pub use error::{ConfigError, Result, VizError};
pub use model::{
    ChartMetadata, ChartSpecification, ChartType, ColumnKind, ColumnStatistics, DataAnalysis,
    Framework, Statistics, VisualizationRequest,
};
pub use optimizer::{DataOptimizer, OptimizationMetrics, OptimizeOptions, PerformanceGain};
pub use policy::TableAccessPolicy;
pub use profiler::SchemaProfiler;
pub use query_builder::{BuiltQuery, QueryBuilder};
pub use service::{infer_chart_type, VisualizationService};
pub use spec::{
    GeneratorSet, PaletteCatalog, PlotlySpecGenerator, ProfessionalChartGenerator, SpecGenerator,
    VegaLiteSpecGenerator,
};

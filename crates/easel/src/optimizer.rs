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

//! Chart-aware row reduction.
//!
//! Every chart type has a point budget; inputs within budget pass through
//! untouched. Over budget, time series keep their endpoints, heatmaps
//! truncate, ranked dashboards keep the largest magnitudes and everything
//! else is sampled uniformly.

use crate::config::{OptimizerSettings, SamplingStrategy};
use crate::error::OptimizationError;
use crate::model::ChartType;
use crate::spec::lookup;
use quarry::Row;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, info, warn};

/// Per-request knobs. `magnitude_field` overrides the configured ranking field.
#[derive(Debug, Clone, Default)]
pub struct OptimizeOptions {
    pub magnitude_field: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PerformanceGain {
    Excellent,
    #[serde(rename = "Very Good")]
    VeryGood,
    Good,
    Moderate,
    Minimal,
}

impl PerformanceGain {
    pub fn from_reduction(fraction: f64) -> Self {
        if fraction > 0.8 {
            Self::Excellent
        } else if fraction > 0.6 {
            Self::VeryGood
        } else if fraction > 0.4 {
            Self::Good
        } else if fraction > 0.2 {
            Self::Moderate
        } else {
            Self::Minimal
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationMetrics {
    pub chart_type: ChartType,
    pub original_data_points: usize,
    pub optimized_data_points: usize,
    /// Percent of rows removed, two decimals.
    pub reduction_ratio: f64,
    /// Percent of rows kept, two decimals.
    pub compression_ratio: f64,
    pub processing_time_ms: u64,
    pub performance_gain: PerformanceGain,
}

#[derive(Debug, Clone, Default)]
pub struct DataOptimizer {
    settings: OptimizerSettings,
}

impl DataOptimizer {
    pub fn new(settings: OptimizerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &OptimizerSettings {
        &self.settings
    }

    pub fn threshold(&self, chart_type: &ChartType) -> usize {
        self.settings.threshold(chart_type)
    }

    /// Never fails: on any internal error the input comes back unchanged.
    pub fn optimize(&self, rows: Vec<Row>, chart_type: &ChartType, options: &OptimizeOptions) -> Vec<Row> {
        let threshold = self.threshold(chart_type);
        if rows.len() <= threshold {
            debug!(chart_type = %chart_type, rows = rows.len(), threshold, "Within budget; no reduction");
            return rows;
        }
        match self.reduce(&rows, chart_type, threshold, options) {
            Ok(reduced) => {
                info!(
                    chart_type = %chart_type,
                    original = rows.len(),
                    optimized = reduced.len(),
                    "Reduced data for rendering"
                );
                reduced
            }
            Err(e) => {
                warn!(chart_type = %chart_type, error = %e, "Optimization failed; returning original rows");
                rows
            }
        }
    }

    fn reduce(
        &self,
        rows: &[Row],
        chart_type: &ChartType,
        threshold: usize,
        options: &OptimizeOptions,
    ) -> Result<Vec<Row>, OptimizationError> {
        if threshold == 0 {
            return Err(OptimizationError::ZeroThreshold {
                chart_type: chart_type.to_string(),
            });
        }
        match chart_type {
            ChartType::GradientArea | ChartType::Candlestick => Ok(stride_sample(rows, threshold)),
            ChartType::Heatmap | ChartType::InteractiveHeatmap => Ok(rows[..threshold].to_vec()),
            ChartType::ExecutiveDashboard => {
                let field = options
                    .magnitude_field
                    .as_deref()
                    .unwrap_or(&self.settings.magnitude_field);
                top_by_magnitude(rows, field, threshold)
            }
            ChartType::Bar
            | ChartType::Line
            | ChartType::Scatter
            | ChartType::Pie
            | ChartType::Area
            | ChartType::Combo
            | ChartType::Radar
            | ChartType::Sunburst
            | ChartType::Other(_) => Ok(match self.settings.generic_sampling {
                SamplingStrategy::Reservoir => reservoir_sample(rows, threshold, self.settings.seed),
                SamplingStrategy::Bernoulli => bernoulli_sample(rows, threshold, self.settings.seed),
            }),
        }
    }

    pub fn metrics(
        &self,
        chart_type: &ChartType,
        original: usize,
        optimized: usize,
        elapsed_ms: u64,
    ) -> OptimizationMetrics {
        let (reduction, compression) = if original == 0 {
            (0.0, 0.0)
        } else {
            let original_f = original as f64;
            (
                original.saturating_sub(optimized) as f64 / original_f,
                optimized as f64 / original_f,
            )
        };
        OptimizationMetrics {
            chart_type: chart_type.clone(),
            original_data_points: original,
            optimized_data_points: optimized,
            reduction_ratio: percent(reduction),
            compression_ratio: percent(compression),
            processing_time_ms: elapsed_ms,
            performance_gain: PerformanceGain::from_reduction(reduction),
        }
    }
}

fn percent(fraction: f64) -> f64 {
    (fraction * 10_000.0).round() / 100.0
}

/// First row, every `step`-th row strictly before the final stride, then the last row.
pub fn stride_sample(rows: &[Row], threshold: usize) -> Vec<Row> {
    let n = rows.len();
    if n == 0 {
        return Vec::new();
    }
    let step = (n / threshold.max(1)).max(1);
    let mut out = Vec::with_capacity(threshold + 2);
    out.push(rows[0].clone());
    let mut i = step;
    while i < n.saturating_sub(step) {
        out.push(rows[i].clone());
        i += step;
    }
    if n > 1 {
        out.push(rows[n - 1].clone());
    }
    out
}

fn magnitude(row: &Row, field: &str) -> Result<f64, OptimizationError> {
    match lookup(row, field) {
        None => Ok(0.0),
        Some(v) => v.to_f64_lenient().ok_or_else(|| OptimizationError::NonNumericMagnitude {
            field: field.to_string(),
            value: v.to_string(),
        }),
    }
}

/// Stable descending sort on `field`; missing values count as zero.
fn top_by_magnitude(rows: &[Row], field: &str, threshold: usize) -> Result<Vec<Row>, OptimizationError> {
    let mut keyed = rows
        .iter()
        .map(|row| magnitude(row, field).map(|m| (m, row)))
        .collect::<Result<Vec<_>, _>>()?;
    keyed.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    Ok(keyed
        .into_iter()
        .take(threshold)
        .map(|(_, row)| row.clone())
        .collect())
}

/// Algorithm R over row indices; the kept rows stay in input order.
pub fn reservoir_sample(rows: &[Row], k: usize, seed: u64) -> Vec<Row> {
    if rows.len() <= k {
        return rows.to_vec();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut reservoir: Vec<usize> = (0..k).collect();
    for i in k..rows.len() {
        let j = rng.gen_range(0..=i);
        if j < k {
            reservoir[j] = i;
        }
    }
    reservoir.sort_unstable();
    reservoir.into_iter().map(|i| rows[i].clone()).collect()
}

/// Keeps each row with probability k/n, stopping at k rows. Output is usually a little short of k.
pub fn bernoulli_sample(rows: &[Row], k: usize, seed: u64) -> Vec<Row> {
    if rows.len() <= k {
        return rows.to_vec();
    }
    let p = k as f64 / rows.len() as f64;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(k);
    for row in rows {
        if out.len() >= k {
            break;
        }
        if rng.gen::<f64>() < p {
            out.push(row.clone());
        }
    }
    out
}


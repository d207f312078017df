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

use crate::model::{ChartType, Framework};
use indexmap::IndexMap;
use quarry::SanitizeMode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationSettings {
    pub max_data_points: usize,
    pub default_limit: usize,
    pub sample_size: usize,
    pub default_framework: Framework,
    pub auto_detect_columns: bool,
}
impl Default for VisualizationSettings {
    fn default() -> Self {
        Self {
            max_data_points: 10_000,
            default_limit: 1000,
            sample_size: 100,
            default_framework: Framework::Plotly,
            auto_detect_columns: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    pub width: u32,
    pub height: u32,
    pub responsive: bool,
    pub animation: bool,
}
impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            responsive: true,
            animation: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub analysis_ttl_secs: u64,
    pub spec_ttl_secs: u64,
    pub max_capacity: u64,
}
impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            analysis_ttl_secs: 300,
            spec_ttl_secs: 3600,
            max_capacity: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    pub sanitize_mode: SanitizeMode,
    pub table_access_check: bool,
    pub allowed_tables_pattern: String,
    pub blocked_tables_pattern: String,
}
impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            sanitize_mode: SanitizeMode::Strict,
            table_access_check: true,
            allowed_tables_pattern: ".*".to_string(),
            blocked_tables_pattern: "^(SYS|SYSTEM|ORACLE).*".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingStrategy {
    /// Exact-size uniform sample, input order kept.
    #[default]
    Reservoir,
    /// Independent inclusion with probability threshold/n; output size is approximate.
    Bernoulli,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    pub thresholds: IndexMap<String, usize>,
    pub default_threshold: usize,
    pub seed: u64,
    pub generic_sampling: SamplingStrategy,
    pub magnitude_field: String,
}
impl Default for OptimizerSettings {
    fn default() -> Self {
        let thresholds = [
            ("executive_dashboard", 50),
            ("gradient_area", 200),
            ("heatmap", 100),
            ("interactive_heatmap", 100),
            ("candlestick", 500),
            ("radar", 20),
            ("sunburst", 30),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Self {
            thresholds,
            default_threshold: 100,
            seed: 42,
            generic_sampling: SamplingStrategy::Reservoir,
            magnitude_field: "total_amount".to_string(),
        }
    }
}
impl OptimizerSettings {
    pub fn threshold(&self, chart_type: &ChartType) -> usize {
        self.thresholds
            .get(chart_type.as_str())
            .copied()
            .unwrap_or(self.default_threshold)
    }
}

/// Everything the pipeline needs besides a data source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EaselConfig {
    pub visualization: VisualizationSettings,
    pub chart: ChartSettings,
    pub cache: CacheSettings,
    pub security: SecuritySettings,
    pub optimizer: OptimizerSettings,
}
impl EaselConfig {
    /// Caches off so every call reaches the data source.
    pub fn for_testing() -> Self {
        Self {
            cache: CacheSettings {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }
    pub fn for_exploration() -> Self {
        Self {
            visualization: VisualizationSettings {
                max_data_points: 2_000,
                sample_size: 50,
                ..Default::default()
            },
            cache: CacheSettings {
                analysis_ttl_secs: 60,
                spec_ttl_secs: 60,
                ..Default::default()
            },
            ..Default::default()
        }
    }
    pub fn for_presentation() -> Self {
        Self {
            visualization: VisualizationSettings {
                default_framework: Framework::VegaLite,
                ..Default::default()
            },
            chart: ChartSettings {
                width: 1200,
                height: 700,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

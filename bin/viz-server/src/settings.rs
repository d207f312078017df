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

//! Layered settings: defaults, then an optional TOML file, then `VIZ__*` environment variables.

use config::{Config, ConfigError, Environment, File};
use easel::{
    CacheSettings, ChartSettings, EaselConfig, OptimizerSettings, SecuritySettings,
    VisualizationSettings,
};
use quarry::OracleConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/viz.toml";
pub const ENV_PREFIX: &str = "VIZ";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Reported at startup only; admission is bounded by `max_workers`.
    pub core_workers: usize,
    pub max_workers: usize,
    pub queue_capacity: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            core_workers: 5,
            max_workers: 10,
            queue_capacity: 100,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: OracleConfig,
    pub visualization: VisualizationSettings,
    pub chart: ChartSettings,
    pub cache: CacheSettings,
    pub security: SecuritySettings,
    pub optimizer: OptimizerSettings,
}

impl Settings {
    /// An explicit path must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, Environment::with_prefix(ENV_PREFIX))
    }

    pub fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let (file, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };
        Config::builder()
            .add_source(File::from(file).required(required))
            .add_source(env.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn easel(&self) -> EaselConfig {
        EaselConfig {
            visualization: self.visualization.clone(),
            chart: self.chart.clone(),
            cache: self.cache.clone(),
            security: self.security.clone(),
            optimizer: self.optimizer.clone(),
        }
    }
}

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

use quarry::{DataSourceError, SanitizeError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VizError {
    #[error("Failed to analyze table '{table}': {reason}")]
    Analysis { table: String, reason: String },
    #[error("Failed to build query: {0}")]
    QueryBuild(String),
    #[error("Failed to fetch data: {source}")]
    QueryExecution {
        #[from]
        source: DataSourceError,
    },
    #[error("Failed to generate {chart_type} specification: {reason}")]
    SpecGeneration { chart_type: String, reason: String },
    #[error("Access to table {0} is not allowed")]
    TableNotAllowed(String),
}

impl From<SanitizeError> for VizError {
    fn from(err: SanitizeError) -> Self {
        Self::QueryBuild(err.to_string())
    }
}

impl VizError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Analysis { .. } => "ANALYSIS_FAILURE",
            Self::QueryBuild(_) => "QUERY_BUILD_FAILURE",
            Self::QueryExecution { .. } => "QUERY_EXECUTION_FAILURE",
            Self::SpecGeneration { .. } => "SPEC_GENERATION_FAILURE",
            Self::TableNotAllowed(_) => "TABLE_NOT_ALLOWED",
        }
    }

    pub fn spec_generation(chart_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SpecGeneration {
            chart_type: chart_type.into(),
            reason: reason.into(),
        }
    }
}

/// Raised inside the optimizer and absorbed there; callers only ever see rows.
#[derive(Error, Debug, Clone, PartialEq)]
pub(crate) enum OptimizationError {
    #[error("threshold for {chart_type} is zero")]
    ZeroThreshold { chart_type: String },
    #[error("field '{field}' holds non-numeric value '{value}'")]
    NonNumericMagnitude { field: String, value: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {name} pattern '{pattern}': {source}")]
    InvalidPattern {
        name: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

pub type Result<T> = std::result::Result<T, VizError>;

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

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataSourceError {
    #[error("Database connection failed: {0}")]
    Connection(String),
    #[error("Query failed: {message}")]
    Query { sql: String, message: String },
    #[error("Query timed out after {millis}ms")]
    Timeout { millis: u64 },
    #[error("Unsupported statement for this data source: {0}")]
    Unsupported(String),
    #[error("Database task aborted: {0}")]
    Task(String),
    #[cfg(feature = "oracle")]
    #[error("Oracle error: {0}")]
    Oracle(#[from] ::oracle::Error),
}

pub type Result<T> = std::result::Result<T, DataSourceError>;

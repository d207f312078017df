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

//! Relational data access for the visualization pipeline.
//!
//! A [`DataSource`] exposes two capabilities: catalog introspection and
//! execution of SQL text returning ordered row mappings. The Oracle backend
//! lives behind the `oracle` feature; [`InMemoryDataSource`] serves tests and
//! the demo mode.

pub mod error;
pub mod memory;
pub mod sanitize;
pub mod source;
pub mod value;

#[cfg(feature = "oracle")]
pub mod oracle;

pub use error::{DataSourceError, Result};
pub use memory::{InMemoryDataSource, MemoryTable, EXECUTED_LOG_CAPACITY};
pub use sanitize::{SanitizeError, SanitizeMode, Sanitizer};
pub use source::DataSource;
pub use value::{sparse, ColumnMeta, RawRow, Row, Value};

#[cfg(feature = "oracle")]
pub use self::oracle::{OracleConfig, OracleDataSource};

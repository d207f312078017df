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

use crate::error::Result;
use crate::value::{ColumnMeta, RawRow};
use async_trait::async_trait;

/// Synchronous-at-heart query executor seen through an async seam.
///
/// Implementations must keep row column order as produced by the database.
/// Identifiers are never bound; `binds` carries positional values only.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Catalog lookup: (column name, declared type) pairs in declaration order.
    async fn columns(&self, owner: Option<&str>, table: &str) -> Result<Vec<ColumnMeta>>;

    async fn query(&self, sql: &str, binds: &[String]) -> Result<Vec<RawRow>>;

    fn name(&self) -> &str;
}

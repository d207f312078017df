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

//! Oracle backend over an OCI session pool.
//!
//! The driver is blocking, so every call hops onto tokio's blocking pool.

use crate::error::{DataSourceError, Result};
use crate::source::DataSource;
use crate::value::{ColumnMeta, RawRow, Value};
use ::oracle::pool::{Pool, PoolBuilder};
use ::oracle::sql_type::{OracleType, ToSql};
use ::oracle::{Connection, Row};
use async_trait::async_trait;
use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const CATALOG_SQL: &str =
    "SELECT COLUMN_NAME, DATA_TYPE FROM ALL_TAB_COLUMNS WHERE TABLE_NAME = :1 ORDER BY COLUMN_ID";
const CATALOG_OWNER_SQL: &str = "SELECT COLUMN_NAME, DATA_TYPE FROM ALL_TAB_COLUMNS WHERE TABLE_NAME = :1 AND OWNER = :2 ORDER BY COLUMN_ID";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub connect_string: String,
    pub pool_max_connections: u32,
    pub query_timeout_ms: u64,
    pub fetch_size: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            connect_string: "//localhost:1521/FREEPDB1".to_string(),
            pool_max_connections: 10,
            query_timeout_ms: 30_000,
            fetch_size: 1000,
        }
    }
}

pub struct OracleDataSource {
    pool: Arc<Pool>,
    config: OracleConfig,
}

impl std::fmt::Debug for OracleDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleDataSource")
            .field("connect_string", &self.config.connect_string)
            .field("username", &self.config.username)
            .finish_non_exhaustive()
    }
}

impl OracleDataSource {
    pub async fn connect(config: OracleConfig) -> Result<Self> {
        let cfg = config.clone();
        let pool = tokio::task::spawn_blocking(move || {
            PoolBuilder::new(&cfg.username, &cfg.password, &cfg.connect_string)
                .max_connections(cfg.pool_max_connections)
                .build()
        })
        .await
        .map_err(|e| DataSourceError::Task(e.to_string()))?
        .map_err(|e| DataSourceError::Connection(e.to_string()))?;

        info!(
            connect_string = %config.connect_string,
            max_connections = config.pool_max_connections,
            "Oracle session pool created"
        );
        Ok(Self {
            pool: Arc::new(pool),
            config,
        })
    }

    async fn run<T, F>(&self, sql: String, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &str, u32) -> std::result::Result<T, ::oracle::Error> + Send + 'static,
    {
        let pool = Arc::clone(&self.pool);
        let timeout_ms = self.config.query_timeout_ms;
        let fetch_size = self.config.fetch_size;
        tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| DataSourceError::Connection(e.to_string()))?;
            conn.set_call_timeout(Some(Duration::from_millis(timeout_ms)))?;
            f(&conn, &sql, fetch_size).map_err(|e| classify(e, &sql, timeout_ms))
        })
        .await
        .map_err(|e| DataSourceError::Task(e.to_string()))?
    }
}

#[async_trait]
impl DataSource for OracleDataSource {
    async fn columns(&self, owner: Option<&str>, table: &str) -> Result<Vec<ColumnMeta>> {
        let mut binds = vec![table.to_ascii_uppercase()];
        let sql = match owner {
            Some(owner) => {
                binds.push(owner.to_ascii_uppercase());
                CATALOG_OWNER_SQL
            }
            None => CATALOG_SQL,
        };
        debug!(sql = %sql, table = %table, "Reading column catalog");
        self.run(sql.to_string(), move |conn, sql, fetch_size| {
            let params: Vec<&dyn ToSql> = binds.iter().map(|b| b as &dyn ToSql).collect();
            let mut stmt = conn.statement(sql).fetch_array_size(fetch_size).build()?;
            let mut columns = Vec::new();
            for row in stmt.query(&params)? {
                let row = row?;
                let name: String = row.get(0)?;
                let data_type: Option<String> = row.get(1)?;
                columns.push(ColumnMeta::new(name, data_type.unwrap_or_default()));
            }
            Ok(columns)
        })
        .await
    }

    async fn query(&self, sql: &str, binds: &[String]) -> Result<Vec<RawRow>> {
        debug!(sql = %sql, binds = binds.len(), "Executing query");
        let binds = binds.to_vec();
        self.run(sql.to_string(), move |conn, sql, fetch_size| {
            let params: Vec<&dyn ToSql> = binds.iter().map(|b| b as &dyn ToSql).collect();
            let mut stmt = conn.statement(sql).fetch_array_size(fetch_size).build()?;
            let rs = stmt.query(&params)?;
            let columns: Vec<(String, OracleType)> = rs
                .column_info()
                .iter()
                .map(|c| (c.name().to_string(), c.oracle_type().clone()))
                .collect();
            let mut rows = Vec::new();
            for row in rs {
                rows.push(read_row(&row?, &columns)?);
            }
            Ok(rows)
        })
        .await
    }

    fn name(&self) -> &str {
        "oracle"
    }
}

fn read_row(
    row: &Row,
    columns: &[(String, OracleType)],
) -> std::result::Result<RawRow, ::oracle::Error> {
    let mut out = RawRow::with_capacity(columns.len());
    for (idx, (name, ty)) in columns.iter().enumerate() {
        let value = match ty {
            OracleType::Number(precision, 0) if *precision > 0 => {
                row.get::<_, Option<i64>>(idx)?.map(Value::Integer)
            }
            OracleType::Int64 | OracleType::UInt64 => {
                row.get::<_, Option<i64>>(idx)?.map(Value::Integer)
            }
            OracleType::Number(..)
            | OracleType::Float(_)
            | OracleType::BinaryFloat
            | OracleType::BinaryDouble => row.get::<_, Option<f64>>(idx)?.map(Value::Float),
            OracleType::Date => row.get::<_, Option<NaiveDateTime>>(idx)?.map(|dt| {
                if dt.time() == NaiveTime::MIN {
                    Value::Date(dt.date())
                } else {
                    Value::Timestamp(dt)
                }
            }),
            OracleType::Timestamp(_) | OracleType::TimestampTZ(_) | OracleType::TimestampLTZ(_) => {
                row.get::<_, Option<NaiveDateTime>>(idx)?.map(Value::Timestamp)
            }
            OracleType::Boolean => row.get::<_, Option<bool>>(idx)?.map(Value::Bool),
            _ => row.get::<_, Option<String>>(idx)?.map(Value::Text),
        };
        out.insert(name.clone(), value);
    }
    Ok(out)
}

/// DPI-1067 is the driver's "call timeout exceeded" code.
fn classify(err: ::oracle::Error, sql: &str, timeout_ms: u64) -> DataSourceError {
    let message = err.to_string();
    if message.contains("DPI-1067") {
        DataSourceError::Timeout { millis: timeout_ms }
    } else {
        DataSourceError::Query {
            sql: sql.to_string(),
            message,
        }
    }
}

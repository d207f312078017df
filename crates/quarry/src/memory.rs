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

//! In-process data source used by tests and the demo server.
//!
//! Understands the SELECT shapes the query builder emits: plain projections,
//! `SUM/AVG/COUNT/MIN/MAX` aggregates with `GROUP BY`, `ORDER BY` and
//! `FETCH FIRST n ROWS ONLY`. WHERE clauses are refused.

use crate::error::{DataSourceError, Result};
use crate::source::DataSource;
use crate::value::{ColumnMeta, RawRow, Value};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Mutex, PoisonError, RwLock};
use tracing::debug;

static SELECT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)^\s*SELECT\s+(?P<proj>.+?)\s+FROM\s+(?P<table>[A-Za-z0-9_#$.]+)(?:\s+WHERE\s+(?P<where>.+?))?(?:\s+GROUP\s+BY\s+(?P<group>.+?))?(?:\s+ORDER\s+BY\s+(?P<order>.+?))?(?:\s+FETCH\s+FIRST\s+(?P<limit>\d+)\s+ROWS\s+ONLY)?\s*$",
    )
    .unwrap()
});

static AGG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?P<func>SUM|AVG|COUNT|MIN|MAX)\s*\(\s*(?P<arg>\*|[A-Za-z0-9_#$]+)\s*\)(?:\s+AS\s+(?P<alias>[A-Za-z0-9_#$]+))?$",
    )
    .unwrap()
});

static COLUMN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_#$]+$").unwrap());

#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    columns: Vec<ColumnMeta>,
    rows: Vec<RawRow>,
}

impl MemoryTable {
    pub fn new<I, N, T>(columns: I) -> Self
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<String>,
    {
        let columns = columns
            .into_iter()
            .map(|(name, data_type)| {
                ColumnMeta::new(name.into().to_ascii_uppercase(), data_type)
            })
            .collect();
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row; values pair up with columns positionally, missing trailing values are null.
    pub fn push_row<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = Option<Value>>,
    {
        let mut values = values.into_iter();
        let row = self
            .columns
            .iter()
            .map(|c| (c.name.clone(), values.next().flatten()))
            .collect();
        self.rows.push(row);
    }

    pub fn with_row<I>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = Option<Value>>,
    {
        self.push_row(values);
        self
    }

    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .map(|c| c.name.as_str())
    }
}

/// Statements kept by [`InMemoryDataSource::executed_sql`]; older ones are dropped.
pub const EXECUTED_LOG_CAPACITY: usize = 256;

#[derive(Debug)]
pub struct InMemoryDataSource {
    name: String,
    tables: RwLock<IndexMap<String, MemoryTable>>,
    executed: Mutex<VecDeque<String>>,
    catalog_available: AtomicBool,
}

impl Default for InMemoryDataSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDataSource {
    pub fn new() -> Self {
        Self {
            name: "memory".to_string(),
            tables: RwLock::new(IndexMap::new()),
            executed: Mutex::new(VecDeque::with_capacity(EXECUTED_LOG_CAPACITY)),
            catalog_available: AtomicBool::new(true),
        }
    }

    pub fn with_table(self, name: &str, table: MemoryTable) -> Self {
        self.insert_table(name, table);
        self
    }

    pub fn insert_table(&self, name: &str, table: MemoryTable) {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_ascii_uppercase(), table);
    }

    /// SQL text of the most recent `query` calls, oldest first.
    pub fn executed_sql(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// When false, catalog lookups fail as if the dictionary view were not granted.
    pub fn set_catalog_available(&self, available: bool) {
        self.catalog_available.store(available, AtomicOrdering::SeqCst);
    }

    /// SALES and LOANS tables with deterministic contents.
    pub fn sample_dataset() -> Self {
        let source = Self::new();
        source.insert_table("SALES", sales_table());
        source.insert_table("LOANS", loans_table());
        source
    }

    fn execute(&self, sql: &str) -> Result<Vec<RawRow>> {
        let caps = SELECT_RE
            .captures(sql)
            .ok_or_else(|| DataSourceError::Unsupported(sql.to_string()))?;
        if caps.name("where").is_some() {
            return Err(DataSourceError::Unsupported(
                "WHERE clauses are not evaluated in memory".to_string(),
            ));
        }

        let table_name = caps["table"].to_ascii_uppercase();
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        let table = tables.get(&table_name).ok_or_else(|| DataSourceError::Query {
            sql: sql.to_string(),
            message: format!("table or view {table_name} does not exist"),
        })?;

        let projection = parse_projection(&caps["proj"], table, sql)?;
        let group_by = match caps.name("group") {
            Some(g) => g
                .as_str()
                .split(',')
                .map(|c| resolve(table, c.trim(), sql))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        let aggregating = !group_by.is_empty()
            || projection.iter().any(|p| matches!(p, Projection::Aggregate { .. }));
        let mut rows = if aggregating {
            aggregate(table, &projection, &group_by)
        } else {
            table
                .rows
                .iter()
                .map(|row| project(row, &projection))
                .collect()
        };

        if let Some(order) = caps.name("order") {
            let keys = parse_order(order.as_str(), sql)?;
            rows.sort_by(|a, b| {
                keys.iter()
                    .map(|(column, descending)| {
                        let ord = compare(lookup(a, column), lookup(b, column));
                        if *descending { ord.reverse() } else { ord }
                    })
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        if let Some(limit) = caps.name("limit") {
            let limit = limit.as_str().parse::<usize>().map_err(|e| DataSourceError::Query {
                sql: sql.to_string(),
                message: e.to_string(),
            })?;
            rows.truncate(limit);
        }
        Ok(rows)
    }
}

#[async_trait]
impl DataSource for InMemoryDataSource {
    async fn columns(&self, owner: Option<&str>, table: &str) -> Result<Vec<ColumnMeta>> {
        if !self.catalog_available.load(AtomicOrdering::SeqCst) {
            return Err(DataSourceError::Connection(
                "catalog view ALL_TAB_COLUMNS is not accessible".to_string(),
            ));
        }
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        let table = table.to_ascii_uppercase();
        let qualified = owner.map(|o| format!("{}.{table}", o.to_ascii_uppercase()));
        let found = qualified
            .and_then(|q| tables.get(&q))
            .or_else(|| tables.get(&table));
        Ok(found.map(|t| t.columns.clone()).unwrap_or_default())
    }

    async fn query(&self, sql: &str, binds: &[String]) -> Result<Vec<RawRow>> {
        debug!(sql = %sql, binds = binds.len(), "Executing in-memory query");
        {
            let mut log = self.executed.lock().unwrap_or_else(PoisonError::into_inner);
            if log.len() == EXECUTED_LOG_CAPACITY {
                log.pop_front();
            }
            log.push_back(sql.to_string());
        }
        self.execute(sql)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone)]
enum Projection {
    All,
    Column(String),
    Aggregate {
        func: String,
        arg: Option<String>,
        alias: String,
    },
}

fn resolve(table: &MemoryTable, name: &str, sql: &str) -> Result<String> {
    table
        .column(name)
        .map(str::to_string)
        .ok_or_else(|| DataSourceError::Query {
            sql: sql.to_string(),
            message: format!("invalid identifier {}", name.to_ascii_uppercase()),
        })
}

fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(s[start..].trim());
    parts
}

fn parse_projection(proj: &str, table: &MemoryTable, sql: &str) -> Result<Vec<Projection>> {
    split_top_level(proj)
        .into_iter()
        .map(|item| {
            if item == "*" {
                return Ok(Projection::All);
            }
            if let Some(caps) = AGG_RE.captures(item) {
                let func = caps["func"].to_ascii_uppercase();
                let arg = match &caps["arg"] {
                    "*" => None,
                    column => Some(resolve(table, column, sql)?),
                };
                let alias = caps.name("alias").map_or_else(
                    || format!("{func}({})", arg.as_deref().unwrap_or("*")),
                    |a| a.as_str().to_ascii_uppercase(),
                );
                return Ok(Projection::Aggregate { func, arg, alias });
            }
            if COLUMN_RE.is_match(item) {
                return Ok(Projection::Column(resolve(table, item, sql)?));
            }
            Err(DataSourceError::Unsupported(format!("projection '{item}'")))
        })
        .collect()
}

fn parse_order(order: &str, sql: &str) -> Result<Vec<(String, bool)>> {
    order
        .split(',')
        .map(|item| {
            let mut parts = item.split_whitespace();
            let column = parts
                .next()
                .ok_or_else(|| DataSourceError::Query {
                    sql: sql.to_string(),
                    message: "empty ORDER BY item".to_string(),
                })?
                .to_ascii_uppercase();
            let descending = parts
                .next()
                .is_some_and(|d| d.eq_ignore_ascii_case("DESC"));
            Ok((column, descending))
        })
        .collect()
}

fn project(row: &RawRow, projection: &[Projection]) -> RawRow {
    let mut out = RawRow::new();
    for p in projection {
        match p {
            Projection::All => {
                for (k, v) in row {
                    out.insert(k.clone(), v.clone());
                }
            }
            Projection::Column(c) => {
                out.insert(c.clone(), row.get(c).cloned().flatten());
            }
            Projection::Aggregate { alias, .. } => {
                out.insert(alias.clone(), None);
            }
        }
    }
    out
}

fn aggregate(table: &MemoryTable, projection: &[Projection], group_by: &[String]) -> Vec<RawRow> {
    let mut groups: IndexMap<String, Vec<&RawRow>> = IndexMap::new();
    for row in &table.rows {
        let key = group_by
            .iter()
            .map(|c| row.get(c).cloned().flatten().map(|v| v.to_string()).unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\u{1f}");
        groups.entry(key).or_default().push(row);
    }
    if groups.is_empty() && group_by.is_empty() {
        groups.insert(String::new(), Vec::new());
    }

    groups
        .into_values()
        .map(|members| {
            let mut out = RawRow::new();
            for p in projection {
                match p {
                    Projection::All => {}
                    Projection::Column(c) => {
                        let v = members.first().and_then(|r| r.get(c).cloned().flatten());
                        out.insert(c.clone(), v);
                    }
                    Projection::Aggregate { func, arg, alias } => {
                        out.insert(alias.clone(), apply(func, arg.as_deref(), &members));
                    }
                }
            }
            out
        })
        .collect()
}

fn apply(func: &str, arg: Option<&str>, rows: &[&RawRow]) -> Option<Value> {
    let Some(column) = arg else {
        return Some(Value::Integer(rows.len() as i64));
    };
    let present: Vec<&Value> = rows
        .iter()
        .filter_map(|r| r.get(column).and_then(Option::as_ref))
        .collect();
    if func == "COUNT" {
        return Some(Value::Integer(present.len() as i64));
    }
    let numbers: Vec<f64> = present.iter().filter_map(|v| v.to_f64_lenient()).collect();
    if numbers.is_empty() {
        return None;
    }
    let result = match func {
        "SUM" => numbers.iter().sum(),
        "AVG" => numbers.iter().sum::<f64>() / numbers.len() as f64,
        "MIN" => numbers.iter().copied().fold(f64::INFINITY, f64::min),
        "MAX" => numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        _ => return None,
    };
    Some(Value::Float(result))
}

fn lookup<'a>(row: &'a RawRow, column: &str) -> Option<&'a Value> {
    row.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(column))
        .and_then(|(_, v)| v.as_ref())
}

/// Nulls sort last, as Oracle does for ascending order.
fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => match (a, b) {
                (Value::Date(x), Value::Date(y)) => x.cmp(y),
                (Value::Timestamp(x), Value::Timestamp(y)) => x.cmp(y),
                _ => a.to_string().cmp(&b.to_string()),
            },
        },
    }
}

const REGIONS: [&str; 4] = ["NORTH", "SOUTH", "EAST", "WEST"];

fn sales_table() -> MemoryTable {
    let mut table = MemoryTable::new([
        ("REGION", "VARCHAR2"),
        ("AMOUNT", "NUMBER"),
        ("SALE_DATE", "DATE"),
    ]);
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
    for i in 0..120i64 {
        let region = REGIONS[(i % 4) as usize];
        let amount = 1_000.0 + ((i * 37) % 500) as f64 * 4.5;
        table.push_row([
            Some(Value::from(region)),
            Some(Value::Float(amount)),
            Some(Value::Date(start + Duration::days(i * 3))),
        ]);
    }
    table
}

fn loans_table() -> MemoryTable {
    const BRANCHES: [&str; 5] = ["DOWNTOWN", "HARBOR", "MIDTOWN", "RIVERSIDE", "UPTOWN"];
    const TYPES: [&str; 4] = ["MORTGAGE", "AUTO", "PERSONAL", "BUSINESS"];
    const RISK: [&str; 3] = ["LOW", "MEDIUM", "HIGH"];
    let mut table = MemoryTable::new([
        ("BRANCH_NAME", "VARCHAR2"),
        ("LOAN_TYPE", "VARCHAR2"),
        ("RISK_CATEGORY", "VARCHAR2"),
        ("LOAN_AMOUNT", "NUMBER(12,2)"),
        ("INTEREST_RATE", "NUMBER(5,3)"),
        ("ROI_PERCENTAGE", "NUMBER(5,2)"),
        ("ORIGINATION_DATE", "DATE"),
    ]);
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default();
    for i in 0..80i64 {
        let amount = 5_000.0 + ((i * 7919) % 95_000) as f64;
        let rate = 3.5 + (i % 9) as f64 * 0.375;
        table.push_row([
            Some(Value::from(BRANCHES[(i % 5) as usize])),
            Some(Value::from(TYPES[(i % 4) as usize])),
            Some(Value::from(RISK[(i % 3) as usize])),
            Some(Value::Float(amount)),
            Some(Value::Float(rate)),
            // every seventh loan has no ROI recorded yet
            if i % 7 == 6 { None } else { Some(Value::Float(rate * 1.8 - 2.0)) },
            Some(Value::Date(start + Duration::days(i * 5))),
        ]);
    }
    table
}

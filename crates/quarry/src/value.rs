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

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single non-null cell. Serialized as a bare JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    Text(String),
}

/// Row as returned by a data source: column order preserved, nulls kept.
pub type RawRow = IndexMap<String, Option<Value>>;

/// Sparse row: columns holding null are absent.
pub type Row = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMeta {
    pub name: String,
    pub data_type: String,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

impl Value {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, Value::Date(_) | Value::Timestamp(_))
    }

    /// Numeric view of the value; text is not parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Numeric view that also parses text, the way a loosely typed driver would.
    pub fn to_f64_lenient(&self) -> Option<f64> {
        match self {
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            other => other.as_f64(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

/// Drops null cells, keeping column order.
pub fn sparse(raw: RawRow) -> Row {
    raw.into_iter()
        .filter_map(|(column, value)| value.map(|v| (column, v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_drops_nulls_and_keeps_order() {
        let mut raw = RawRow::new();
        raw.insert("B".into(), Some(Value::from(1)));
        raw.insert("A".into(), None);
        raw.insert("C".into(), Some(Value::from("x")));
        let row = sparse(raw);
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["B", "C"]);
    }

    #[test]
    fn lenient_numeric_view_parses_text() {
        assert_eq!(Value::from(" 4.5 ").to_f64_lenient(), Some(4.5));
        assert_eq!(Value::from("n/a").to_f64_lenient(), None);
        assert_eq!(Value::from("4").as_f64(), None);
        assert_eq!(Value::from(3).as_f64(), Some(3.0));
    }

    #[test]
    fn values_serialize_as_plain_scalars() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date");
        assert_eq!(Value::from(date).to_json(), serde_json::json!("2024-03-01"));
        assert_eq!(Value::from(2.5).to_json(), serde_json::json!(2.5));
        let parsed: Value = serde_json::from_str("\"2024-03-01\"").expect("parse");
        assert_eq!(parsed, Value::Date(date));
    }
}

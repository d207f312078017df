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

use crate::error::{Result, VizError};
use crate::model::{ChartType, VisualizationRequest};
use quarry::{sparse, DataSource, Row, Sanitizer};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

const AGGREGATES: [&str; 5] = ["SUM", "AVG", "COUNT", "MIN", "MAX"];

/// SQL text plus positional binds, ready for a [`DataSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    pub sql: String,
    pub binds: Vec<String>,
}

/// Already-sanitized pieces of an Oracle SELECT.
#[derive(Debug, Default, Clone)]
struct SelectStatement {
    fields: Vec<String>,
    from: String,
    where_clause: Option<String>,
    group_by: Vec<String>,
    order_by: Option<String>,
    fetch_first: usize,
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut query = String::from("SELECT ");
        if self.fields.is_empty() {
            query.push('*');
        } else {
            query.push_str(&self.fields.join(", "));
        }
        query.push_str(" FROM ");
        query.push_str(&self.from);
        if let Some(ref condition) = self.where_clause {
            query.push_str(" WHERE ");
            query.push_str(condition);
        }
        if !self.group_by.is_empty() {
            query.push_str(" GROUP BY ");
            query.push_str(&self.group_by.join(", "));
        }
        if let Some(ref order) = self.order_by {
            query.push_str(" ORDER BY ");
            query.push_str(order);
        }
        query.push_str(&format!(" FETCH FIRST {} ROWS ONLY", self.fetch_first));
        write!(f, "{query}")
    }
}

pub struct QueryBuilder {
    source: Arc<dyn DataSource>,
    sanitizer: Sanitizer,
    default_limit: usize,
}

impl QueryBuilder {
    pub fn new(source: Arc<dyn DataSource>, sanitizer: Sanitizer, default_limit: usize) -> Self {
        Self {
            source,
            sanitizer,
            default_limit,
        }
    }

    pub fn build_query(&self, request: &VisualizationRequest) -> Result<BuiltQuery> {
        let s = &self.sanitizer;
        let mut stmt = SelectStatement {
            from: s.table_name(&request.table_name)?,
            ..Default::default()
        };

        let aggregation = match request.aggregation_type.as_deref() {
            Some(agg) if !request.columns.is_empty() => Some(aggregate_function(agg)?),
            _ => None,
        };

        if let Some(ref agg) = aggregation {
            if let Some(ref x) = request.x_column {
                stmt.fields.push(s.column_name(x)?);
            }
            if let Some(ref y) = request.y_column {
                let y = s.column_name(y)?;
                stmt.fields.push(format!("{agg}({y}) AS {y}"));
            }
            if request.chart_type == Some(ChartType::Combo) {
                stmt.fields.push("COUNT(*) AS RECORD_COUNT".to_string());
            }
            if stmt.fields.is_empty() {
                return Err(VizError::QueryBuild(
                    "aggregation needs an x or y column".to_string(),
                ));
            }
        } else {
            for column in &request.columns {
                stmt.fields.push(s.column_name(column)?);
            }
        }

        if let Some(ref condition) = request.where_clause {
            let condition = s.where_clause(condition)?;
            if !condition.is_empty() {
                stmt.where_clause = Some(condition);
            }
        }

        if let Some(ref group_by) = request.group_by {
            for column in group_by.split(',') {
                stmt.group_by.push(s.column_name(column)?);
            }
        } else if aggregation.is_some() {
            if let Some(ref x) = request.x_column {
                stmt.group_by.push(s.column_name(x)?);
            }
        }

        if let Some(ref order) = request.order_by {
            let order = s.order_by(order)?;
            if !order.is_empty() {
                stmt.order_by = Some(order);
            }
        }

        stmt.fetch_first = match request.limit {
            Some(limit) if limit > 0 => usize::try_from(limit).unwrap_or(self.default_limit),
            _ => self.default_limit,
        };

        Ok(BuiltQuery {
            sql: stmt.to_string(),
            binds: Vec::new(),
        })
    }

    pub async fn fetch_data(&self, request: &VisualizationRequest) -> Result<Vec<Row>> {
        let query = self.build_query(request)?;
        debug!(sql = %query.sql, "Executing data query");
        let rows = self.source.query(&query.sql, &query.binds).await?;
        info!(table = %request.table_name, rows = rows.len(), "Fetched rows");
        Ok(rows.into_iter().map(sparse).collect())
    }
}

fn aggregate_function(raw: &str) -> Result<String> {
    let upper = raw.trim().to_ascii_uppercase();
    if AGGREGATES.contains(&upper.as_str()) {
        Ok(upper)
    } else {
        Err(VizError::QueryBuild(format!(
            "unsupported aggregation '{raw}'; expected one of {}",
            AGGREGATES.join(", ")
        )))
    }
}

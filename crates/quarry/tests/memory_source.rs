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

use quarry::{
    DataSource, DataSourceError, InMemoryDataSource, MemoryTable, Value, EXECUTED_LOG_CAPACITY,
};

fn regions() -> InMemoryDataSource {
    InMemoryDataSource::new().with_table(
        "REGIONS",
        MemoryTable::new([("NAME", "VARCHAR2"), ("AMOUNT", "NUMBER")])
            .with_row([Some(Value::from("NORTH")), Some(Value::from(10))])
            .with_row([Some(Value::from("SOUTH")), Some(Value::from(4))])
            .with_row([Some(Value::from("NORTH")), Some(Value::from(6))])
            .with_row([Some(Value::from("EAST")), None]),
    )
}

#[tokio::test]
async fn catalog_lists_columns_in_declaration_order() {
    let source = regions();
    let cols = source.columns(None, "regions").await.unwrap();
    let names: Vec<_> = cols.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["NAME", "AMOUNT"]);
    assert!(source.columns(None, "MISSING").await.unwrap().is_empty());
}

#[tokio::test]
async fn unavailable_catalog_is_an_error() {
    let source = regions();
    source.set_catalog_available(false);
    assert!(matches!(
        source.columns(None, "REGIONS").await,
        Err(DataSourceError::Connection(_))
    ));
}

#[tokio::test]
async fn select_star_respects_fetch_first_and_keeps_nulls() {
    let source = regions();
    let rows = source
        .query("SELECT * FROM REGIONS FETCH FIRST 10 ROWS ONLY", &[])
        .await
        .unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[3].get("AMOUNT"), Some(&None));

    let rows = source
        .query("SELECT * FROM REGIONS FETCH FIRST 1 ROWS ONLY", &[])
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        source.executed_sql().last().map(String::as_str),
        Some("SELECT * FROM REGIONS FETCH FIRST 1 ROWS ONLY")
    );
}

#[tokio::test]
async fn grouped_aggregate_sums_per_group() {
    let source = regions();
    let rows = source
        .query(
            "SELECT NAME, SUM(AMOUNT) AS AMOUNT, COUNT(*) AS RECORD_COUNT FROM REGIONS GROUP BY NAME ORDER BY AMOUNT DESC FETCH FIRST 10 ROWS ONLY",
            &[],
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
    // EAST has no amounts; a null sum sorts first under DESC
    assert_eq!(rows[0]["NAME"], Some(Value::from("EAST")));
    assert_eq!(rows[0]["AMOUNT"], None);
    assert_eq!(rows[1]["NAME"], Some(Value::from("NORTH")));
    assert_eq!(rows[1]["AMOUNT"], Some(Value::Float(16.0)));
    assert_eq!(rows[1]["RECORD_COUNT"], Some(Value::Integer(2)));
    assert_eq!(rows[2]["NAME"], Some(Value::from("SOUTH")));
}

#[tokio::test]
async fn unknown_table_and_column_fail_as_query_errors() {
    let source = regions();
    assert!(matches!(
        source.query("SELECT * FROM NOPE", &[]).await,
        Err(DataSourceError::Query { .. })
    ));
    assert!(matches!(
        source.query("SELECT BOGUS FROM REGIONS", &[]).await,
        Err(DataSourceError::Query { .. })
    ));
    assert!(matches!(
        source.query("SELECT * FROM REGIONS WHERE AMOUNT > 1", &[]).await,
        Err(DataSourceError::Unsupported(_))
    ));
}

#[tokio::test]
async fn sample_dataset_seeds_sales_and_loans() {
    let source = InMemoryDataSource::sample_dataset();
    let sales = source.columns(None, "SALES").await.unwrap();
    let types: Vec<_> = sales.iter().map(|c| c.data_type.as_str()).collect();
    assert_eq!(types, vec!["VARCHAR2", "NUMBER", "DATE"]);
    let loans = source
        .query("SELECT BRANCH_NAME, LOAN_AMOUNT FROM LOANS FETCH FIRST 5 ROWS ONLY", &[])
        .await
        .unwrap();
    assert_eq!(loans.len(), 5);
    assert_eq!(source.name(), "memory");
}

#[tokio::test]
async fn executed_log_keeps_only_the_most_recent_statements() {
    let source = InMemoryDataSource::sample_dataset();
    for n in 1..=EXECUTED_LOG_CAPACITY + 50 {
        let sql = format!("SELECT * FROM SALES FETCH FIRST {n} ROWS ONLY");
        source.query(&sql, &[]).await.unwrap();
    }

    let log = source.executed_sql();
    assert_eq!(log.len(), EXECUTED_LOG_CAPACITY);
    assert_eq!(log[0], "SELECT * FROM SALES FETCH FIRST 51 ROWS ONLY");
    assert_eq!(
        log[EXECUTED_LOG_CAPACITY - 1],
        format!("SELECT * FROM SALES FETCH FIRST {} ROWS ONLY", EXECUTED_LOG_CAPACITY + 50)
    );
}

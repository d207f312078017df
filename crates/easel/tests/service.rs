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

use easel::{
    ChartType, EaselConfig, Framework, VisualizationRequest, VisualizationService, VizError,
};
use quarry::{DataSource, InMemoryDataSource};
use serde_json::json;
use std::sync::Arc;

fn service_with(config: EaselConfig) -> (Arc<InMemoryDataSource>, VisualizationService) {
    let source = Arc::new(InMemoryDataSource::sample_dataset());
    let shared: Arc<dyn DataSource> = source.clone();
    let service = VisualizationService::new(shared, config).unwrap();
    (source, service)
}

#[tokio::test]
async fn missing_axes_are_resolved_before_querying() {
    let (source, service) = service_with(EaselConfig::for_testing());
    let chart = service
        .generate_visualization(VisualizationRequest::new("SALES").with_chart_type(ChartType::Bar))
        .await
        .unwrap();

    let layout = &chart.specification()["layout"];
    assert_eq!(layout["title"], "AMOUNT by REGION");
    assert_eq!(layout["xaxis"]["title"], "REGION");
    assert_eq!(chart.specification()["data"][0]["x"].as_array().unwrap().len(), 100);

    let sql = source.executed_sql();
    assert_eq!(sql[0], "SELECT * FROM SALES FETCH FIRST 100 ROWS ONLY");
    assert_eq!(sql[1], "SELECT * FROM SALES FETCH FIRST 10000 ROWS ONLY");
}

#[tokio::test]
async fn metadata_reports_fetch_and_optimization() {
    let (_, service) = service_with(EaselConfig::for_testing());
    let chart = service
        .generate_visualization(
            VisualizationRequest::new("SALES")
                .with_chart_type(ChartType::Pie)
                .with_axes("REGION", "AMOUNT")
                .with_columns(["REGION", "AMOUNT"])
                .with_framework(Framework::VegaLite),
        )
        .await
        .unwrap();

    let meta = chart.metadata().unwrap();
    assert_eq!(meta.source, "SALES");
    assert_eq!(meta.framework, Framework::VegaLite);
    assert_eq!(meta.fetched_rows, 120);
    assert_eq!(meta.row_count, 100);
    assert_eq!(meta.optimization.optimized_data_points, 100);
    assert_eq!((meta.width, meta.height), (800, 600));
    assert_eq!(chart.specification()["mark"]["type"], "arc");
}

#[tokio::test]
async fn explicit_columns_skip_profiling() {
    let (source, service) = service_with(EaselConfig::for_testing());
    service
        .generate_visualization(
            VisualizationRequest::new("SALES")
                .with_axes("SALE_DATE", "AMOUNT")
                .with_columns(["SALE_DATE", "AMOUNT"])
                .with_limit(25),
        )
        .await
        .unwrap();
    assert_eq!(
        source.executed_sql(),
        vec!["SELECT SALE_DATE, AMOUNT FROM SALES FETCH FIRST 25 ROWS ONLY".to_string()]
    );
}

#[tokio::test]
async fn limits_above_the_cap_are_clamped() {
    let mut config = EaselConfig::for_testing();
    config.visualization.max_data_points = 50;
    let (source, service) = service_with(config);
    service
        .generate_visualization(
            VisualizationRequest::new("SALES")
                .with_axes("REGION", "AMOUNT")
                .with_columns(["REGION", "AMOUNT"])
                .with_limit(5000),
        )
        .await
        .unwrap();
    assert!(source.executed_sql()[0].ends_with("FETCH FIRST 50 ROWS ONLY"));
}

#[tokio::test]
async fn repeated_requests_are_served_from_cache() {
    let (source, service) = service_with(EaselConfig::default());
    let request = VisualizationRequest::new("SALES").with_chart_type(ChartType::Line);
    let first = service.generate_visualization(request.clone()).await.unwrap();
    let executed = source.executed_sql().len();
    let second = service.generate_visualization(request).await.unwrap();
    assert_eq!(source.executed_sql().len(), executed);
    assert_eq!(first, second);
}

#[tokio::test]
async fn blocked_tables_are_refused() {
    let (source, service) = service_with(EaselConfig::for_testing());
    let err = service
        .generate_visualization(VisualizationRequest::new("SYSTEM.AUD$"))
        .await
        .unwrap_err();
    assert!(matches!(err, VizError::TableNotAllowed(_)));
    assert_eq!(err.code(), "TABLE_NOT_ALLOWED");
    assert!(source.executed_sql().is_empty());
}

#[tokio::test]
async fn smart_visualization_infers_the_chart_type() {
    let (_, service) = service_with(EaselConfig::for_testing());

    let bar = service
        .generate_smart_visualization("SALES", None, None, None)
        .await
        .unwrap();
    assert_eq!(bar.chart_type(), &ChartType::Bar);
    assert_eq!(bar.framework(), Framework::Plotly);

    let line = service
        .generate_smart_visualization("SALES", Some("SALE_DATE".into()), None, Some(Framework::VegaLite))
        .await
        .unwrap();
    assert_eq!(line.chart_type(), &ChartType::Line);
    assert_eq!(line.specification()["encoding"]["x"]["type"], "temporal");

    let scatter = service
        .generate_smart_visualization("LOANS", Some("LOAN_AMOUNT".into()), Some("INTEREST_RATE".into()), None)
        .await
        .unwrap();
    assert_eq!(scatter.chart_type(), &ChartType::Scatter);
}

#[tokio::test]
async fn professional_kinds_render_themed_vega_lite() {
    let (_, service) = service_with(EaselConfig::for_testing());
    let mut request = VisualizationRequest::new("LOANS")
        .with_chart_type(ChartType::ExecutiveDashboard)
        .with_axes("BRANCH_NAME", "LOAN_AMOUNT")
        .with_columns(["BRANCH_NAME", "LOAN_AMOUNT"])
        .with_parameters(json!({ "theme": "executive", "magnitudeField": "LOAN_AMOUNT" }));
    request.aggregation_type = Some("SUM".into());

    let chart = service.generate_visualization(request).await.unwrap();
    assert_eq!(chart.framework(), Framework::VegaLite);
    let spec = chart.specification();
    assert_eq!(spec["encoding"]["x"]["field"], "BRANCH_NAME");
    assert_eq!(spec["encoding"]["color"]["value"], "#dc2626");
    assert_eq!(spec["data"]["values"].as_array().unwrap().len(), 5);
}

#[test]
fn invalid_policy_pattern_fails_construction() {
    let mut config = EaselConfig::for_testing();
    config.security.allowed_tables_pattern = "(".into();
    let source: Arc<dyn DataSource> = Arc::new(InMemoryDataSource::new());
    assert!(VisualizationService::new(source, config).is_err());
}

#[tokio::test]
async fn auto_detect_off_leaves_axes_to_the_caller() {
    let mut config = EaselConfig::for_testing();
    config.visualization.auto_detect_columns = false;
    let (source, service) = service_with(config);
    service
        .generate_visualization(
            VisualizationRequest::new("SALES")
                .with_chart_type(ChartType::Bar)
                .with_axes("REGION", "AMOUNT")
                .with_limit(20),
        )
        .await
        .unwrap();

    assert_eq!(
        source.executed_sql(),
        vec!["SELECT * FROM SALES FETCH FIRST 20 ROWS ONLY".to_string()]
    );
}

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

//! HTTP surface mounted under `/api/visualization`.

use crate::error::ApiError;
use crate::gate::{gate_requests, RequestGate};
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use chrono::Utc;
use easel::{ChartSpecification, DataAnalysis, Framework, VisualizationRequest};
use quarry::Row;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub const API_PREFIX: &str = "/api/visualization";

#[derive(Debug, Serialize)]
pub struct ChartEnvelope {
    status: &'static str,
    chart: ChartSpecification,
}

impl ChartEnvelope {
    fn success(chart: ChartSpecification) -> Self {
        Self {
            status: "success",
            chart,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartParams {
    pub table_name: String,
    pub x_column: Option<String>,
    pub y_column: Option<String>,
    pub framework: Option<String>,
}

pub fn build_router(state: AppState, gate: RequestGate) -> Router {
    let api = Router::new()
        .route("/generate", post(generate))
        .route("/smart", post(smart))
        .route("/analyze/{table_name}", get(analyze))
        .route("/data", post(data))
        .route_layer(middleware::from_fn_with_state(gate, gate_requests))
        .route("/health", get(health))
        .with_state(state);
    Router::new()
        .nest(API_PREFIX, api)
        .layer(TraceLayer::new_for_http())
}

async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<VisualizationRequest>, JsonRejection>,
) -> Result<Json<ChartEnvelope>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    info!(table = %request.table_name, chart_type = ?request.chart_type, "Visualization requested");
    let chart = state.service.generate_visualization(request).await?;
    Ok(Json(ChartEnvelope::success(chart)))
}

async fn smart(
    State(state): State<AppState>,
    params: Result<Query<SmartParams>, QueryRejection>,
) -> Result<Json<ChartEnvelope>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let framework = params.framework.as_deref().and_then(|tag| {
        let parsed = Framework::parse(tag);
        if parsed.is_none() {
            warn!(framework = %tag, "Unknown framework requested; using configured default");
        }
        parsed
    });
    info!(table = %params.table_name, "Smart visualization requested");
    let chart = state
        .service
        .generate_smart_visualization(&params.table_name, params.x_column, params.y_column, framework)
        .await?;
    Ok(Json(ChartEnvelope::success(chart)))
}

async fn analyze(
    State(state): State<AppState>,
    Path(table_name): Path<String>,
) -> Result<Json<DataAnalysis>, ApiError> {
    Ok(Json(state.service.analyze_table(&table_name).await?))
}

async fn data(
    State(state): State<AppState>,
    payload: Result<Json<VisualizationRequest>, JsonRejection>,
) -> Result<Json<Vec<Row>>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok(Json(state.service.fetch_data(&request).await?))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "visualization",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

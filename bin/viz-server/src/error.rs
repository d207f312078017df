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

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use easel::VizError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Viz(#[from] VizError),
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error("server is at capacity, retry later")]
    Busy,
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Viz(VizError::QueryBuild(_) | VizError::SpecGeneration { .. }) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Viz(VizError::TableNotAllowed(_)) => StatusCode::FORBIDDEN,
            Self::Viz(VizError::Analysis { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Viz(VizError::QueryExecution { .. }) => StatusCode::BAD_GATEWAY,
            Self::Busy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::Viz(e) => e.code(),
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Busy => "SERVICE_BUSY",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.code(), error = %self, "Request failed");
        } else {
            warn!(code = self.code(), error = %self, "Request rejected");
        }
        let body = json!({
            "status": "error",
            "errorCode": self.code(),
            "message": self.to_string(),
            "timestamp": Utc::now().to_rfc3339(),
        });
        (status, Json(body)).into_response()
    }
}

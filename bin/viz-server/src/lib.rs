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

//! Visualization HTTP service over the easel pipeline.

pub mod error;
pub mod gate;
pub mod routes;
pub mod settings;
pub mod state;

pub use error::ApiError;
pub use gate::RequestGate;
pub use routes::{build_router, API_PREFIX};
pub use settings::{ServerSettings, Settings};
pub use state::AppState;

use easel::VisualizationService;
use quarry::DataSource;
use std::sync::Arc;

/// Router with service, gate and tracing wired from `settings`.
pub fn app(settings: &Settings, source: Arc<dyn DataSource>) -> anyhow::Result<axum::Router> {
    let service = VisualizationService::new(source, settings.easel())?;
    let gate = RequestGate::new(settings.server.max_workers, settings.server.queue_capacity);
    Ok(build_router(AppState::new(service), gate))
}

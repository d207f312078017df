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

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use quarry::{DataSource, InMemoryDataSource, OracleDataSource};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use viz_server::{app, Settings, API_PREFIX};

const DEFAULT_FILTER: &str = "viz_server=info,easel=info,quarry=info,tower_http=info";

#[derive(Parser, Debug, Clone)]
#[command(name = "viz-server", about = "Chart specifications over relational tables")]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    Serve(ServeArgs),
}

#[derive(Args, Debug, Clone, Default)]
struct ServeArgs {
    /// TOML settings file; defaults to config/viz.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    /// Serve the seeded in-memory SALES and LOANS tables instead of Oracle.
    #[arg(long)]
    demo: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_target(false)
        .init();
    let cli = Cli::parse();
    match cli.cmd.unwrap_or_else(|| Command::Serve(ServeArgs::default())) {
        Command::Serve(args) => run_server(args).await,
    }
}

async fn run_server(args: ServeArgs) -> Result<()> {
    let mut settings = Settings::load(args.config.as_deref()).context("loading settings")?;
    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }

    let source: Arc<dyn DataSource> = if args.demo {
        info!("Serving the in-memory demo dataset");
        Arc::new(InMemoryDataSource::sample_dataset())
    } else {
        Arc::new(
            OracleDataSource::connect(settings.database.clone())
                .await
                .context("connecting to Oracle")?,
        )
    };

    let router = app(&settings, source)?;
    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("invalid server.host/server.port")?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        local = %listener.local_addr()?,
        prefix = API_PREFIX,
        core_workers = settings.server.core_workers,
        max_workers = settings.server.max_workers,
        queue_capacity = settings.server.queue_capacity,
        "viz-server listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("viz-server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("Shutdown signal received; draining in-flight requests");
}

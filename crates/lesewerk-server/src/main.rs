// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lesewerk — local web gateway for a shared document reader.
//
// Entry point. Initialises logging, loads configuration, wires the backend
// services around the reader, and serves the HTTP/WebSocket surface.

use std::path::PathBuf;

use tracing::{error, info, warn};

use lesewerk_core::config::AppConfig;
use lesewerk_core::error::Result;
use lesewerk_device::sim::SimulatedReader;
use lesewerk_server::routes::build_router;
use lesewerk_server::services::AppServices;

const CONFIG_FILE: &str = "config.json";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Lesewerk starting");

    if let Err(e) = run().await {
        error!(error = %e, "gateway failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let data_dir = data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let config = load_config(&data_dir).unwrap_or_default();

    // The vendor SDK bridge is linked in at integration time; until then the
    // gateway runs against the simulated reader.
    let reader = Box::new(SimulatedReader::new());

    let services = match AppServices::init(config.clone(), reader, &data_dir).await {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "persistent storage failed — using in-memory fallback");
            AppServices::fallback(config.clone(), Box::new(SimulatedReader::new())).await?
        }
    };

    let app = build_router(services);
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "gateway listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Data directory: `LESEWERK_DATA_DIR` or `./lesewerk-data`.
fn data_dir() -> PathBuf {
    std::env::var_os("LESEWERK_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("lesewerk-data"))
}

fn load_config(data_dir: &std::path::Path) -> Option<AppConfig> {
    let path = data_dir.join(CONFIG_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable config file, using defaults");
            None
        }
    }
}

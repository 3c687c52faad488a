// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{env, net::SocketAddr};

use edge_auth_gate::{
    api::router,
    config::{AuthMode, DeploymentConfig, ServerConfig, LOG_FORMAT_ENV},
    state::AppState,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match env::var(LOG_FORMAT_ENV).as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = DeploymentConfig::from_env()?;
    let server = ServerConfig::from_env()?;

    if config.auth_mode() == AuthMode::Bypass {
        tracing::warn!("Authentication bypass is enabled; every request is admitted as the development user");
    }
    if !config.wallet_enabled() && !config.broker_enabled() {
        tracing::warn!("No authentication method configured; protected routes will return 503");
    }
    tracing::info!(
        wallet = config.wallet_enabled(),
        cloudflare_access = config.broker_enabled(),
        "Authentication methods loaded"
    );

    let app = router(AppState::new(config));

    let addr: SocketAddr = server.bind_address().parse()?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Edge auth gate listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

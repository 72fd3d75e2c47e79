// SPDX-License-Identifier: GPL-3.0-only
mod api;
mod backend;
mod config;
mod container;
mod gateway;
mod geocoder;
mod logging;
mod registry;

#[cfg(test)]
mod test_helpers;

use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use api::{ApiHandlers, HttpServer};
use backend::InMemoryBackend;
use config::Config;
use container::HostContainers;
use gateway::Gateway;
use geocoder::YandexGeocoder;
use logging::setup_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    setup_logging(&config.log_level, &config.log_format)?;

    info!("Starting map-bridge v{}", env!("CARGO_PKG_VERSION"));

    let geocoder = Arc::new(YandexGeocoder::new(
        config.geocoder_url.clone(),
        config.suggest_url.clone(),
        config.api_key.clone(),
        config.suggest_api_key.clone(),
        config.request_timeout(),
    )?);
    if config.api_key.is_none() {
        info!("No geocoder API key configured; geocode and suggest requests are sent without one");
    }

    let backend = Arc::new(InMemoryBackend::new());
    let containers = Arc::new(HostContainers::new());
    let gateway = Arc::new(Gateway::new(
        backend,
        geocoder,
        containers.clone(),
        config.gateway_settings(),
    ));
    let settings = gateway.settings();
    info!(
        default_animation_ms = settings.default_animation.as_millis() as u64,
        container_poll_ms = settings.container_wait.poll_interval.as_millis() as u64,
        container_wait_secs = settings.container_wait.timeout.as_secs(),
        "Gateway initialized"
    );

    let shutdown = CancellationToken::new();
    let handlers = Arc::new(ApiHandlers::new(gateway, containers, shutdown.clone()));

    // Start HTTP server (WebSocket is served on the same listener at /ws)
    let http_server = HttpServer::new(handlers, config.local_api_bind);
    let http_shutdown = shutdown.clone();
    let http_task = tokio::spawn(async move {
        if let Err(e) = http_server.serve(http_shutdown).await {
            error!(error = %e, "HTTP server error");
        }
    });

    info!("All services started. Waiting for shutdown signal...");

    // Wait for shutdown signal
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal (Ctrl+C)");
        }
        Err(err) => {
            error!(error = %err, "Unable to listen for shutdown signal");
        }
    }

    // Graceful shutdown: pending container waits and the server observe the token
    info!("Initiating graceful shutdown...");
    shutdown.cancel();

    if tokio::time::timeout(tokio::time::Duration::from_secs(5), http_task)
        .await
        .is_err()
    {
        error!("HTTP server did not stop in time");
    }

    info!("Shutdown complete");
    Ok(())
}

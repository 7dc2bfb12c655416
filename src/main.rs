//! tab-relay server entry point.
//!
//! Starts the Axum HTTP server with the `/ws` relay endpoint and the REST
//! endpoints.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use tab_relay::api;
use tab_relay::app_state::AppState;
use tab_relay::config::{LogFormat, RelayConfig};
use tab_relay::domain::Relay;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = RelayConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    tracing::info!(
        addr = %config.listen_addr,
        policy = ?config.disconnect_policy,
        queue_capacity = config.peer_queue_capacity,
        "starting tab-relay"
    );

    // Build domain layer
    let relay = Arc::new(Relay::new(config.disconnect_policy));

    // Build application
    let app = api::build_app(AppState::new(relay, config.peer_queue_capacity));

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

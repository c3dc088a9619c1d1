// Main entry point - Dependency injection and engine startup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::sync::Arc;

use crate::application::sync_service::SyncEngine;
use crate::infrastructure::config::load_engine_config;
use crate::infrastructure::control_client::HttpControlClient;
use crate::presentation::log_sink::LogSink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = load_engine_config()?;

    // Create adapters (infrastructure layer)
    let control = Arc::new(HttpControlClient::new(config.control.base_url.clone()));
    let sink = Arc::new(LogSink);

    // Create the engine (application layer)
    let (engine, handle) = SyncEngine::new(&config, control, sink);

    tracing::info!(ws_url = %config.connection.ws_url, "starting pt100-monitor sync engine");

    // Ctrl-C triggers a deliberate shutdown
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = handle.shutdown().await;
        }
    });

    engine.run().await
}

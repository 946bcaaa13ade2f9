//! Main entry point for the HTTP server binary

use anyhow::Result;
use core_lib::{config::LoggingConfig, create_app, run_server, AppConfig, AppState};
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_tracing(&config.logging);

    info!("Configuration loaded successfully");
    info!("Server will bind to: {}", config.bind_address());

    let addr: SocketAddr = config.bind_address().parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address: {}", e))?;

    let state = AppState::from_config(config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize application state: {}", e))?;

    info!("App: {} v{}", state.app_name, state.version);

    if state.delivery_configured() {
        info!("Contact delivery endpoint configured");
    } else {
        warn!("No contact delivery endpoint configured - submissions will be refused");
    }

    if state.config.challenge.is_enabled() {
        info!("Anti-bot challenge enabled for contact forms");
    }

    let maintenance = state.spawn_maintenance();
    info!(
        "Started form session maintenance (every {} seconds)",
        state.config.forms.prune_interval_seconds
    );

    let app = create_app(state);

    run_server(app, addr).await?;

    maintenance.abort();
    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .ok()
        .or_else(|| logging.filter.as_deref().and_then(|f| EnvFilter::try_new(f).ok()))
        .unwrap_or_else(|| {
            let default_level = if cfg!(debug_assertions) {
                "debug"
            } else {
                "info"
            };

            format!("core_lib={0},server={0},tower_http=info,axum=info", default_level).into()
        });

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let is_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or_else(|_| logging.format.eq_ignore_ascii_case("json"));

    if is_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.pretty())
            .init();
    }
}

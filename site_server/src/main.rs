//! Main entry point for the site backend binary

use anyhow::{Context, Result};
use site_core::{build_state, create_app_with_config, run_server, AppConfig};
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::load().context("Failed to load configuration")?;

    info!("Configuration loaded successfully");
    info!("Server will bind to: {}", config.bind_address());
    info!("Public site URL: {}", config.site.url);

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .context("Invalid bind address")?;

    let state = build_state(&config).context("Failed to initialize services")?;

    info!("App: {} v{}", state.app_name, state.version);
    info!(
        "Challenge verification: {}",
        if state.contact.challenge_enabled() { "enabled" } else { "disabled" }
    );
    info!(
        "Articles: {}",
        if config.cms.enable_articles { "enabled" } else { "disabled" }
    );

    let app = create_app_with_config(state, &config);

    run_server(app, addr).await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let default_level = if cfg!(debug_assertions) {
            "debug"
        } else {
            "info"
        };

        format!(
            "{}={},site_core={},tower_http=debug,axum=debug",
            env!("CARGO_CRATE_NAME").replace('-', "_"),
            default_level,
            default_level
        )
        .into()
    });

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let is_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

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

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};

use cvu_gateway as gateway;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = gateway::config::load_config().context("failed to load configuration")?;
    gateway::config::init_tracing(cfg.log_level(), cfg.log_json);

    if cfg.allow_unsigned_webhooks && cfg.webhook_secret.is_none() {
        warn!("Unsigned payment confirmations are accepted; set APP__WEBHOOK_SECRET to require signatures");
    }
    if cfg.admin_token.is_none() {
        warn!("APP__ADMIN_TOKEN not set; admin routes will reject every request");
    }

    // Stand-alone deployment runs against the in-memory platform adapters
    let ports = gateway::services::PlatformPorts::in_memory();
    let identifier_api = Arc::new(gateway::services::identifier_source::HttpIdentifierApi::new(
        reqwest::Client::builder()
            .user_agent(concat!("cvu-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?,
    ));

    let cleanup_interval = cfg.cleanup_interval();
    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.host, cfg.port))?;

    let app_state = gateway::AppState::new(cfg, ports, identifier_api);

    // Reap abandoned reservations in the background
    let sweeper = app_state
        .services
        .sweeper
        .clone()
        .start_worker(cleanup_interval);

    let app = gateway::app(app_state);

    info!("cvu-gateway listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("cvu-gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

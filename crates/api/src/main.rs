use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use warden_api::app::{build_app, services::build_services};
use warden_api::config::{AppConfig, log_format_from_env};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    warden_observability::init(log_format_from_env());

    let config = AppConfig::from_env().context("invalid configuration")?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(env = %config.env, prefix = %config.api_prefix, "starting warden");

    let services = Arc::new(build_services(config).await?);
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

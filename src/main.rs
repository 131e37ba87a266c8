use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;

use tours::config::AppConfig;
use tours::repository::postgres::create_pool;
use tours::{AppState, build_router, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // optional; real environment variables win
    dotenvy::from_filename("config.env").ok();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    let telemetry = telemetry::init(&config);

    tracing::info!(environment = config.environment.as_str(), "starting the tours service");

    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;
    metrics_process::Collector::default().describe();
    tracing::info!("prometheus metrics initialized");

    let pool = create_pool(&config.database_url(), config.database_max_connections)
        .await
        .context("failed to create database pool")?;
    tracing::info!("database pool created");

    sqlx::migrate!().run(&pool).await?;
    tracing::info!("database migrations applied");

    let state = AppState::new(&config, pool, metrics_handle).context("failed to build mailer")?;
    let router = build_router(Arc::new(state));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "tours service running");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("tours service stopped");
    telemetry.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

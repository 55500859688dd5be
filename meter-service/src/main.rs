use anyhow::Result;
use meter_service::{
    api::{self, AppState},
    auth::JwtVerifier,
    config::AppConfig,
    metrics_server, observability,
    store::PgSampleStore,
};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;
    let registry = cfg.registry()?;
    let verifier = JwtVerifier::new(&cfg.jwt_secret()?);

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    // One pool for the life of the process; handlers borrow connections per query.
    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;
    tracing::info!(
        max_connections = cfg.database.max_connections,
        streams = registry.handles().len(),
        "database pool ready"
    );

    let state = AppState {
        store: Arc::new(PgSampleStore::new(pool.clone())),
        registry: Arc::new(registry),
        verifier: Arc::new(verifier),
    };
    let app = api::router(state).layer(api::cors_layer(&cfg.http.cors_allow_origins));

    let addr: SocketAddr = cfg
        .http
        .bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid http.bind_addr: {e}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "meter service listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

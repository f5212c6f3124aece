use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod app;
mod commands;
mod http;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "herald_gateway=info,tower_http=debug".into()),
        )
        .init();

    // load config: explicit path via HERALD_CONFIG > ~/.herald/herald.toml
    let config_path = std::env::var("HERALD_CONFIG").ok();
    let config = herald_core::HeraldConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        herald_core::HeraldConfig::default()
    });
    let tz = config.canonical_tz()?;

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    let store = herald_scheduler::EntryStore::new(db)?;
    info!("database migrations complete");

    let gateway = Arc::new(herald_channels::HttpGateway::new(
        config.delivery.base_url.clone(),
        Duration::from_millis(config.delivery.send_timeout_ms),
    )?);
    let engine = herald_scheduler::SweepEngine::new(
        store.clone(),
        gateway,
        Duration::from_secs(config.scheduler.tick_secs),
        Duration::from_millis(config.delivery.send_timeout_ms),
    );

    // spawn the sweep engine loop in the background
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let engine_task = tokio::spawn(async move { engine.run(shutdown_rx).await });

    let state = Arc::new(app::AppState::new(config, store, tz));
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("Herald gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // signal the sweep engine to stop scheduling further ticks, and wait for
    // it to drain so an in-flight sweep is never torn down mid-dispatch
    let _ = shutdown_tx.send(true);
    engine_task.await?;
    info!("sweep engine stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use fieldbook::auth::AdminGate;
use fieldbook::config::Config;
use fieldbook::http::{self, AppState};
use fieldbook::scoreboard::ScoreboardHub;
use fieldbook::service::Services;
use fieldbook::store::WalStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    fieldbook::observability::init(config.metrics_port)?;

    std::fs::create_dir_all(&config.data_dir)?;
    let store = Arc::new(WalStore::open(&config.wal_path())?);
    tokio::spawn(fieldbook::compactor::run_compactor(store.clone(), config.compact_threshold));

    let admin = Arc::new(AdminGate::new(
        config.admin_username.clone(),
        config.admin_password.clone(),
        &config.jwt_secret,
        chrono::Duration::days(config.token_ttl_days),
    ));
    let state = AppState {
        services: Services::new(store, admin.clone()),
        admin,
        scoreboard: Arc::new(ScoreboardHub::new()),
    };

    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("fieldbook listening on {addr}");
    info!("  data_dir: {}", config.data_dir.display());
    info!("  compact_threshold: {}", config.compact_threshold);
    info!("  metrics: {}", config.metrics_port.map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics")));

    axum::serve(listener, http::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("fieldbook stopped");
    Ok(())
}

/// Resolves on ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("cannot listen for SIGTERM: {e}");
                ctrl_c.await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
    info!("shutdown signal received, draining requests");
}

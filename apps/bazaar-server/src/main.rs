//! `bazaar-server` binary: wires configuration, store, broadcaster and
//! router together and serves until Ctrl+C or SIGTERM.

use anyhow::Context;
use bazaar_db::{Database, DbConfig};
use bazaar_live::{Broadcaster, BroadcasterConfig};
use bazaar_server::{expiry, logging, router, AppState, ServerConfig};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load().context("Invalid configuration")?;
    logging::init_tracing(config.log_json);

    info!(
        addr = %config.socket_addr(),
        database = %config.database_path,
        session_ttl_secs = config.session_ttl_secs,
        "Starting bazaar server"
    );

    let db = Database::new(DbConfig::new(&config.database_path))
        .await
        .context("Failed to open database")?;
    let created = db.categories().add_defaults().await?;
    info!(created, "Default categories ensured");

    let broadcaster = Broadcaster::new(BroadcasterConfig {
        send_timeout: config.broadcast_timeout(),
    })
    .start();
    let expiry_task = expiry::spawn_session_expiry(db.clone(), config.session_sweep_interval());

    let listener = TcpListener::bind(config.socket_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.socket_addr()))?;
    info!(addr = %config.socket_addr(), "Listening");

    let app = router(AppState::new(db.clone(), broadcaster.clone(), config));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    expiry_task.abort();
    if let Err(e) = broadcaster.shutdown().await {
        error!(error = %e, "Broadcaster shutdown failed");
    }
    db.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, starting graceful shutdown...");
}

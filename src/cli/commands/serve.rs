use tokio::net::TcpListener;

use crate::app::{router, AppState};
use crate::config::AppConfig;
use crate::database::DatabaseManager;

pub async fn handle(config: AppConfig) -> anyhow::Result<()> {
    config.validate()?;
    tracing::info!("Starting MagnifiMind API in {:?} mode", config.environment);

    // The pool connects on first use so the server can report 503 from
    // /health while the database is down instead of refusing to start.
    let db = DatabaseManager::connect_lazy(&config.database)?;
    let probe = db.clone();
    tokio::spawn(async move {
        if let Err(e) = probe.health_check().await {
            tracing::warn!("Database not reachable at startup: {}", e);
        }
    });

    let bind_addr = config.bind_address();
    let state = AppState::new(config, db.clone());
    let app = router(state);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    tracing::info!("Server stopped");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}

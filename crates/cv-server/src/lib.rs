//! cv-server: HTTP transport for clipvault.
//!
//! Exposes batch creation, multipart upload, metadata lookup and ranged
//! downloads over Axum, mapping [`cv_core::Error`] to status codes, and
//! runs the server with graceful shutdown.

pub mod context;
pub mod error;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod spool;

use std::net::SocketAddr;

use cv_core::config::Config;

use crate::context::AppContext;

/// Start the clipvault server.
///
/// Opens the database and byte store, binds the configured address and
/// serves until Ctrl+C or SIGTERM.
pub async fn start(config: Config) -> cv_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| cv_core::Error::Validation(format!("Invalid listen address: {e}")))?;

    let ctx = AppContext::open(config).await?;
    let app = router::build_router(ctx);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| cv_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}

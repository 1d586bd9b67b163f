//! OS signal handling.
//!
//! SIGINT (Ctrl+C) and, on unix, SIGTERM trigger a graceful shutdown.

use tokio::signal;

use super::shutdown::{Shutdown, ShutdownSignal};

/// Trigger `shutdown` on the first termination signal.
///
/// Returns early, without triggering, once shutdown has been requested
/// by someone else.
pub async fn watch(shutdown: Shutdown, mut signal: ShutdownSignal) {
    tokio::select! {
        () = terminate_signal() => {
            shutdown.trigger();
        }
        () = signal.recv() => {}
    }
}

async fn terminate_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

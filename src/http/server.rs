//! HTTP server setup and lifecycle.
//!
//! # Responsibilities
//! - Start one task per configured listener, socket first
//! - Serve the composed router on plain TCP, TLS or a Unix socket
//! - Warn about public and debug mode
//! - Stop every listener when one of them ends or a signal arrives

use std::sync::Arc;
use std::time::Duration;

use axum::Router;

use crate::config::PrestConfig;
use crate::lifecycle::{signals, Shutdown, ShutdownSignal, TaskError, TaskGroup};
use crate::net::{Listener, ListenerError, ListenerSpec};

/// How long TLS connections may take to drain after shutdown.
const TLS_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Launches every configured listener against one router.
pub struct ServerLauncher {
    config: Arc<PrestConfig>,
    app: Router,
}

impl ServerLauncher {
    pub fn new(config: Arc<PrestConfig>, app: Router) -> Self {
        Self { config, app }
    }

    /// Listeners this launcher will start, in spawn order.
    pub fn listeners(&self) -> Vec<ListenerSpec> {
        ListenerSpec::from_config(&self.config)
    }

    /// Run until shutdown is triggered or a listener ends.
    ///
    /// A listener failing (bind, stale socket removal, serve) stops the
    /// others gracefully and its error is returned.
    pub async fn run(self, shutdown: Shutdown) -> Result<(), TaskError<ListenerError>> {
        let mut group = TaskGroup::new(shutdown.clone());

        let watcher = group.signal();
        group.spawn("signal-watcher", async move {
            signals::watch(shutdown, watcher).await;
            Ok(())
        });

        for spec in self.listeners() {
            let app = self.app.clone();
            let config = self.config.clone();
            let signal = group.signal();
            group.spawn(spec.name(), async move {
                let listener = spec.bind().await?;
                serve(listener, app, &config, signal).await
            });
        }

        group.join().await
    }
}

/// Serve `app` on a bound listener until `shutdown` resolves.
pub async fn serve(
    listener: Listener,
    app: Router,
    config: &PrestConfig,
    mut shutdown: ShutdownSignal,
) -> Result<(), ListenerError> {
    let addr = listener.local_addr();
    let context_path = config.http.context_path.as_str();
    warn_modes(config);

    let result = match listener {
        Listener::Tcp(listener) => {
            tracing::info!(address = %addr, context_path, "listening on {addr} and serving on {context_path}");
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.recv().await })
                .await
        }
        Listener::Tls { listener, config: tls } => {
            tracing::info!(address = %addr, context_path, tls = true, "listening on {addr} and serving on {context_path}");
            let handle = axum_server::Handle::new();
            let server = axum_server::from_tcp_rustls(listener, tls)
                .handle(handle.clone())
                .serve(app.into_make_service());
            tokio::pin!(server);

            tokio::select! {
                result = &mut server => result,
                () = shutdown.recv() => {
                    handle.graceful_shutdown(Some(TLS_GRACE_PERIOD));
                    server.await
                }
            }
        }
        Listener::Unix { listener, path } => {
            tracing::info!(path = %addr, context_path, "listening on {addr} and serving on {context_path}");
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.recv().await })
                .await;
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove socket file");
            }
            result
        }
    };

    tracing::info!(address = %addr, "Listener stopped");
    result.map_err(|source| ListenerError::Serve { addr, source })
}

fn warn_modes(config: &PrestConfig) {
    for warning in mode_warnings(config) {
        tracing::warn!("{warning}");
    }
}

/// Startup warnings for configurations that should not reach production.
fn mode_warnings(config: &PrestConfig) -> Vec<&'static str> {
    let mut warnings = Vec::new();
    if !config.access.restrict {
        warnings.push("You are running prest in public mode.");
    }
    if config.debug {
        warnings.push("You are running prest in debug mode.");
    }
    warnings
}

//! Listener specifications and binding.
//!
//! # Responsibilities
//! - Derive the listeners to start from configuration
//! - Bind TCP (plain or TLS) and Unix domain socket listeners
//! - Clear stale socket entries before binding
//!
//! Binding happens inside each listener's own task, so a bind failure is
//! reported by that task alone.

use std::path::PathBuf;

use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;
use tokio::net::{TcpListener, UnixListener};

use crate::config::PrestConfig;
use crate::net::tls::TlsPaths;
use crate::net::unix;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove stale socket {}: {source}", .path.display())]
    StaleSocket {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load TLS certificate/key: {0}")]
    Tls(#[source] std::io::Error),

    #[error("server on {addr} failed: {source}")]
    Serve {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// One endpoint to listen on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerSpec {
    Tcp { addr: String, tls: Option<TlsPaths> },
    Unix { path: PathBuf },
}

impl ListenerSpec {
    /// Listeners required by `config`, socket first.
    pub fn from_config(config: &PrestConfig) -> Vec<Self> {
        let mut specs = Vec::with_capacity(2);

        if let Some(path) = &config.http.socket_path {
            specs.push(ListenerSpec::Unix { path: path.clone() });
        }

        let tls = config.https.mode.then(|| TlsPaths {
            cert: config.https.cert.clone(),
            key: config.https.key.clone(),
        });
        specs.push(ListenerSpec::Tcp {
            addr: config.http_addr(),
            tls,
        });

        specs
    }

    /// Task name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            ListenerSpec::Tcp { tls: Some(_), .. } => "https-listener",
            ListenerSpec::Tcp { tls: None, .. } => "http-listener",
            ListenerSpec::Unix { .. } => "socket-listener",
        }
    }

    pub async fn bind(&self) -> Result<Listener, ListenerError> {
        match self {
            ListenerSpec::Tcp { addr, tls: None } => {
                let listener = TcpListener::bind(addr)
                    .await
                    .map_err(|source| bind_error(addr, source))?;
                Ok(Listener::Tcp(listener))
            }
            ListenerSpec::Tcp { addr, tls: Some(paths) } => {
                let config = paths
                    .load()
                    .await
                    .map_err(ListenerError::Tls)?;
                let listener = std::net::TcpListener::bind(addr.as_str())
                    .and_then(|l| l.set_nonblocking(true).map(|()| l))
                    .map_err(|source| bind_error(addr, source))?;
                Ok(Listener::Tls { listener, config })
            }
            ListenerSpec::Unix { path } => {
                unix::remove_stale_socket(path)
                    .await
                    .map_err(|source| ListenerError::StaleSocket {
                        path: path.clone(),
                        source,
                    })?;
                let listener = unix::bind(path)
                    .await
                    .map_err(|source| bind_error(&path.display().to_string(), source))?;
                Ok(Listener::Unix {
                    listener,
                    path: path.clone(),
                })
            }
        }
    }
}

fn bind_error(addr: &str, source: std::io::Error) -> ListenerError {
    ListenerError::Bind {
        addr: addr.to_string(),
        source,
    }
}

/// A bound listener, ready to serve.
pub enum Listener {
    Tcp(TcpListener),
    Tls {
        listener: std::net::TcpListener,
        config: RustlsConfig,
    },
    Unix {
        listener: UnixListener,
        path: PathBuf,
    },
}

impl Listener {
    /// Printable local address: `host:port` or the socket path.
    pub fn local_addr(&self) -> String {
        let addr = match self {
            Listener::Tcp(l) => l.local_addr(),
            Listener::Tls { listener, .. } => listener.local_addr(),
            Listener::Unix { path, .. } => return path.display().to_string(),
        };
        addr.map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn plain_tcp_only_by_default() {
        let specs = ListenerSpec::from_config(&PrestConfig::default());
        assert_eq!(
            specs,
            vec![ListenerSpec::Tcp {
                addr: "0.0.0.0:3000".into(),
                tls: None
            }]
        );
        assert_eq!(specs[0].name(), "http-listener");
    }

    #[test]
    fn socket_listed_before_tls_tcp() {
        let mut config = PrestConfig::default();
        config.http.socket_path = Some("/run/prest.sock".into());
        config.https.mode = true;

        let specs = ListenerSpec::from_config(&config);
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0], ListenerSpec::Unix { path: "/run/prest.sock".into() });
        assert!(matches!(&specs[1], ListenerSpec::Tcp { tls: Some(paths), .. }
            if paths.cert == Path::new("/etc/certs/cert.crt")));
        assert_eq!(specs[1].name(), "https-listener");
    }

    #[tokio::test]
    async fn unix_bind_replaces_stale_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prest.sock");
        std::fs::write(&path, "stale").unwrap();

        let spec = ListenerSpec::Unix { path: path.clone() };
        let first = spec.bind().await.unwrap();
        assert_eq!(first.local_addr(), path.display().to_string());
        drop(first);

        // The socket file of the previous run is still there; binding again must succeed.
        let second = spec.bind().await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn tls_bind_requires_material() {
        let dir = tempfile::tempdir().unwrap();
        let spec = ListenerSpec::Tcp {
            addr: "127.0.0.1:0".into(),
            tls: Some(TlsPaths {
                cert: dir.path().join("missing.crt"),
                key: dir.path().join("missing.key"),
            }),
        };
        assert!(matches!(spec.bind().await, Err(ListenerError::Tls(_))));
    }

    #[tokio::test]
    async fn tcp_bind_conflict_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap().to_string();
        let spec = ListenerSpec::Tcp { addr: addr.clone(), tls: None };
        match spec.bind().await {
            Err(ListenerError::Bind { addr: reported, .. }) => assert_eq!(reported, addr),
            other => panic!("expected bind error, got {:?}", other.map(|l| l.local_addr())),
        }
    }
}

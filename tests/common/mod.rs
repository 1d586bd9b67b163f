//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use prest::adapter::MemoryAdapter;
use prest::config::PrestConfig;
use prest::controllers::AppState;
use prest::http::RouteComposer;
use prest::security::{Authorizer, Denied, TableAccess};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, UnixStream};

/// Counts authorization calls; denies every table in `deny`.
#[derive(Default)]
pub struct CountingAuthorizer {
    pub calls: AtomicUsize,
    pub deny: Vec<String>,
}

impl CountingAuthorizer {
    pub fn denying(tables: &[&str]) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            deny: tables.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Authorizer for CountingAuthorizer {
    fn authorize(&self, access: &TableAccess) -> Result<(), Denied> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.deny.contains(&access.table) {
            return Err(Denied {
                table: access.table.clone(),
            });
        }
        Ok(())
    }
}

/// Memory adapter with `prest.public.users` already present.
pub fn seeded_adapter() -> Arc<MemoryAdapter> {
    Arc::new(MemoryAdapter::new().with_table("prest", "public", "users"))
}

pub fn app_with(config: PrestConfig, authorizer: Arc<dyn Authorizer>) -> Router {
    let state = AppState::new(seeded_adapter(), Arc::new(config));
    RouteComposer::new(state, authorizer).compose().unwrap()
}

/// A port that was free a moment ago.
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Config listening on loopback only.
pub fn loopback_config(port: u16) -> PrestConfig {
    let mut config = PrestConfig::default();
    config.http.host = "127.0.0.1".into();
    config.http.port = port;
    config
}

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

/// Wait until something accepts connections on `port`.
pub async fn wait_for_tcp(port: u16) {
    for _ in 0..100 {
        if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("nothing listening on port {port}");
}

/// Wait until something accepts connections on the socket at `path`.
pub async fn wait_for_socket(path: &Path) {
    for _ in 0..100 {
        if UnixStream::connect(path).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("nothing listening on {}", path.display());
}

/// Send a bodiless HTTP/1.1 request over a Unix socket; returns status and body.
pub async fn unix_request(path: &Path, method: &str, uri: &str) -> (u16, String) {
    exchange(UnixStream::connect(path).await.unwrap(), method, uri).await
}

/// Same as [`unix_request`] over plain TCP on loopback.
pub async fn tcp_request(port: u16, method: &str, uri: &str) -> (u16, String) {
    exchange(TcpStream::connect(("127.0.0.1", port)).await.unwrap(), method, uri).await
}

async fn exchange<S>(mut stream: S, method: &str, uri: &str) -> (u16, String)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = format!("{method} {uri} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let raw = String::from_utf8(raw).unwrap();

    let status = raw
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap();
    let body = raw
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();
    (status, body)
}

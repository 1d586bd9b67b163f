//! Listener lifecycle tests against real sockets.

use std::sync::Arc;
use std::time::Duration;

use prest::config::PrestConfig;
use prest::lifecycle::{Shutdown, TaskError};
use prest::net::ListenerError;
use prest::ServerLauncher;
use tokio::task::JoinHandle;

mod common;
use common::CountingAuthorizer;

fn launch(config: PrestConfig, shutdown: &Shutdown) -> JoinHandle<Result<(), TaskError<ListenerError>>> {
    let app = common::app_with(config.clone(), Arc::new(CountingAuthorizer::default()));
    let launcher = ServerLauncher::new(Arc::new(config), app);
    tokio::spawn(launcher.run(shutdown.clone()))
}

async fn stop(shutdown: Shutdown, handle: JoinHandle<Result<(), TaskError<ListenerError>>>) {
    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(15), handle)
        .await
        .expect("launcher did not stop")
        .unwrap();
    assert!(result.is_ok(), "launcher failed: {result:?}");
}

#[tokio::test]
async fn plain_mode_serves_http_on_the_port() {
    let port = common::free_port();
    let shutdown = Shutdown::new();
    let handle = launch(common::loopback_config(port), &shutdown);
    common::wait_for_tcp(port).await;

    let res = reqwest::get(format!("http://127.0.0.1:{port}/databases")).await.unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, serde_json::json!([{ "datname": "prest" }]));

    stop(shutdown, handle).await;
}

#[tokio::test]
async fn https_mode_loads_cert_and_key() {
    let port = common::free_port();
    let mut config = common::loopback_config(port);
    config.https.mode = true;
    config.https.cert = common::fixture("localhost.crt");
    config.https.key = common::fixture("localhost.key");

    let shutdown = Shutdown::new();
    let handle = launch(config, &shutdown);
    common::wait_for_tcp(port).await;

    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()
        .unwrap();
    let res = client
        .get(format!("https://127.0.0.1:{port}/tables"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    // Plain HTTP is not spoken on a TLS port.
    assert!(client
        .get(format!("http://127.0.0.1:{port}/tables"))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .is_err());

    drop(client);
    stop(shutdown, handle).await;
}

#[tokio::test]
async fn https_mode_without_key_material_fails() {
    let port = common::free_port();
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::loopback_config(port);
    config.https.mode = true;
    config.https.cert = dir.path().join("missing.crt");
    config.https.key = dir.path().join("missing.key");

    let result = launch(config, &Shutdown::new()).await.unwrap();
    assert!(matches!(
        result,
        Err(TaskError::Failed {
            name: "https-listener",
            source: ListenerError::Tls(_)
        })
    ));
}

#[tokio::test]
async fn socket_and_port_answer_identically() {
    let port = common::free_port();
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("prest.sock");
    let mut config = common::loopback_config(port);
    config.http.socket_path = Some(socket.clone());

    let shutdown = Shutdown::new();
    let handle = launch(config, &shutdown);
    common::wait_for_tcp(port).await;
    common::wait_for_socket(&socket).await;

    for uri in ["/databases", "/prest/public", "/prest/public/users", "/missing/a/b/c"] {
        let over_socket = common::unix_request(&socket, "GET", uri).await;
        let over_tcp = common::tcp_request(port, "GET", uri).await;
        assert_eq!(over_socket, over_tcp, "GET {uri}");
    }

    stop(shutdown, handle).await;
    assert!(!socket.exists(), "socket file left behind");
}

#[tokio::test]
async fn stale_socket_is_replaced_on_every_start() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("run/prest.sock");
    std::fs::create_dir_all(socket.parent().unwrap()).unwrap();
    std::fs::write(&socket, "stale").unwrap();

    for _ in 0..3 {
        let port = common::free_port();
        let mut config = common::loopback_config(port);
        config.http.socket_path = Some(socket.clone());

        let shutdown = Shutdown::new();
        let handle = launch(config, &shutdown);
        common::wait_for_socket(&socket).await;

        let (status, _) = common::unix_request(&socket, "GET", "/schemas").await;
        assert_eq!(status, 200);

        stop(shutdown, handle).await;
        // Leave something behind for the next start to clear.
        std::fs::write(&socket, "stale").unwrap();
    }
}

#[tokio::test]
async fn tcp_bind_failure_stops_the_socket_listener() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("prest.sock");
    let mut config = common::loopback_config(port);
    config.http.socket_path = Some(socket.clone());

    let result = tokio::time::timeout(Duration::from_secs(15), launch(config, &Shutdown::new()))
        .await
        .expect("launcher did not stop")
        .unwrap();

    match result {
        Err(TaskError::Failed {
            name: "http-listener",
            source: ListenerError::Bind { addr, .. },
        }) => assert_eq!(addr, format!("127.0.0.1:{port}")),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(!socket.exists());
    drop(occupied);
}

#[tokio::test]
async fn default_adapter_is_served_when_none_is_configured() {
    let port = common::free_port();
    let config = common::loopback_config(port);
    assert!(config.adapter.is_none());

    let server = tokio::spawn(prest::cli::serve(Arc::new(config)));
    common::wait_for_tcp(port).await;

    let res = reqwest::get(format!("http://127.0.0.1:{port}/databases")).await.unwrap();
    assert_eq!(res.status(), 200);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, serde_json::json!([]));

    server.abort();
}

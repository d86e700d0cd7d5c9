//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use formrelay::{DocumentStore, Error, Relay, RelayConfig};
use http::{HeaderMap, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const INDEX: &str = "<h1>index</h1>";
pub const MESSAGE: &str = "<form method=post></form>";
pub const NOT_FOUND: &str = "<h1>not found</h1>";
pub const STYLE: &str = "body { margin: 0 }";

/// A temp dir laid out as `<tmp>/site/...` plus `<tmp>/secret.txt`, which
/// sits outside the content directory.
pub struct Content {
    pub dir: TempDir,
}

impl Content {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let site = dir.path().join("site");
        fs::create_dir_all(site.join("css")).unwrap();
        fs::create_dir_all(site.join("empty")).unwrap();
        fs::write(site.join("index.html"), INDEX).unwrap();
        fs::write(site.join("message.html"), MESSAGE).unwrap();
        fs::write(site.join("error.html"), NOT_FOUND).unwrap();
        fs::write(site.join("css").join("style.css"), STYLE).unwrap();
        fs::write(site.join("notes.unknownext"), "plain notes").unwrap();
        fs::write(site.join("logo.png"), [0x89, b'P', b'N', b'G', 0, 0xff]).unwrap();
        fs::write(site.join("two words.txt"), "spaced").unwrap();
        fs::write(dir.path().join("secret.txt"), "top secret").unwrap();
        Self { dir }
    }

    pub fn site(&self) -> std::path::PathBuf {
        self.dir.path().join("site")
    }
}

pub fn config(base_dir: &Path) -> RelayConfig {
    RelayConfig {
        base_dir: base_dir.to_path_buf(),
        http_host: [127, 0, 0, 1].into(),
        http_port: 0,
        socket_host: [127, 0, 0, 1].into(),
        socket_port: 0,
        ..RelayConfig::default()
    }
}

pub struct RunningRelay {
    pub http: SocketAddr,
    pub socket: SocketAddr,
    shutdown: CancellationToken,
    handle: JoinHandle<Result<(), Error>>,
}

impl RunningRelay {
    pub async fn start<S: DocumentStore>(config: &RelayConfig, store: S) -> Self {
        let relay = Relay::bind(config, store).await.unwrap();
        let http = relay.http_addr();
        let socket = relay.socket_addr();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(relay.run(shutdown.clone()));
        Self { http, socket, shutdown, handle }
    }

    pub async fn stop(self) {
        self.shutdown.cancel();
        self.handle.await.unwrap().unwrap();
    }
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub async fn send(addr: SocketAddr, method: &str, path: &str, body: &[u8]) -> Reply {
    let client = Client::builder(TokioExecutor::new()).build_http::<Full<Bytes>>();
    let req = http::Request::builder()
        .method(method)
        .uri(format!("http://{addr}{path}"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Full::new(Bytes::copy_from_slice(body)))
        .unwrap();

    let res = client.request(req).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let body = res.into_body().collect().await.unwrap().to_bytes();
    Reply { status, headers, body }
}

pub async fn get(addr: SocketAddr, path: &str) -> Reply {
    send(addr, "GET", path, b"").await
}

pub async fn post(addr: SocketAddr, path: &str, body: &[u8]) -> Reply {
    send(addr, "POST", path, body).await
}

/// Polls `check` every 10 ms for up to 2 s.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

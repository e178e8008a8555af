//! Shared stub upstreams and proxy harness for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Path},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use upstream_proxy::config::ProxyConfig;
use upstream_proxy::http::HttpServer;
use upstream_proxy::lifecycle::Shutdown;

/// Serve `router` on an ephemeral local port.
pub async fn spawn_upstream(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Upstream that reports what it received as JSON.
pub fn echo_router() -> Router {
    Router::new().fallback(echo)
}

async fn echo(
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Json<serde_json::Value> {
    let headers: Vec<(String, String)> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    Json(serde_json::json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "headers": headers,
        "body_len": body.len(),
    }))
}

/// Upstream answering `/status/{code}` with that status and the request body.
pub fn status_router() -> Router {
    Router::new()
        .route("/status/{code}", any(with_status))
        .layer(DefaultBodyLimit::disable())
}

async fn with_status(Path(code): Path<u16>, body: axum::body::Bytes) -> Response {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::OK);
    let mut response = (status, Body::from(body)).into_response();
    if status.is_redirection() {
        response
            .headers_mut()
            .insert("location", "/elsewhere".parse().unwrap());
    }
    response
}

/// Upstream answering every request with a fixed status.
pub fn fixed_status_router(status: StatusCode) -> Router {
    Router::new().fallback(move || async move { (status, "fixed") })
}

/// Raw TCP server that accepts connections and never answers.
pub async fn spawn_hanging_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// Raw TCP upstream streaming chunks forever. The returned receiver fires
/// once a write to the proxy fails, i.e. the proxy closed the connection.
pub async fn spawn_endless_stream_upstream() -> (SocketAddr, oneshot::Receiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (closed_tx, closed_rx) = oneshot::channel();

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        read_head(&mut socket).await;

        let head = concat!(
            "HTTP/1.1 200 OK\r\n",
            "Content-Type: text/event-stream\r\n",
            "Transfer-Encoding: chunked\r\n\r\n",
        );
        if socket.write_all(head.as_bytes()).await.is_err() {
            let _ = closed_tx.send(());
            return;
        }
        let chunk = format!("{:x}\r\n{}\r\n", 1024, "x".repeat(1024));
        loop {
            if socket.write_all(chunk.as_bytes()).await.is_err() {
                let _ = closed_tx.send(());
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    });

    (addr, closed_rx)
}

/// Upstream answering with an encoded-looking body. The body is the
/// `accept-encoding` value it received, so tests can see what was sent.
pub fn encoded_router() -> Router {
    Router::new().fallback(|headers: HeaderMap| async move {
        let received = headers
            .get("accept-encoding")
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .unwrap_or_default();
        ([("content-encoding", "x-test")], received)
    })
}

/// Raw TCP upstream that sends `reply` after the request head, then closes.
pub async fn spawn_scripted_upstream(reply: &'static [u8]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                read_head(&mut socket).await;
                let _ = socket.write_all(reply).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

/// Read until the end of an HTTP request head.
pub async fn read_head(socket: &mut TcpStream) -> Vec<u8> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    head
}

/// A proxy running in the background of a test.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<std::io::Result<()>>,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn stop(self) {
        self.shutdown
            .trigger(upstream_proxy::lifecycle::ShutdownReason::Signal);
        let _ = tokio::time::timeout(Duration::from_secs(5), self.handle).await;
    }
}

/// Proxy config pointed at `upstream` with no supervisor and no admin listener.
pub fn proxy_config(upstream: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream.base_url = format!("http://{upstream}");
    config.supervisor.enabled = false;
    config.admin.enabled = false;
    config.timeouts.drain_secs = 1;
    config
}

/// Start a proxy in front of `upstream`.
pub async fn start_proxy(upstream: SocketAddr) -> TestProxy {
    start_proxy_with(proxy_config(upstream)).await
}

pub async fn start_proxy_with(config: ProxyConfig) -> TestProxy {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config).unwrap();

    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));
    TestProxy {
        addr,
        shutdown,
        handle,
    }
}

/// HTTP client that never follows redirects.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap()
}

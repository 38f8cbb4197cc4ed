//! End-to-end: real server on 127.0.0.1:0, raw HTTP/1.1 over TCP.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use probe_demo::{AppConfig, AppState, MetricReadError, MetricsSource, Server, app};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Fixed {
    memory: Option<f64>,
    disk: Option<f64>,
    delay: Duration,
}

impl Fixed {
    fn new(memory: Option<f64>, disk: Option<f64>) -> Self {
        Self { memory, disk, delay: Duration::ZERO }
    }
}

impl MetricsSource for Fixed {
    fn memory_percent(&self) -> Result<f64, MetricReadError> {
        std::thread::sleep(self.delay);
        self.memory.ok_or_else(|| MetricReadError::Unavailable("meminfo unreadable".into()))
    }

    fn disk_percent(&self, mount: &Path) -> Result<f64, MetricReadError> {
        self.disk.ok_or_else(|| MetricReadError::MountNotFound(mount.display().to_string()))
    }
}

struct Running {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), probe_demo::Error>>,
}

impl Running {
    async fn shutdown(self) {
        let _ = self.stop.send(());
        self.handle.await.unwrap().unwrap();
    }
}

async fn start(config: AppConfig, metrics: Fixed) -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();

    let router = app::router(AppState::new(config, metrics));
    let handle = tokio::spawn(
        Server::from_listener(listener).serve_with_shutdown(router, async {
            let _ = stopped.await;
        }),
    );
    Running { addr, stop, handle }
}

struct Reply {
    status: u16,
    head: String,
    body: String,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }

    fn has_header(&self, line: &str) -> bool {
        self.head.lines().any(|l| l.eq_ignore_ascii_case(line))
    }
}

async fn get(addr: SocketAddr, path: &str) -> Reply {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let raw = String::from_utf8(raw).unwrap();

    let (head, body) = raw.split_once("\r\n\r\n").unwrap();
    let status = head.split_whitespace().nth(1).unwrap().parse().unwrap();
    Reply { status, head: head.to_owned(), body: body.to_owned() }
}

#[tokio::test]
async fn readiness_scenarios() {
    let healthy = start(AppConfig::default(), Fixed::new(Some(50.0), Some(50.0))).await;
    let reply = get(healthy.addr, "/healthz/ready").await;
    assert_eq!(reply.status, 200);
    assert!(reply.has_header("content-type: application/json"));
    assert_eq!(
        reply.json(),
        json!({"status": "ready", "checks": {"memory": "ok: 50.0%", "disk": "ok: 50.0%", "flask": "ok"}})
    );
    healthy.shutdown().await;

    let pressured = start(AppConfig::default(), Fixed::new(Some(95.0), Some(50.0))).await;
    let reply = get(pressured.addr, "/healthz/ready").await;
    assert_eq!(reply.status, 503);
    assert_eq!(reply.json()["status"], "not ready");
    assert_eq!(reply.json()["checks"]["memory"], "critical: 95.0%");
    pressured.shutdown().await;

    let no_disk = start(AppConfig::default(), Fixed::new(Some(50.0), None)).await;
    let reply = get(no_disk.addr, "/healthz/ready").await;
    assert_eq!(reply.status, 200);
    assert!(reply.json()["checks"]["disk"].as_str().unwrap().starts_with("error:"));
    no_disk.shutdown().await;
}

#[tokio::test]
async fn legacy_endpoint_mirrors_readiness() {
    let server = start(AppConfig::default(), Fixed::new(None, Some(50.0))).await;

    let ready = get(server.addr, "/healthz/ready").await;
    let legacy = get(server.addr, "/healthz").await;
    assert_eq!(legacy.status, 503);
    assert_eq!(legacy.status, ready.status);
    assert_eq!(legacy.json(), ready.json());
    assert_eq!(legacy.json()["checks"]["memory"], "error: meminfo unreadable");

    server.shutdown().await;
}

#[tokio::test]
async fn liveness_ignores_metrics() {
    let server = start(AppConfig::default(), Fixed::new(None, None)).await;

    let reply = get(server.addr, "/healthz/live").await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.json(), json!({"status": "ok", "check": "liveness"}));

    server.shutdown().await;
}

#[tokio::test]
async fn slow_memory_read_is_bounded() {
    let config = AppConfig { metrics_timeout_ms: 50, ..AppConfig::default() };
    let metrics = Fixed { delay: Duration::from_millis(400), ..Fixed::new(Some(10.0), Some(10.0)) };
    let server = start(config, metrics).await;

    let reply = get(server.addr, "/healthz/ready").await;
    assert_eq!(reply.status, 503);
    assert_eq!(reply.json()["checks"]["memory"], "error: read timed out after 50ms");

    server.shutdown().await;
}

#[tokio::test]
async fn landing_page_and_not_found() {
    let config = AppConfig {
        app_name: "Checkout".to_owned(),
        app_version: "v9.9.9".to_owned(),
        ..AppConfig::default()
    };
    let server = start(config, Fixed::new(Some(1.0), Some(1.0))).await;

    let page = get(server.addr, "/").await;
    assert_eq!(page.status, 200);
    assert!(page.has_header("content-type: text/html; charset=utf-8"));
    assert!(page.body.contains("Checkout"));
    assert!(page.body.contains("Current Version:"));
    assert!(page.body.contains(r#"class="version">v9.9.9<"#));

    let missing = get(server.addr, "/metrics").await;
    assert_eq!(missing.status, 404);
    assert_eq!(missing.json(), json!({"error": "Not found", "status": 404}));

    server.shutdown().await;
}

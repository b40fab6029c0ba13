//! Integration tests for the admin server.
//!
//! Tests health check, readiness, metrics and stats endpoints.

use cache_core::{GroupRegistry, MIB, Value};
use server::admin::{self, AdminHandle, AdminServerConfig};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Get an available port for testing.
fn get_available_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn wait_for_server(addr: SocketAddr, timeout: Duration) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if TcpStream::connect_timeout(&addr, Duration::from_millis(50)).is_ok() {
            return true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    false
}

/// Start just the admin server (without the cache server).
fn start_admin_server() -> (SocketAddr, Arc<AtomicBool>, Arc<GroupRegistry>, AdminHandle) {
    let addr: SocketAddr = format!("127.0.0.1:{}", get_available_port())
        .parse()
        .unwrap();
    let shutdown = Arc::new(AtomicBool::new(false));
    let registry = Arc::new(GroupRegistry::new(16));

    let handle = admin::start(AdminServerConfig {
        address: addr,
        shutdown: shutdown.clone(),
        registry: registry.clone(),
    })
    .unwrap();
    assert!(wait_for_server(addr, Duration::from_secs(5)));

    (addr, shutdown, registry, handle)
}

/// Send an HTTP GET request and return the response.
fn http_get(addr: SocketAddr, path: &str) -> Result<(u16, String), std::io::Error> {
    let mut stream = TcpStream::connect(addr)?;
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    stream.set_write_timeout(Some(Duration::from_secs(5)))?;

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, addr
    );
    stream.write_all(request.as_bytes())?;

    let mut response = String::new();
    stream.read_to_string(&mut response)?;

    // Parse HTTP response
    let status_line = response.lines().next().unwrap_or("");
    let status_code: u16 = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    // Find body (after empty line)
    let body = response.split("\r\n\r\n").nth(1).unwrap_or("").to_string();

    Ok((status_code, body))
}

#[test]
fn test_health_endpoint() {
    let (addr, _, _, handle) = start_admin_server();

    let (status, body) = http_get(addr, "/health").expect("Failed to connect to admin server");
    assert_eq!(status, 200, "Health check should return 200");
    assert_eq!(body.trim(), "OK");

    handle.shutdown();
}

#[test]
fn test_ready_endpoint_tracks_shutdown() {
    let (addr, shutdown, _, handle) = start_admin_server();

    let (status, body) = http_get(addr, "/ready").expect("Failed to connect to admin server");
    assert_eq!(status, 200, "Ready check should return 200 when running");
    assert_eq!(body.trim(), "OK");

    shutdown.store(true, Ordering::SeqCst);
    let (status, _) = http_get(addr, "/ready").expect("Failed to connect to admin server");
    assert_eq!(status, 503, "Ready check should return 503 during shutdown");

    handle.shutdown();
}

#[test]
fn test_metrics_endpoint() {
    let (addr, _, _, handle) = start_admin_server();
    server::metrics::CONNECTIONS_ACCEPTED.increment();

    let (status, body) = http_get(addr, "/metrics").expect("Failed to connect to admin server");
    assert_eq!(status, 200, "Metrics endpoint should return 200");
    assert!(body.contains("# TYPE connections_accepted counter"));

    handle.shutdown();
}

#[test]
fn test_stats_endpoint() {
    let (addr, _, registry, handle) = start_admin_server();
    registry.create("test", 16 * MIB).unwrap();
    registry
        .get("test")
        .unwrap()
        .set("key", Value::from("value"))
        .unwrap();

    let (status, body) = http_get(addr, "/stats").expect("Failed to connect to admin server");
    assert_eq!(status, 200);
    assert!(body.contains(r#""name":"test""#), "unexpected body: {body}");
    assert!(body.contains(r#""used_bytes":8"#), "unexpected body: {body}");
    assert!(body.contains(r#""count":1"#), "unexpected body: {body}");

    handle.shutdown();
}

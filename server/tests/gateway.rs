//! Integration tests for the HTTP gateway.

use cache_core::{GroupRegistry, MIB};
use server::gateway::{self, GatewayHandle, GatewayServerConfig};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
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

fn start_gateway() -> (SocketAddr, Arc<GroupRegistry>, GatewayHandle) {
    let addr: SocketAddr = format!("127.0.0.1:{}", get_available_port())
        .parse()
        .unwrap();
    let registry = Arc::new(GroupRegistry::new(16));
    registry.create("test", 16 * MIB).unwrap();

    let handle = gateway::start(GatewayServerConfig {
        address: addr,
        base_path: "/shoal/".to_string(),
        registry: registry.clone(),
    })
    .unwrap();
    assert!(wait_for_server(addr, Duration::from_secs(5)));

    (addr, registry, handle)
}

/// Send a raw HTTP request and return the status code and body.
fn http_request(addr: SocketAddr, request: String) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    stream.write_all(request.as_bytes()).unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();

    let status = response
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let body = response.split("\r\n\r\n").nth(1).unwrap_or("").to_string();
    (status, body)
}

fn http_get(addr: SocketAddr, path: &str) -> (u16, String) {
    http_request(
        addr,
        format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n"),
    )
}

fn http_post_form(addr: SocketAddr, path: &str, form: &str) -> (u16, String) {
    http_request(
        addr,
        format!(
            "POST {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\
             Content-Type: application/x-www-form-urlencoded\r\n\
             Content-Length: {}\r\n\r\n{form}",
            form.len()
        ),
    )
}

#[test]
fn test_set_and_get_over_http() {
    let (addr, _registry, handle) = start_gateway();

    let (status, body) = http_post_form(addr, "/shoal/set", "group=test&key=k1&value=hello");
    assert_eq!(status, 200);
    assert_eq!(body, "set key success");

    let (status, body) = http_get(addr, "/shoal/get?group=test&key=k1");
    assert_eq!(status, 200);
    assert_eq!(body, "hello");

    let (status, body) = http_get(addr, "/shoal/del?group=test&key=k1");
    assert_eq!(status, 200);
    assert_eq!(body, "del key success");

    let (status, _) = http_get(addr, "/shoal/get?group=test&key=k1");
    assert_eq!(status, 404);

    handle.shutdown();
}

#[test]
fn test_group_management_over_http() {
    let (addr, registry, handle) = start_gateway();

    let (status, body) = http_post_form(addr, "/shoal/new_group", "name=fresh&capacity=2");
    assert_eq!(status, 200);
    assert_eq!(body, "\"success create group:fresh\"");
    assert_eq!(registry.get("fresh").unwrap().capacity(), 2 * MIB);

    let (status, _) = http_post_form(addr, "/shoal/new_group", "name=fresh&capacity=2");
    assert_eq!(status, 409);

    let (status, body) = http_get(addr, "/shoal/new_group?name=other&capacity=abc");
    assert_eq!(status, 400);
    assert_eq!(body, "capacity must be a number");

    let (status, body) = http_get(addr, "/shoal/list_group");
    assert_eq!(status, 200);
    assert_eq!(body, r#"["fresh","test"]"#);

    let (status, _) = http_get(addr, "/shoal/del_group?group=fresh");
    assert_eq!(status, 200);
    assert!(registry.get("fresh").is_err());

    handle.shutdown();
}

#[test]
fn test_unknown_action_and_path() {
    let (addr, _registry, handle) = start_gateway();

    let (status, body) = http_get(addr, "/shoal/flush");
    assert_eq!(status, 400);
    assert_eq!(body, "not supported action: flush");

    let (status, _) = http_get(addr, "/elsewhere/get");
    assert_eq!(status, 404);

    handle.shutdown();
}

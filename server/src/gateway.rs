//! HTTP gateway onto the group registry.
//!
//! Serves `GET|POST {base_path}{action}` with form parameters taken from the
//! query string (GET) or an urlencoded body (POST). Actions:
//!
//! | action | parameters | success body |
//! |---|---|---|
//! | `get` | `group`, `key` | value bytes |
//! | `set` | `group`, `key`, `value` | `set key success` |
//! | `del` | `group`, `key` | `del key success` |
//! | `new_group` | `name`, `capacity` (MiB) | JSON string |
//! | `del_group` | `group` | `del group success` |
//! | `list_group` | none | JSON array of names |

use crate::metrics::{HITS, MISSES, REQUEST_ERRORS, request_counter};
use axum::extract::{Form, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::get};
use bytes::Bytes;
use cache_core::{CacheError, GroupRegistry, Value, parse_capacity_mb};
use protocol_frame::Command;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;

/// Handle returned by [`start`] for shutdown coordination.
pub struct GatewayHandle {
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
    join_handle: std::thread::JoinHandle<()>,
}

impl GatewayHandle {
    /// Signal the gateway to shut down and wait for it to finish.
    pub fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.join_handle.join();
    }
}

/// Runtime configuration for the gateway.
pub struct GatewayServerConfig {
    pub address: SocketAddr,
    /// Prefix every action is served under, e.g. `/shoal/`.
    pub base_path: String,
    pub registry: Arc<GroupRegistry>,
}

/// Form parameters accepted by every action; unused ones are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GatewayParams {
    pub group: String,
    pub key: String,
    pub value: String,
    pub name: String,
    pub capacity: String,
}

/// Successful gateway reply.
#[derive(Debug, PartialEq)]
pub enum Reply {
    Text(&'static str),
    Octets(Bytes),
    JsonList(Vec<String>),
    JsonText(String),
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Text(text) => (StatusCode::OK, text).into_response(),
            Reply::Octets(bytes) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/octet-stream")],
                bytes,
            )
                .into_response(),
            Reply::JsonList(list) => Json(list).into_response(),
            Reply::JsonText(text) => Json(text).into_response(),
        }
    }
}

/// Failed gateway request: a status code and the error text.
#[derive(Debug, PartialEq)]
pub struct GatewayError {
    pub status: StatusCode,
    pub message: String,
}

impl GatewayError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<CacheError> for GatewayError {
    fn from(e: CacheError) -> Self {
        let status = match &e {
            CacheError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) | CacheError::GroupNotFound(_) => StatusCode::NOT_FOUND,
            CacheError::AlreadyExists(_) => StatusCode::CONFLICT,
            CacheError::Oversize { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

/// Run one gateway action against the registry.
pub fn dispatch(
    action: &str,
    params: &GatewayParams,
    registry: &GroupRegistry,
) -> Result<Reply, GatewayError> {
    let command = match Command::parse(action) {
        Some(
            command @ (Command::Get
            | Command::Set
            | Command::Del
            | Command::NewGroup
            | Command::DelGroup
            | Command::ListGroup),
        ) => command,
        _ => {
            return Err(GatewayError::bad_request(format!(
                "not supported action: {action}"
            )));
        }
    };
    request_counter(command).increment();

    let result = run_action(command, params, registry);
    if result.is_err() {
        REQUEST_ERRORS.increment();
    }
    result
}

fn run_action(
    command: Command,
    params: &GatewayParams,
    registry: &GroupRegistry,
) -> Result<Reply, GatewayError> {
    match command {
        Command::Get => match registry.get(&params.group)?.get(&params.key) {
            Ok(value) => {
                HITS.increment();
                Ok(Reply::Octets(value.into_bytes()))
            }
            Err(e) => {
                if matches!(e, CacheError::NotFound(_)) {
                    MISSES.increment();
                }
                Err(e.into())
            }
        },
        Command::Set => {
            let value = Value::copy_from_slice(params.value.as_bytes());
            registry.get(&params.group)?.set(&params.key, value)?;
            Ok(Reply::Text("set key success"))
        }
        Command::Del => {
            registry.get(&params.group)?.delete(&params.key)?;
            Ok(Reply::Text("del key success"))
        }
        Command::NewGroup => {
            let capacity = parse_capacity_mb(&params.capacity)
                .map_err(|_| GatewayError::bad_request("capacity must be a number"))?;
            registry.create(&params.name, capacity)?;
            Ok(Reply::JsonText(format!("success create group:{}", params.name)))
        }
        Command::DelGroup => {
            registry.delete(&params.group)?;
            Ok(Reply::Text("del group success"))
        }
        _ => Ok(Reply::JsonList(registry.list())),
    }
}

#[derive(Clone)]
struct GatewayState {
    registry: Arc<GroupRegistry>,
}

async fn action_handler(
    State(state): State<GatewayState>,
    Path(action): Path<String>,
    Form(params): Form<GatewayParams>,
) -> Result<Reply, GatewayError> {
    dispatch(&action, &params, &state.registry)
}

/// Build the gateway router with actions under `base_path`.
pub fn router(base_path: &str, registry: Arc<GroupRegistry>) -> Router {
    let route = format!("{base_path}{{action}}");
    Router::new()
        .route(&route, get(action_handler).post(action_handler))
        .with_state(GatewayState { registry })
}

/// Start the gateway on a dedicated thread with its own current-thread
/// Tokio runtime.
pub fn start(config: GatewayServerConfig) -> std::io::Result<GatewayHandle> {
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let address = config.address;
    let app = router(&config.base_path, config.registry);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let join_handle = std::thread::Builder::new()
        .name("gateway".to_string())
        .spawn(move || {
            rt.block_on(async move {
                let listener = match tokio::net::TcpListener::bind(address).await {
                    Ok(l) => l,
                    Err(e) => {
                        tracing::error!(error = %e, address = %address, "Failed to bind gateway");
                        return;
                    }
                };

                tracing::info!(address = %address, "HTTP gateway listening");

                tokio::select! {
                    result = axum::serve(listener, app) => {
                        if let Err(e) = result {
                            tracing::error!(error = %e, "Gateway error");
                        }
                    }
                    _ = shutdown_rx => {
                        tracing::debug!("Gateway received shutdown signal");
                    }
                }
            });
        })?;

    Ok(GatewayHandle {
        shutdown_tx,
        join_handle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cache_core::MIB;

    fn registry() -> GroupRegistry {
        let registry = GroupRegistry::new(16);
        registry.create("test", 16 * MIB).unwrap();
        registry
    }

    fn params(pairs: &[(&str, &str)]) -> GatewayParams {
        let mut params = GatewayParams::default();
        for (k, v) in pairs {
            let v = v.to_string();
            match *k {
                "group" => params.group = v,
                "key" => params.key = v,
                "value" => params.value = v,
                "name" => params.name = v,
                "capacity" => params.capacity = v,
                _ => unreachable!(),
            }
        }
        params
    }

    #[test]
    fn test_set_get_del() {
        let registry = registry();
        let set = params(&[("group", "test"), ("key", "k"), ("value", "v")]);
        assert_eq!(
            dispatch("set", &set, &registry),
            Ok(Reply::Text("set key success"))
        );

        let get = params(&[("group", "test"), ("key", "k")]);
        assert_eq!(
            dispatch("get", &get, &registry),
            Ok(Reply::Octets(Bytes::from_static(b"v")))
        );
        assert_eq!(
            dispatch("del", &get, &registry),
            Ok(Reply::Text("del key success"))
        );

        let err = dispatch("get", &get, &registry).unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "key not found: k");
    }

    #[test]
    fn test_status_mapping() {
        let registry = registry();

        let missing_group = params(&[("group", "nope"), ("key", "k")]);
        let err = dispatch("get", &missing_group, &registry).unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let empty_key = params(&[("group", "test")]);
        let err = dispatch("get", &empty_key, &registry).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let dup = params(&[("name", "test"), ("capacity", "1")]);
        let err = dispatch("new_group", &dup, &registry).unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let tiny = GroupRegistry::new(1);
        tiny.create("tiny", MIB).unwrap();
        let big = "x".repeat(MIB + 1);
        let oversize = params(&[("group", "tiny"), ("key", "k"), ("value", &big)]);
        let err = dispatch("set", &oversize, &tiny).unwrap_err();
        assert_eq!(err.status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_group_actions() {
        let registry = registry();
        let create = params(&[("name", "fresh"), ("capacity", "2")]);
        assert_eq!(
            dispatch("new_group", &create, &registry),
            Ok(Reply::JsonText("success create group:fresh".to_string()))
        );
        assert_eq!(registry.get("fresh").unwrap().capacity(), 2 * MIB);

        assert_eq!(
            dispatch("list_group", &GatewayParams::default(), &registry),
            Ok(Reply::JsonList(vec!["fresh".to_string(), "test".to_string()]))
        );

        let drop = params(&[("group", "fresh")]);
        assert_eq!(
            dispatch("del_group", &drop, &registry),
            Ok(Reply::Text("del group success"))
        );
        assert!(registry.get("fresh").is_err());
    }

    #[test]
    fn test_bad_capacity() {
        let registry = registry();
        for capacity in ["", "lots", "0", "-1"] {
            let p = params(&[("name", "g"), ("capacity", capacity)]);
            let err = dispatch("new_group", &p, &registry).unwrap_err();
            assert_eq!(err.status, StatusCode::BAD_REQUEST);
            assert_eq!(err.message, "capacity must be a number");
        }
    }

    #[test]
    fn test_unknown_action() {
        let registry = registry();
        let err = dispatch("flush", &GatewayParams::default(), &registry).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "not supported action: flush");

        // Wire-only commands are not exposed over HTTP.
        let err = dispatch("keys", &GatewayParams::default(), &registry).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}

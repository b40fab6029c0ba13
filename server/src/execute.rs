//! Request execution against the group registry.
//!
//! Each decoded request maps to one registry or group operation; failures
//! become coded responses and never close the connection.

use crate::metrics::{HITS, MISSES, REQUEST_ERRORS, request_counter};
use bytes::Bytes;
use cache_core::{CacheError, GroupRegistry, Value, parse_capacity_mb};
use hash_ring::HashRing;
use protocol_frame::{Command, Request, Response};
use std::sync::Arc;
use tracing::debug;

/// Shared state every request executes against.
#[derive(Clone)]
pub struct ServerContext {
    pub registry: Arc<GroupRegistry>,
    /// Cluster ring, absent when no nodes are configured.
    pub ring: Option<Arc<HashRing>>,
}

impl ServerContext {
    pub fn new(registry: Arc<GroupRegistry>) -> Self {
        Self {
            registry,
            ring: None,
        }
    }

    pub fn with_ring(mut self, ring: HashRing) -> Self {
        self.ring = Some(Arc::new(ring));
        self
    }
}

/// Format names the way list responses present them: `[a b c]`.
pub fn format_list(items: &[String]) -> String {
    format!("[{}]", items.join(" "))
}

/// Execute a single request.
pub fn execute(request: &Request, ctx: &ServerContext) -> Response {
    let response = match request.kind() {
        Some(command) => {
            request_counter(command).increment();
            execute_command(command, request, ctx)
        }
        None => Response::bad_request(format!("unknown command: {}", request.command)),
    };
    if !response.is_ok() {
        REQUEST_ERRORS.increment();
        debug!(
            command = %request.command,
            group = %request.group,
            code = %response.code,
            "request failed"
        );
    }
    response
}

fn execute_command(command: Command, request: &Request, ctx: &ServerContext) -> Response {
    let registry = &ctx.registry;
    match command {
        Command::Set => {
            let result = registry.get(&request.group).and_then(|group| {
                group.set(&request.key, Value::copy_from_slice(&request.value))
            });
            match result {
                Ok(_) => Response::ok(),
                Err(e) => Response::error(format!("failed to set key: {e}")),
            }
        }
        Command::Get => match registry.get(&request.group).and_then(|g| g.get(&request.key)) {
            Ok(value) => {
                HITS.increment();
                Response::ok_with(value.into_bytes())
            }
            Err(e) => {
                if matches!(e, CacheError::NotFound(_)) {
                    MISSES.increment();
                }
                Response::error(format!("failed to get key: {e}"))
            }
        },
        Command::Del => {
            match registry
                .get(&request.group)
                .and_then(|g| g.delete(&request.key))
            {
                Ok(()) => Response::ok(),
                Err(e) => Response::error(format!("failed to delete key: {e}")),
            }
        }
        Command::NewGroup => {
            let capacity = match parse_capacity_mb(&request.key) {
                Ok(c) => c,
                Err(e) => return Response::bad_request(format!("invalid size: {e}")),
            };
            match registry.create(&request.group, capacity) {
                Ok(_) => Response::ok(),
                Err(e @ CacheError::InvalidArgument(_)) => Response::bad_request(e),
                Err(e) => Response::error(e),
            }
        }
        Command::DelGroup => match registry.delete(&request.group) {
            Ok(()) => Response::ok(),
            Err(e) => Response::error(format!("failed to delete group: {e}")),
        },
        Command::ListGroup => Response::ok_with(format_list(&registry.list())),
        Command::Keys => match registry.get(&request.group) {
            Ok(group) => Response::ok_with(format_list(&group.keys())),
            Err(e) => Response::error(format!("failed to list keys: {e}")),
        },
        Command::Stats => match registry.get(&request.group) {
            Ok(group) => Response::ok_with(group.status().to_string()),
            Err(e) => Response::error(format!("failed to get stats: {e}")),
        },
        Command::Locate => match ctx.ring.as_deref() {
            Some(ring) => match ring.locate(&request.key) {
                Some(node) => Response::ok_with(Bytes::copy_from_slice(node.as_bytes())),
                None => Response::error("cluster has no nodes"),
            },
            None => Response::error("cluster is not configured"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cache_core::MIB;

    fn context() -> ServerContext {
        let registry = Arc::new(GroupRegistry::new(16));
        registry.create("test", 100 * MIB).unwrap();
        ServerContext::new(registry)
    }

    fn result(response: &Response) -> &str {
        std::str::from_utf8(&response.result).unwrap()
    }

    #[test]
    fn test_set_get_overwrite() {
        let ctx = context();
        assert!(execute(&Request::set("test", "key1", &b"value1"[..]), &ctx).is_ok());
        let response = execute(&Request::get("test", "key1"), &ctx);
        assert!(response.is_ok());
        assert_eq!(result(&response), "value1");

        assert!(execute(&Request::set("test", "key1", &b"value2"[..]), &ctx).is_ok());
        assert_eq!(result(&execute(&Request::get("test", "key1"), &ctx)), "value2");
    }

    #[test]
    fn test_get_missing() {
        let ctx = context();
        let response = execute(&Request::get("test", "missing"), &ctx);
        assert_eq!(response.code, "500");
        assert_eq!(result(&response), "failed to get key: key not found: missing");
    }

    #[test]
    fn test_missing_group() {
        let ctx = context();
        let response = execute(&Request::set("nope", "k", &b"v"[..]), &ctx);
        assert_eq!(response.code, "500");
        assert!(result(&response).contains("group not found: nope"));
    }

    #[test]
    fn test_del() {
        let ctx = context();
        execute(&Request::set("test", "k", &b"v"[..]), &ctx);
        assert!(execute(&Request::del("test", "k"), &ctx).is_ok());
        assert_eq!(execute(&Request::del("test", "k"), &ctx).code, "500");
    }

    #[test]
    fn test_new_group() {
        let ctx = context();
        assert!(execute(&Request::new_group("fresh", 2), &ctx).is_ok());
        assert_eq!(ctx.registry.get("fresh").unwrap().capacity(), 2 * MIB);

        let dup = execute(&Request::new_group("fresh", 2), &ctx);
        assert_eq!(dup.code, "500");
        assert_eq!(result(&dup), "group fresh already exists");

        let bad = execute(&Request::new("new_group", "lots", Bytes::new(), "g"), &ctx);
        assert_eq!(bad.code, "400");

        let unnamed = execute(&Request::new_group("", 1), &ctx);
        assert_eq!(unnamed.code, "400");
    }

    #[test]
    fn test_list_and_del_group() {
        let ctx = context();
        execute(&Request::new_group("alpha", 1), &ctx);
        let response = execute(&Request::list_group(), &ctx);
        assert_eq!(result(&response), "[alpha test]");

        assert!(execute(&Request::del_group("alpha"), &ctx).is_ok());
        assert_eq!(result(&execute(&Request::list_group(), &ctx)), "[test]");
        assert_eq!(execute(&Request::del_group("alpha"), &ctx).code, "500");
    }

    #[test]
    fn test_keys_and_stats() {
        let ctx = context();
        execute(&Request::set("test", "a", &b"1"[..]), &ctx);
        let keys = execute(&Request::keys("test"), &ctx);
        assert_eq!(result(&keys), "[a]");

        let stats = execute(&Request::stats("test"), &ctx);
        assert!(stats.is_ok());
        assert!(result(&stats).contains("Name: test"));
        assert!(result(&stats).contains("Key Count: 1"));
    }

    #[test]
    fn test_unknown_command() {
        let ctx = context();
        let response = execute(&Request::new("flush", "", Bytes::new(), ""), &ctx);
        assert_eq!(response.code, "400");
        assert_eq!(result(&response), "unknown command: flush");
    }

    #[test]
    fn test_locate() {
        let ctx = context();
        assert_eq!(execute(&Request::locate("k"), &ctx).code, "500");

        let mut ring = HashRing::new();
        ring.add_nodes(["10.0.0.1:9000", "10.0.0.2:9000"]);
        let ctx = ctx.with_ring(ring);
        let response = execute(&Request::locate("k"), &ctx);
        assert!(response.is_ok());
        assert!(result(&response).starts_with("10.0.0."));
    }

    #[test]
    fn test_format_list() {
        assert_eq!(format_list(&[]), "[]");
        assert_eq!(
            format_list(&["a".to_string(), "b".to_string()]),
            "[a b]"
        );
    }
}

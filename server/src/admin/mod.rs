//! HTTP admin server for health checks, metrics and group usage.
//!
//! Provides the following endpoints:
//! - `GET /health` - Liveness probe (always returns 200 OK)
//! - `GET /ready` - Readiness probe (503 once shutdown has begun)
//! - `GET /metrics` - Prometheus-formatted metrics
//! - `GET /stats` - JSON usage per group plus registry totals

use axum::extract::State;
use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::get};
use cache_core::{CacheStats, GroupRegistry};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Handle returned by [`start`] for shutdown coordination.
pub struct AdminHandle {
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
    join_handle: std::thread::JoinHandle<()>,
}

impl AdminHandle {
    /// Signal the admin server to shut down and wait for it to finish.
    pub fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.join_handle.join();
    }
}

/// Runtime configuration for the admin server.
pub struct AdminServerConfig {
    /// Address to bind the admin server to.
    pub address: SocketAddr,
    /// Shared shutdown flag to check if server is shutting down.
    pub shutdown: Arc<AtomicBool>,
    /// Registry reported by `/stats`.
    pub registry: Arc<GroupRegistry>,
}

#[derive(Clone)]
struct AdminState {
    shutdown: Arc<AtomicBool>,
    registry: Arc<GroupRegistry>,
}

/// Usage of one cache, in bytes.
#[derive(Debug, Serialize)]
pub struct UsageReport {
    pub max_bytes: usize,
    pub used_bytes: usize,
    pub count: usize,
    pub usage_ratio: f64,
}

impl From<CacheStats> for UsageReport {
    fn from(stats: CacheStats) -> Self {
        Self {
            max_bytes: stats.max_bytes,
            used_bytes: stats.used_bytes,
            count: stats.count,
            usage_ratio: stats.usage_ratio(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GroupReport {
    pub name: String,
    #[serde(flatten)]
    pub usage: UsageReport,
}

/// Body of `GET /stats`.
#[derive(Debug, Serialize)]
pub struct StatsReport {
    pub groups: Vec<GroupReport>,
    pub total: UsageReport,
}

impl StatsReport {
    pub fn collect(registry: &GroupRegistry) -> Self {
        let stats = registry.stats();
        Self {
            groups: stats
                .groups
                .into_iter()
                .map(|status| GroupReport {
                    usage: CacheStats {
                        max_bytes: status.max_bytes,
                        used_bytes: status.used_bytes,
                        count: status.key_count,
                    }
                    .into(),
                    name: status.name,
                })
                .collect(),
            total: stats.total.into(),
        }
    }
}

/// Start the admin server in a dedicated thread.
///
/// The admin server runs in its own thread with a single-threaded Tokio runtime
/// to avoid interfering with the cache server's reactor threads.
pub fn start(config: AdminServerConfig) -> std::io::Result<AdminHandle> {
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let address = config.address;
    let state = AdminState {
        shutdown: config.shutdown,
        registry: config.registry,
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let join_handle = std::thread::Builder::new()
        .name("admin".to_string())
        .spawn(move || {
            rt.block_on(async move {
                run_admin_server(address, state, shutdown_rx).await;
            });
        })?;

    Ok(AdminHandle {
        shutdown_tx,
        join_handle,
    })
}

fn router(state: AdminState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .route("/stats", get(stats_handler))
        .with_state(state)
}

async fn run_admin_server(
    address: SocketAddr,
    state: AdminState,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) {
    let app = router(state);

    let listener = match tokio::net::TcpListener::bind(address).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, address = %address, "Failed to bind admin server");
            return;
        }
    };

    tracing::info!(address = %address, "Admin server listening");

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Admin server error");
            }
        }
        _ = shutdown_rx => {
            tracing::debug!("Admin server received shutdown signal");
        }
    }

    tracing::debug!("Admin server stopped");
}

/// Health check handler (liveness probe).
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Returns 503 Service Unavailable once shutdown has begun.
async fn ready_handler(State(state): State<AdminState>) -> impl IntoResponse {
    if state.shutdown.load(Ordering::Relaxed) {
        (StatusCode::SERVICE_UNAVAILABLE, "Shutting down")
    } else {
        (StatusCode::OK, "OK")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4; charset=utf-8")],
        generate_prometheus_output(),
    )
}

async fn stats_handler(State(state): State<AdminState>) -> Json<StatsReport> {
    Json(StatsReport::collect(&state.registry))
}

/// Replace characters Prometheus does not allow in metric names.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Generate Prometheus-formatted metrics output.
fn generate_prometheus_output() -> String {
    let mut output = String::with_capacity(4096);

    for metric in metriken::metrics().iter() {
        let name = metric.name();
        if name.is_empty() {
            continue;
        }

        let Some(value) = metric.value() else {
            continue;
        };
        let prom_name = sanitize_name(name);

        match value {
            metriken::Value::Counter(v) => {
                output.push_str(&format!("# TYPE {} counter\n", prom_name));
                output.push_str(&format!("{} {}\n", prom_name, v));
            }
            metriken::Value::Gauge(v) => {
                output.push_str(&format!("# TYPE {} gauge\n", prom_name));
                output.push_str(&format!("{} {}\n", prom_name, v));
            }
            _ => continue,
        }

        output.push('\n');
    }

    output
}

//! Shoal cache server binary.

use cache_core::{
    CacheError, Evicted, EvictionCause, GroupRegistry, Value, capacity_from_mb, eviction_channel,
};
use clap::Parser;
use crossbeam_channel::Receiver;
use hash_ring::HashRing;
use server::admin::{self, AdminServerConfig};
use server::banner::{BannerConfig, print_banner};
use server::config::{Config, DEFAULT_CONFIG};
use server::gateway::{self, GatewayServerConfig};
use server::metrics::EVICTIONS;
use server::{ServerContext, logging, signal};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "shoal-server")]
#[command(about = "Grouped in-memory cache server")]
struct Args {
    /// Path to configuration file
    config: Option<PathBuf>,

    /// Print default configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn main() {
    let args = Args::parse();

    if args.print_config {
        print_default_config();
        return;
    }

    let config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    // Initialize logging first
    logging::init(&config.logging);

    let shutdown = match signal::install_signal_handler() {
        Ok(flag) => flag,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install signal handler");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config, shutdown) {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

fn run(config: Config, shutdown: Arc<AtomicBool>) -> Result<(), Box<dyn std::error::Error>> {
    print_banner(&BannerConfig {
        version: env!("CARGO_PKG_VERSION"),
        backend_detail: server::native::backend_detail(),
        workers: config.threads(),
        shards: config.cache.shards,
        server_address: config.server.address,
        gateway_address: config.gateway.enabled.then_some(config.gateway.address),
        admin_address: config.admin.address,
        groups: &config.group,
        nodes: &config.cluster.nodes,
    });

    let (registry, evictions) = create_registry(&config)?;
    if let Some(rx) = evictions {
        spawn_eviction_drain(rx)?;
    }

    let mut ctx = ServerContext::new(registry.clone());
    if !config.cluster.nodes.is_empty() {
        let mut ring = HashRing::with_replicas(config.cluster.replicas);
        ring.add_nodes(&config.cluster.nodes);
        ctx = ctx.with_ring(ring);
    }

    // Start admin server for health checks, metrics and usage
    let admin_handle = admin::start(AdminServerConfig {
        address: config.admin.address,
        shutdown: shutdown.clone(),
        registry: registry.clone(),
    })?;

    let gateway_handle = if config.gateway.enabled {
        Some(gateway::start(GatewayServerConfig {
            address: config.gateway.address,
            base_path: config.gateway.base_path.clone(),
            registry: registry.clone(),
        })?)
    } else {
        None
    };

    let drain_timeout = Duration::from_secs(config.shutdown.drain_timeout_secs);
    let result = server::native::run(&config, ctx, shutdown, drain_timeout);

    if let Some(handle) = gateway_handle {
        handle.shutdown();
    }
    admin_handle.shutdown();

    result
}

/// Build the registry and create the configured startup groups.
///
/// Returns the eviction receiver when notices are enabled.
fn create_registry(
    config: &Config,
) -> Result<(Arc<GroupRegistry>, Option<Receiver<Evicted<Value>>>), CacheError> {
    let (registry, evictions) = if config.cache.eviction_notices > 0 {
        let (notifier, rx) = eviction_channel(config.cache.eviction_notices);
        (
            GroupRegistry::with_notifier(config.cache.shards, notifier),
            Some(rx),
        )
    } else {
        (GroupRegistry::new(config.cache.shards), None)
    };

    for group in &config.group {
        registry.create(&group.name, capacity_from_mb(group.capacity_mb)?)?;
        tracing::info!(group = %group.name, capacity_mb = group.capacity_mb, "created group");
    }

    Ok((Arc::new(registry), evictions))
}

/// Count capacity evictions as they are reported.
fn spawn_eviction_drain(rx: Receiver<Evicted<Value>>) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("evictions".to_string())
        .spawn(move || {
            for evicted in rx {
                if evicted.cause == EvictionCause::Capacity {
                    EVICTIONS.increment();
                    tracing::trace!(key = %evicted.key, "evicted");
                }
            }
        })
}

fn print_default_config() {
    print!("{}", DEFAULT_CONFIG);
}

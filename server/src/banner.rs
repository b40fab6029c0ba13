//! Startup banner utilities.

use crate::config::{GroupConfig, format_size};
use std::fmt::{self, Write};
use std::net::SocketAddr;

/// Configuration for the startup banner.
pub struct BannerConfig<'a> {
    /// Version string
    pub version: &'a str,
    /// I/O backend detail (e.g., "mio")
    pub backend_detail: &'a str,
    /// Number of worker threads
    pub workers: usize,
    /// Shards per group
    pub shards: usize,
    /// Binary protocol address
    pub server_address: SocketAddr,
    /// Gateway address, when enabled
    pub gateway_address: Option<SocketAddr>,
    /// Admin address
    pub admin_address: SocketAddr,
    /// Groups created at startup
    pub groups: &'a [GroupConfig],
    /// Cluster nodes
    pub nodes: &'a [String],
}

/// Print a startup banner to stdout.
pub fn print_banner(config: &BannerConfig) {
    let mut output = String::with_capacity(512);
    if render(config, &mut output).is_ok() {
        print!("{}", output);
    }
}

fn render(config: &BannerConfig, output: &mut impl Write) -> fmt::Result {
    let name = "shoal-server";
    writeln!(output, "{} v{}", name, config.version)?;
    writeln!(
        output,
        "{}",
        "=".repeat(name.len() + config.version.len() + 2)
    )?;
    writeln!(output)?;

    writeln!(output, "Runtime:     native ({})", config.backend_detail)?;
    writeln!(output, "Workers:     {}", config.workers)?;
    writeln!(output, "Shards:      {} per group", config.shards)?;
    writeln!(output)?;

    writeln!(output, "Listeners:")?;
    writeln!(output, "  Binary:  {}", config.server_address)?;
    if let Some(addr) = config.gateway_address {
        writeln!(output, "  HTTP:    {}", addr)?;
    }
    writeln!(output, "  Admin:   {}", config.admin_address)?;
    writeln!(output)?;

    if !config.groups.is_empty() {
        writeln!(output, "Groups:")?;
        for group in config.groups {
            let size = format_size(group.capacity_mb.saturating_mul(cache_core::MIB));
            writeln!(output, "  {}: {}", group.name, size)?;
        }
        writeln!(output)?;
    }

    if !config.nodes.is_empty() {
        writeln!(output, "Cluster:     {} nodes", config.nodes.len())?;
        writeln!(output)?;
    }

    Ok(())
}

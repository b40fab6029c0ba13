//! Server configuration.
//!
//! Loaded from a TOML file. Every section is optional and falls back to
//! defaults; unknown keys are rejected.

use serde::Deserialize;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;

/// Annotated configuration printed by `shoal-server --print-config`.
pub const DEFAULT_CONFIG: &str = r#"# Shoal Server Configuration

[shutdown]
# Timeout in seconds for draining connections during graceful shutdown
drain_timeout_secs = 5

[logging]
# Log level: "error", "warn", "info", "debug", "trace"
# Can be overridden with RUST_LOG environment variable
level = "info"
# Log format: "pretty" (human-readable), "json", or "compact"
format = "pretty"
# Include timestamps
timestamps = true
# Include thread names
thread_names = false
# Include module target
target = true

[workers]
# Number of reactor threads (default: number of CPUs)
# threads = 8

[server]
# Binary protocol listener
address = "0.0.0.0:9000"
# Largest accepted frame body; larger frames are discarded
max_frame_size = "16MB"
# Stop reading a connection while this many response bytes are unflushed
write_high_watermark = "1MB"
# Initial per-connection read buffer
read_buffer_size = "64KB"

[cache]
# Shards per group; every group capacity must divide evenly
shards = 16
# Bound of the eviction notice channel (0 disables notices)
eviction_notices = 4096

# Groups created at startup
[[group]]
name = "default"
capacity_mb = 64

[cluster]
# Node identifiers for key ownership lookups (locate command)
nodes = []
# Virtual replicas per node
replicas = 160

[gateway]
# HTTP gateway: GET|POST {base_path}{action}
enabled = true
address = "0.0.0.0:4160"
base_path = "/shoal/"

[admin]
# Health checks (/health, /ready), Prometheus metrics (/metrics) and usage (/stats)
address = "0.0.0.0:9090"
"#;

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration loaded from TOML file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Reactor thread configuration
    #[serde(default)]
    pub workers: WorkersConfig,

    /// Binary protocol listener
    #[serde(default)]
    pub server: ServerConfig,

    /// Group storage settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Groups created at startup
    #[serde(default)]
    pub group: Vec<GroupConfig>,

    /// Cluster membership for key ownership
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// HTTP gateway
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Admin endpoint (health, readiness, metrics, stats)
    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

/// Worker thread configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkersConfig {
    /// Number of reactor threads (default: number of CPUs)
    pub threads: Option<usize>,
}

/// Binary protocol listener configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to listen on
    #[serde(default = "default_server_address")]
    pub address: SocketAddr,

    /// Largest accepted frame body (e.g., "16MB")
    #[serde(
        default = "default_max_frame_size",
        deserialize_with = "deserialize_size"
    )]
    pub max_frame_size: usize,

    /// Unflushed response bytes above which a connection stops being read
    #[serde(
        default = "default_write_high_watermark",
        deserialize_with = "deserialize_size"
    )]
    pub write_high_watermark: usize,

    /// Initial per-connection read buffer capacity
    #[serde(
        default = "default_read_buffer_size",
        deserialize_with = "deserialize_size"
    )]
    pub read_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_server_address(),
            max_frame_size: default_max_frame_size(),
            write_high_watermark: default_write_high_watermark(),
            read_buffer_size: default_read_buffer_size(),
        }
    }
}

/// Group storage configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Shards per group
    #[serde(default = "default_shards")]
    pub shards: usize,

    /// Bound of the eviction notice channel; 0 disables notices
    #[serde(default = "default_eviction_notices")]
    pub eviction_notices: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            shards: default_shards(),
            eviction_notices: default_eviction_notices(),
        }
    }
}

/// A group created at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
    pub name: String,
    /// Capacity in mebibytes
    pub capacity_mb: usize,
}

/// Cluster membership.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterConfig {
    /// Node identifiers, e.g. "10.0.0.1:9000"
    #[serde(default)]
    pub nodes: Vec<String>,

    /// Virtual replicas per node
    #[serde(default = "default_replicas")]
    pub replicas: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            replicas: default_replicas(),
        }
    }
}

/// HTTP gateway configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_gateway_address")]
    pub address: SocketAddr,

    /// Path prefix; actions are served at `{base_path}{action}`
    #[serde(default = "default_base_path")]
    pub base_path: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: default_gateway_address(),
            base_path: default_base_path(),
        }
    }
}

/// Admin endpoint configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminConfig {
    #[serde(default = "default_admin_address")]
    pub address: SocketAddr,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            address: default_admin_address(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level, overridden by RUST_LOG when set
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default = "default_true")]
    pub timestamps: bool,

    /// Include the module target
    #[serde(default = "default_true")]
    pub target: bool,

    #[serde(default)]
    pub thread_names: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            timestamps: true,
            target: true,
            thread_names: false,
        }
    }
}

/// Shutdown configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShutdownConfig {
    /// Seconds to wait for workers to finish after a shutdown signal
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

// Default value functions

fn default_true() -> bool {
    true
}

fn default_server_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9000))
}

fn default_max_frame_size() -> usize {
    protocol_frame::DEFAULT_MAX_FRAME_LEN
}

fn default_write_high_watermark() -> usize {
    1024 * 1024 // 1MB
}

fn default_read_buffer_size() -> usize {
    64 * 1024
}

fn default_shards() -> usize {
    16
}

fn default_eviction_notices() -> usize {
    4096
}

fn default_replicas() -> usize {
    hash_ring::DEFAULT_REPLICAS
}

fn default_gateway_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 4160))
}

fn default_base_path() -> String {
    "/shoal/".to_string()
}

fn default_admin_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9090))
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_drain_timeout_secs() -> u64 {
    5
}

/// Deserialize a size string like "64MB" or "4GB" into bytes.
fn deserialize_size<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SizeValue {
        Number(usize),
        String(String),
    }

    match SizeValue::deserialize(deserializer)? {
        SizeValue::Number(n) => Ok(n),
        SizeValue::String(s) => parse_size(&s).map_err(D::Error::custom),
    }
}

/// Parse a size string like "64MB", "4GB", "1TB" into bytes.
pub fn parse_size(s: &str) -> Result<usize, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty size string".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| c.is_alphabetic()) {
        Some(idx) => (&s[..idx], s[idx..].to_uppercase()),
        None => (s, String::new()),
    };

    let num: usize = num_str
        .trim()
        .parse()
        .map_err(|_| format!("invalid number: {}", num_str))?;

    let multiplier: usize = match suffix.as_str() {
        "" | "B" => 1,
        "K" | "KB" | "KIB" => 1024,
        "M" | "MB" | "MIB" => 1024 * 1024,
        "G" | "GB" | "GIB" => 1024 * 1024 * 1024,
        _ => return Err(format!("unknown size suffix: {}", suffix)),
    };

    num.checked_mul(multiplier)
        .ok_or_else(|| "size overflow".to_string())
}

/// Format a size in bytes as a human-readable string.
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;
    const GB: usize = 1024 * MB;

    if bytes >= GB && bytes.is_multiple_of(GB) {
        format!("{} GB", bytes / GB)
    } else if bytes >= MB && bytes.is_multiple_of(MB) {
        format!("{} MB", bytes / MB)
    } else if bytes >= KB && bytes.is_multiple_of(KB) {
        format!("{} KB", bytes / KB)
    } else {
        format!("{} bytes", bytes)
    }
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.workers.threads == Some(0) {
            return invalid("workers.threads must be greater than 0".into());
        }
        if self.server.max_frame_size == 0 {
            return invalid("server.max_frame_size must be greater than 0".into());
        }
        if self.server.write_high_watermark == 0 {
            return invalid("server.write_high_watermark must be greater than 0".into());
        }
        if self.cache.shards == 0 {
            return invalid("cache.shards must be greater than 0".into());
        }

        let mut names = HashSet::new();
        for group in &self.group {
            if group.name.is_empty() {
                return invalid("group name can't be empty".into());
            }
            if !names.insert(group.name.as_str()) {
                return invalid(format!("group {} is defined more than once", group.name));
            }
            let bytes = cache_core::capacity_from_mb(group.capacity_mb)
                .map_err(|e| ConfigError::Invalid(format!("group {}: {}", group.name, e)))?;
            if !bytes.is_multiple_of(self.cache.shards) {
                return invalid(format!(
                    "group {}: capacity of {} MB is not divisible by {} shards",
                    group.name, group.capacity_mb, self.cache.shards
                ));
            }
        }

        if !self.cluster.nodes.is_empty() && self.cluster.replicas == 0 {
            return invalid("cluster.replicas must be greater than 0".into());
        }

        let base = &self.gateway.base_path;
        if !base.starts_with('/') || !base.ends_with('/') {
            return invalid(format!(
                "gateway.base_path must start and end with '/': {base:?}"
            ));
        }

        Ok(())
    }

    /// Get the number of worker threads.
    pub fn threads(&self) -> usize {
        self.workers.threads.unwrap_or_else(num_cpus::get)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert_eq!(parse_size("1K").unwrap(), 1024);
        assert_eq!(parse_size("64MB").unwrap(), 64 * 1024 * 1024);
        assert_eq!(parse_size("4GB").unwrap(), 4 * 1024 * 1024 * 1024);
        assert!(parse_size("").is_err());
        assert!(parse_size("12XB").is_err());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(64 * 1024 * 1024), "64 MB");
        assert_eq!(format_size(1000), "1000 bytes");
    }

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.address.port(), 9000);
        assert_eq!(config.server.write_high_watermark, 1024 * 1024);
        assert_eq!(config.cache.shards, 16);
        assert_eq!(config.cache.eviction_notices, 4096);
        assert_eq!(config.cluster.replicas, 160);
        assert!(config.gateway.enabled);
        assert_eq!(config.gateway.base_path, "/shoal/");
        assert_eq!(config.admin.address.port(), 9090);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.shutdown.drain_timeout_secs, 5);
        assert!(config.group.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r#"
            [workers]
            threads = 2

            [server]
            address = "127.0.0.1:7000"
            max_frame_size = "1MB"
            write_high_watermark = "256KB"

            [cache]
            shards = 8
            eviction_notices = 0

            [[group]]
            name = "default"
            capacity_mb = 64

            [[group]]
            name = "sessions"
            capacity_mb = 8

            [cluster]
            nodes = ["10.0.0.1:7000", "10.0.0.2:7000"]

            [gateway]
            enabled = false
            base_path = "/cache/"

            [logging]
            format = "json"
            timestamps = false
            "#,
        )
        .unwrap();

        assert_eq!(config.threads(), 2);
        assert_eq!(config.server.max_frame_size, 1024 * 1024);
        assert_eq!(config.server.write_high_watermark, 256 * 1024);
        assert_eq!(config.group.len(), 2);
        assert_eq!(config.group[1].name, "sessions");
        assert_eq!(config.cluster.nodes.len(), 2);
        assert!(!config.gateway.enabled);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(!config.logging.timestamps);
    }

    #[test]
    fn test_default_config_parses() {
        let config = Config::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.group.len(), 1);
        assert_eq!(config.group[0].capacity_mb, 64);
        assert_eq!(config.server.max_frame_size, 16 * 1024 * 1024);
        assert!(config.cluster.nodes.is_empty());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = Config::parse("[server]\nport = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation() {
        let cases = [
            "[workers]\nthreads = 0\n",
            "[cache]\nshards = 0\n",
            "[[group]]\nname = \"\"\ncapacity_mb = 1\n",
            "[[group]]\nname = \"a\"\ncapacity_mb = 0\n",
            "[[group]]\nname = \"a\"\ncapacity_mb = 1\n[[group]]\nname = \"a\"\ncapacity_mb = 1\n",
            "[cache]\nshards = 3\n[[group]]\nname = \"a\"\ncapacity_mb = 1\n",
            "[gateway]\nbase_path = \"/shoal\"\n",
            "[cluster]\nnodes = [\"a\"]\nreplicas = 0\n",
        ];
        for case in cases {
            let err = Config::parse(case).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid(_)),
                "expected validation error for {case:?}, got {err}"
            );
        }
    }
}

//! Cache server metrics.

use metriken::{Counter, Gauge, metric};
use protocol_frame::Command;

// Connection metrics
#[metric(
    name = "connections_accepted",
    description = "Total number of connections accepted"
)]
pub static CONNECTIONS_ACCEPTED: Counter = Counter::new();

#[metric(
    name = "connections_active",
    description = "Number of currently active connections"
)]
pub static CONNECTIONS_ACTIVE: Gauge = Gauge::new();

#[metric(
    name = "connections_closed",
    description = "Total number of connections closed"
)]
pub static CONNECTIONS_CLOSED: Counter = Counter::new();

#[metric(name = "accept_errors", description = "Total failed accept calls")]
pub static ACCEPT_ERRORS: Counter = Counter::new();

// Traffic
#[metric(name = "bytes_received", description = "Total bytes read from clients")]
pub static BYTES_RECEIVED: Counter = Counter::new();

#[metric(name = "bytes_sent", description = "Total bytes written to clients")]
pub static BYTES_SENT: Counter = Counter::new();

// Operation counters
#[metric(name = "cache_sets", description = "Total set requests")]
pub static SETS: Counter = Counter::new();

#[metric(name = "cache_gets", description = "Total get requests")]
pub static GETS: Counter = Counter::new();

#[metric(name = "cache_deletes", description = "Total del requests")]
pub static DELETES: Counter = Counter::new();

#[metric(name = "group_creates", description = "Total new_group requests")]
pub static GROUP_CREATES: Counter = Counter::new();

#[metric(name = "group_deletes", description = "Total del_group requests")]
pub static GROUP_DELETES: Counter = Counter::new();

#[metric(name = "group_lists", description = "Total list_group requests")]
pub static GROUP_LISTS: Counter = Counter::new();

#[metric(name = "key_lists", description = "Total keys requests")]
pub static KEY_LISTS: Counter = Counter::new();

#[metric(name = "group_stats", description = "Total stats requests")]
pub static GROUP_STATS: Counter = Counter::new();

#[metric(name = "locates", description = "Total locate requests")]
pub static LOCATES: Counter = Counter::new();

// Cache effectiveness
#[metric(name = "cache_hits", description = "Total cache hits")]
pub static HITS: Counter = Counter::new();

#[metric(name = "cache_misses", description = "Total cache misses")]
pub static MISSES: Counter = Counter::new();

#[metric(
    name = "cache_evictions",
    description = "Total entries evicted to stay within group capacity"
)]
pub static EVICTIONS: Counter = Counter::new();

// Errors
#[metric(
    name = "request_errors",
    description = "Total requests answered with a non-200 code"
)]
pub static REQUEST_ERRORS: Counter = Counter::new();

#[metric(
    name = "protocol_errors",
    description = "Total malformed or oversized frames"
)]
pub static PROTOCOL_ERRORS: Counter = Counter::new();

#[metric(
    name = "backpressure_events",
    description = "Times a connection stopped reading on unflushed responses"
)]
pub static BACKPRESSURE_EVENTS: Counter = Counter::new();

/// Request counter for a command.
pub fn request_counter(command: Command) -> &'static Counter {
    match command {
        Command::Set => &SETS,
        Command::Get => &GETS,
        Command::Del => &DELETES,
        Command::NewGroup => &GROUP_CREATES,
        Command::DelGroup => &GROUP_DELETES,
        Command::ListGroup => &GROUP_LISTS,
        Command::Keys => &KEY_LISTS,
        Command::Stats => &GROUP_STATS,
        Command::Locate => &LOCATES,
    }
}

/// Reason for closing a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Client closed connection (read returned 0)
    ClientEof,
    /// Error during read
    RecvError,
    /// Error during write
    SendError,
    /// Server shutting down
    Shutdown,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::ClientEof => "client_eof",
            CloseReason::RecvError => "recv_error",
            CloseReason::SendError => "send_error",
            CloseReason::Shutdown => "shutdown",
        }
    }
}

//! Shoal cache server.
//!
//! Serves named, byte-budgeted LRU cache groups over a length-prefixed binary
//! protocol on mio reactor threads, with an HTTP gateway and an admin
//! endpoint on the side.

pub mod admin;
pub mod banner;
pub mod config;
pub mod connection;
pub mod execute;
pub mod gateway;
pub mod logging;
pub mod metrics;
pub mod native;
pub mod signal;
pub mod workers;

pub use config::Config;
pub use execute::ServerContext;

//! Native runtime server: mio readiness loops on a fixed pool of threads.

mod handler;
mod server;

pub use server::{bind, run, serve};

/// Backend detail string for the banner.
pub fn backend_detail() -> &'static str {
    "mio"
}

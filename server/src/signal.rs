//! Signal handling for graceful shutdown.
//!
//! SIGINT and SIGTERM set a shared flag that the reactor workers, the
//! gateway and the admin server all observe.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Install signal handlers for graceful shutdown.
///
/// Returns an `Arc<AtomicBool>` that will be set to `true` when a
/// shutdown signal (SIGINT or SIGTERM) is received. A second signal exits
/// the process immediately.
pub fn install_signal_handler() -> Result<Arc<AtomicBool>, ctrlc::Error> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = shutdown.clone();

    ctrlc::set_handler(move || {
        if request_shutdown(&shutdown_flag) {
            tracing::warn!("Received second signal, forcing immediate exit");
            std::process::exit(1);
        }
        tracing::info!("Received shutdown signal, initiating graceful shutdown...");
    })?;

    Ok(shutdown)
}

/// Set the shutdown flag. Returns true if it was already set.
pub fn request_shutdown(flag: &AtomicBool) -> bool {
    flag.swap(true, Ordering::SeqCst)
}

//! Native server loop: one listener shared by N mio workers.

use super::handler::{HandlerConfig, ServerHandler};
use crate::config::Config;
use crate::execute::ServerContext;
use crate::workers::spawn_workers;
use protocol_frame::ParseOptions;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const LISTEN_BACKLOG: i32 = 1024;

/// Bind a non-blocking listening socket with `SO_REUSEADDR`.
pub fn bind(addr: SocketAddr) -> io::Result<std::net::TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;

    Ok(socket.into())
}

/// Run the native server on `config.server.address` until `shutdown` is set.
pub fn run(
    config: &Config,
    ctx: ServerContext,
    shutdown: Arc<AtomicBool>,
    drain_timeout: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = bind(config.server.address)?;
    serve(config, listener, ctx, shutdown, drain_timeout)
}

/// Run the native server on an already bound listener.
pub fn serve(
    config: &Config,
    listener: std::net::TcpListener,
    ctx: ServerContext,
    shutdown: Arc<AtomicBool>,
    drain_timeout: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let num_workers = config.threads();
    let handler_config = HandlerConfig {
        ctx,
        shutdown: shutdown.clone(),
        read_buffer_size: config.server.read_buffer_size,
        write_high_watermark: config.server.write_high_watermark,
        parse_options: ParseOptions::new().max_frame_len(config.server.max_frame_size),
    };

    // Distribute one listener clone to each worker; every worker registers
    // its clone with its own poll.
    let (listener_tx, listener_rx) = crossbeam_channel::bounded(num_workers);
    for _ in 0..num_workers {
        listener_tx.send(listener.try_clone()?)?;
    }
    drop(listener_tx);

    let handles = spawn_workers(num_workers, "worker", move |worker_id| {
        let listener = listener_rx
            .recv()
            .map_err(|_| io::Error::other("no listener left for worker"))?;
        ServerHandler::new(worker_id, listener, handler_config.clone())?.run()
    })?;

    info!(
        address = %config.server.address,
        workers = num_workers,
        "cache server listening"
    );

    while !shutdown.load(Ordering::Relaxed) {
        if handles.iter().all(|h| h.is_finished()) {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    if shutdown.load(Ordering::Relaxed) {
        info!("Shutdown signal received, draining connections...");
    }

    // Wait for workers to drain with timeout
    let drain_start = Instant::now();
    let mut workers_stopped = vec![false; handles.len()];

    while drain_start.elapsed() < drain_timeout {
        let mut all_stopped = true;
        for (i, handle) in handles.iter().enumerate() {
            if !workers_stopped[i] && handle.is_finished() {
                workers_stopped[i] = true;
                debug!(worker_id = handle.worker_id, "Worker stopped");
            }
            if !workers_stopped[i] {
                all_stopped = false;
            }
        }

        if all_stopped {
            break;
        }

        std::thread::sleep(Duration::from_millis(100));
    }

    let mut failed = 0;
    for handle in handles {
        if !handle.is_finished() {
            warn!(worker_id = handle.worker_id, "Drain timeout reached, abandoning worker");
            continue;
        }
        match handle.handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                failed += 1;
                warn!(worker_id = handle.worker_id, error = %e, "worker thread returned error");
            }
            Err(e) => {
                failed += 1;
                warn!(worker_id = handle.worker_id, "worker thread panicked: {e:?}");
            }
        }
    }

    if failed > 0 {
        return Err(format!("{failed} worker(s) failed").into());
    }

    info!("Server shutdown complete");
    Ok(())
}

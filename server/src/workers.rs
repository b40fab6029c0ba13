//! Worker thread management utilities.

use std::io;
use std::thread::{self, JoinHandle};

/// Handle to a spawned worker thread.
pub struct WorkerHandle<R> {
    /// The thread handle
    pub handle: JoinHandle<R>,
    /// The worker ID (0-indexed)
    pub worker_id: usize,
}

impl<R> WorkerHandle<R> {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Spawn `num_workers` named threads, each running `worker_fn(worker_id)`.
///
/// Threads are named `{name_prefix}-{worker_id}`.
pub fn spawn_workers<F, R>(
    num_workers: usize,
    name_prefix: &str,
    worker_fn: F,
) -> io::Result<Vec<WorkerHandle<R>>>
where
    F: Fn(usize) -> R + Send + Clone + 'static,
    R: Send + 'static,
{
    let mut handles = Vec::with_capacity(num_workers);

    for worker_id in 0..num_workers {
        let worker_fn = worker_fn.clone();
        let thread_name = format!("{}-{}", name_prefix, worker_id);

        let handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || worker_fn(worker_id))?;

        handles.push(WorkerHandle { handle, worker_id });
    }

    Ok(handles)
}

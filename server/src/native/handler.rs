//! Per-worker mio event loop for the cache server.

use crate::connection::Connection;
use crate::execute::ServerContext;
use crate::metrics::{
    ACCEPT_ERRORS, BACKPRESSURE_EVENTS, BYTES_RECEIVED, BYTES_SENT, CONNECTIONS_ACCEPTED,
    CONNECTIONS_ACTIVE, CONNECTIONS_CLOSED, CloseReason,
};
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Registry, Token};
use protocol_frame::ParseOptions;
use slab::Slab;
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, trace, warn};

const LISTENER: Token = Token(usize::MAX);

/// How often an idle worker wakes to check the shutdown flag.
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Per-worker configuration.
#[derive(Clone)]
pub(crate) struct HandlerConfig {
    pub ctx: ServerContext,
    pub shutdown: Arc<AtomicBool>,
    pub read_buffer_size: usize,
    pub write_high_watermark: usize,
    pub parse_options: ParseOptions,
}

/// A connection owned by this worker.
struct Session {
    stream: TcpStream,
    conn: Connection,
    /// Edge-triggered readiness not yet consumed.
    readable: bool,
    writable: bool,
}

/// Event loop state for one worker thread.
pub(crate) struct ServerHandler {
    worker_id: usize,
    config: HandlerConfig,
    poll: Poll,
    listener: TcpListener,
    sessions: Slab<Session>,
    recv_buf: Vec<u8>,
}

impl ServerHandler {
    pub(crate) fn new(
        worker_id: usize,
        listener: std::net::TcpListener,
        config: HandlerConfig,
    ) -> io::Result<Self> {
        let poll = Poll::new()?;
        let mut listener = TcpListener::from_std(listener);
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)?;

        Ok(Self {
            worker_id,
            recv_buf: vec![0u8; config.read_buffer_size.max(1)],
            config,
            poll,
            listener,
            sessions: Slab::with_capacity(1024),
        })
    }

    /// Run until the shutdown flag is set.
    pub(crate) fn run(mut self) -> io::Result<()> {
        let mut events = Events::with_capacity(1024);
        debug!(worker_id = self.worker_id, "worker started");

        while !self.config.shutdown.load(Ordering::Relaxed) {
            match self.poll.poll(&mut events, Some(POLL_TIMEOUT)) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }

            for event in events.iter() {
                match event.token() {
                    LISTENER => self.accept_pending(),
                    Token(key) => {
                        let Some(session) = self.sessions.get_mut(key) else {
                            continue;
                        };
                        if event.is_readable() || event.is_read_closed() {
                            session.readable = true;
                        }
                        if event.is_writable() {
                            session.writable = true;
                        }
                        if let Err(reason) = drive(session, &mut self.recv_buf, &self.config) {
                            self.close(key, reason);
                        }
                    }
                }
            }
        }

        self.drain();
        debug!(worker_id = self.worker_id, "worker stopped");
        Ok(())
    }

    /// Accept connections until the listener would block.
    fn accept_pending(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((mut stream, peer)) => {
                    let _ = stream.set_nodelay(true);
                    let entry = self.sessions.vacant_entry();
                    let token = Token(entry.key());
                    if let Err(e) = self.poll.registry().register(
                        &mut stream,
                        token,
                        Interest::READABLE | Interest::WRITABLE,
                    ) {
                        ACCEPT_ERRORS.increment();
                        warn!(error = %e, "failed to register connection");
                        continue;
                    }
                    entry.insert(Session {
                        stream,
                        conn: Connection::new(
                            self.config.read_buffer_size,
                            self.config.parse_options,
                        ),
                        readable: true,
                        writable: true,
                    });
                    CONNECTIONS_ACCEPTED.increment();
                    CONNECTIONS_ACTIVE.increment();
                    trace!(worker_id = self.worker_id, %peer, "accepted connection");
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    ACCEPT_ERRORS.increment();
                    warn!(error = %e, "accept failed");
                    break;
                }
            }
        }
    }

    fn close(&mut self, key: usize, reason: CloseReason) {
        if let Some(session) = self.sessions.try_remove(key) {
            deregister(self.poll.registry(), session);
            CONNECTIONS_ACTIVE.decrement();
            CONNECTIONS_CLOSED.increment();
            trace!(worker_id = self.worker_id, reason = reason.as_str(), "closed connection");
        }
    }

    /// Final flush attempt, then release every session.
    fn drain(&mut self) {
        for (_, session) in self.sessions.iter_mut() {
            let _ = flush(session);
        }
        let keys: Vec<usize> = self.sessions.iter().map(|(key, _)| key).collect();
        for key in keys {
            self.close(key, CloseReason::Shutdown);
        }
    }
}

fn deregister(registry: &Registry, mut session: Session) {
    let _ = registry.deregister(&mut session.stream);
}

/// Flush, read and dispatch until the socket would block or the connection
/// is backpressured.
fn drive(
    session: &mut Session,
    recv_buf: &mut [u8],
    config: &HandlerConfig,
) -> Result<(), CloseReason> {
    loop {
        flush(session)?;

        if session.conn.pending_write_len() > config.write_high_watermark {
            BACKPRESSURE_EVENTS.increment();
            return Ok(());
        }
        if !session.readable {
            return Ok(());
        }

        match read_into(session, recv_buf, config) {
            Ok(true) => continue,
            Ok(false) => {
                session.readable = false;
                return flush(session);
            }
            Err(reason) => return Err(reason),
        }
    }
}

/// Read one chunk from the socket and process it.
///
/// Returns `Ok(false)` once the socket would block.
fn read_into(
    session: &mut Session,
    recv_buf: &mut [u8],
    config: &HandlerConfig,
) -> Result<bool, CloseReason> {
    loop {
        match session.stream.read(recv_buf) {
            Ok(0) => return Err(CloseReason::ClientEof),
            Ok(n) => {
                BYTES_RECEIVED.add(n as u64);
                session.conn.append_recv_data(&recv_buf[..n]);
                session.conn.process(&config.ctx);
                return Ok(true);
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(false),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!(error = %e, "recv failed");
                return Err(CloseReason::RecvError);
            }
        }
    }
}

/// Write as much pending response data as the socket accepts.
fn flush(session: &mut Session) -> Result<(), CloseReason> {
    while session.writable && session.conn.has_pending_write() {
        match session.stream.write(session.conn.pending_write_data()) {
            Ok(0) => return Err(CloseReason::SendError),
            Ok(n) => {
                BYTES_SENT.add(n as u64);
                session.conn.advance_write(n);
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => session.writable = false,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                debug!(error = %e, "send failed");
                return Err(CloseReason::SendError);
            }
        }
    }
    Ok(())
}

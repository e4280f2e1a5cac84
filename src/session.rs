//! The session engine: one transport, one background reader, and a
//! send/expect protocol over the reader's buffered output.

use crate::buffer::OutputBuffer;
use crate::error::{Result, SessionError};
use crate::options::{Direction, IoMirror, SessionOptions, Timeout};
use crate::pattern::{IntoPattern, MatchResult};
use crate::transport::{PtyTransport, TcpTransport, Transport};
use std::io::{self, Read, Write};
use std::net::ToSocketAddrs;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread;
use tokio::sync::{Notify, watch};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// Lifecycle of a session.
///
/// `Running` is the only state that accepts new output. `Eof` still lets
/// buffered output be matched and input be written; `Errored` and `Closed`
/// are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Eof,
    Errored,
    Closed,
}

/// How a session's stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The transport reached end of stream.
    Eof,
    /// The session was closed by its owner.
    Closed,
    /// The transport failed with a read error.
    Failed(String),
}

impl Termination {
    /// The terminal error, or `None` for a clean end.
    pub fn error(&self) -> Option<&str> {
        match self {
            Termination::Failed(message) => Some(message),
            Termination::Eof | Termination::Closed => None,
        }
    }
}

/// Fires once, when the session's stream ends. Clone it to observe the
/// outcome from several places.
#[derive(Debug, Clone)]
pub struct TerminationSignal {
    rx: watch::Receiver<Option<Termination>>,
}

impl TerminationSignal {
    /// Wait until the session terminates.
    pub async fn wait(&self) -> Termination {
        let mut rx = self.rx.clone();
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        };
        // The sender only goes away with the session, which always latches first.
        outcome.unwrap_or(Termination::Closed)
    }

    /// The outcome, if the session has already terminated.
    pub fn try_get(&self) -> Option<Termination> {
        self.rx.borrow().clone()
    }
}

struct Inner {
    buffer: OutputBuffer,
    state: SessionState,
    /// Set by `close`; the buffer has been released.
    released: bool,
}

/// State shared between the session handle and its reader thread.
///
/// The reader is the only writer of `inner.buffer`; `expect` and `close`
/// only read, consume, or release it.
struct Shared {
    inner: Mutex<Inner>,
    notify: Notify,
    termination: watch::Sender<Option<Termination>>,
    mirror: Option<IoMirror>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns false once the session has stopped accepting output.
    fn append(&self, chunk: &[u8]) -> bool {
        {
            let mut inner = self.lock();
            if inner.state != SessionState::Running {
                return false;
            }
            inner.buffer.append(chunk);
        }
        trace!(bytes = chunk.len(), "received");
        if let Some(mirror) = &self.mirror {
            mirror(Direction::Received, chunk);
        }
        self.notify.notify_waiters();
        true
    }

    /// Move a running session to a terminal state. Returns false if it had
    /// already left `Running`.
    fn finish(&self, state: SessionState, termination: Termination) -> bool {
        {
            let mut inner = self.lock();
            if inner.state != SessionState::Running {
                return false;
            }
            inner.state = state;
        }
        self.latch(termination);
        true
    }

    fn latch(&self, termination: Termination) {
        self.termination.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(termination);
            true
        });
        self.notify.notify_waiters();
    }

    fn terminal_error(&self, inner: &Inner) -> Option<SessionError> {
        let buffer = inner.buffer.to_string_lossy();
        match inner.state {
            SessionState::Running => None,
            SessionState::Eof => Some(SessionError::Eof { buffer }),
            SessionState::Closed => Some(SessionError::Closed { buffer }),
            SessionState::Errored => Some(SessionError::Failed {
                message: self.failure_message(),
                buffer,
            }),
        }
    }

    fn failure_message(&self) -> String {
        match &*self.termination.borrow() {
            Some(Termination::Failed(message)) => message.clone(),
            _ => "read failed".to_string(),
        }
    }
}

/// Drain `reader` into the shared buffer until it ends, fails, or the
/// session is closed.
fn spawn_reader(
    shared: Arc<Shared>,
    mut reader: Box<dyn Read + Send>,
    chunk: usize,
) -> io::Result<()> {
    thread::Builder::new()
        .name("expectty-reader".into())
        .spawn(move || {
            let mut buf = vec![0u8; chunk.max(1)];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => {
                        if shared.finish(SessionState::Eof, Termination::Eof) {
                            debug!("transport reached end of stream");
                        }
                        break;
                    }
                    Ok(n) => {
                        if !shared.append(&buf[..n]) {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        if shared.finish(SessionState::Errored, Termination::Failed(e.to_string())) {
                            warn!(error = %e, "transport read failed");
                        }
                        break;
                    }
                }
            }
        })?;
    Ok(())
}

/// Clears the pending-expect flag when an `expect` call returns.
struct ExpectGuard<'a>(&'a AtomicBool);

impl<'a> ExpectGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SessionError::ConcurrentUse)?;
        Ok(Self(flag))
    }
}

impl Drop for ExpectGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A live automation handle over one [`Transport`].
///
/// All methods take `&self`; wrap the session in an [`Arc`] to share it
/// between tasks. Only one `expect` may be pending at a time.
pub struct Session {
    shared: Arc<Shared>,
    writer: Mutex<Option<Box<dyn Write + Send>>>,
    transport: Mutex<Option<Box<dyn Transport>>>,
    options: SessionOptions,
    expecting: AtomicBool,
}

impl Session {
    /// Wrap `transport` and start its background reader.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] if the transport is closed or its
    /// reader cannot be taken.
    pub fn new(
        transport: impl Transport + 'static,
        options: SessionOptions,
    ) -> Result<(Self, TerminationSignal)> {
        let mut transport: Box<dyn Transport> = Box::new(transport);
        let reader = transport.take_reader().map_err(SessionError::Transport)?;
        let writer = match transport.take_writer() {
            Ok(writer) => writer,
            Err(e) => {
                let _ = transport.close();
                return Err(SessionError::Transport(e));
            }
        };

        let (termination, rx) = watch::channel(None);
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                buffer: OutputBuffer::new(options.buffer_cap),
                state: SessionState::Running,
                released: false,
            }),
            notify: Notify::new(),
            termination,
            mirror: options.mirror.clone(),
        });

        if let Err(e) = spawn_reader(shared.clone(), reader, options.read_chunk) {
            let _ = transport.close();
            return Err(SessionError::Transport(e));
        }
        debug!(?options, "session started");

        let session = Self {
            shared,
            writer: Mutex::new(Some(writer)),
            transport: Mutex::new(Some(transport)),
            options,
            expecting: AtomicBool::new(false),
        };
        Ok((session, TerminationSignal { rx }))
    }

    /// Spawn `command` in a pseudo-terminal and open a session on it.
    pub fn spawn<S: AsRef<str>>(
        command: &str,
        args: &[S],
        options: SessionOptions,
    ) -> Result<(Self, TerminationSignal)> {
        let transport = PtyTransport::spawn(command, args).map_err(SessionError::Transport)?;
        Self::new(transport, options)
    }

    /// Connect to `addr` over TCP and open a session on the stream.
    pub fn connect(
        addr: impl ToSocketAddrs,
        options: SessionOptions,
    ) -> Result<(Self, TerminationSignal)> {
        let transport = TcpTransport::connect(addr).map_err(SessionError::Transport)?;
        Self::new(transport, options)
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock().state
    }

    /// Write `data` verbatim. No line terminator is added.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Write`] if the session is closed or errored,
    /// or if the transport write fails.
    pub fn send(&self, data: impl AsRef<[u8]>) -> Result<()> {
        self.write(data.as_ref(), false)
    }

    /// Write `line` followed by `\n`.
    pub fn send_line(&self, line: impl AsRef<str>) -> Result<()> {
        let mut data = line.as_ref().as_bytes().to_vec();
        data.push(b'\n');
        self.write(&data, false)
    }

    /// Write `data` verbatim, keeping it out of the I/O mirror and logs.
    pub fn send_secret(&self, data: impl AsRef<[u8]>) -> Result<()> {
        self.write(data.as_ref(), true)
    }

    fn write(&self, data: &[u8], secret: bool) -> Result<()> {
        {
            let inner = self.shared.lock();
            match inner.state {
                SessionState::Closed => return Err(SessionError::Write(closed_error())),
                SessionState::Errored => {
                    return Err(SessionError::Write(io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        self.shared.failure_message(),
                    )));
                }
                SessionState::Running | SessionState::Eof => {}
            }
        }

        // Only writers contend for this lock, so `close` never waits behind a
        // write the other side is not draining.
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let writer = writer.as_mut().ok_or_else(|| SessionError::Write(closed_error()))?;
        writer
            .write_all(data)
            .and_then(|()| writer.flush())
            .map_err(SessionError::Write)?;

        if secret {
            trace!(data = "<redacted>", "sent");
        } else {
            trace!(bytes = data.len(), data = %String::from_utf8_lossy(data).escape_debug(), "sent");
            if let Some(mirror) = &self.shared.mirror {
                mirror(Direction::Sent, data);
            }
        }
        Ok(())
    }

    /// Wait for `pattern` using the session's default timeout.
    pub async fn expect(&self, pattern: impl IntoPattern) -> Result<MatchResult> {
        self.expect_timeout(pattern, self.options.default_timeout).await
    }

    /// Wait until the buffered output matches `pattern`, `timeout` elapses, or
    /// the stream ends.
    ///
    /// On a match, consumed bytes are removed from the buffer according to the
    /// session's [`ConsumePolicy`](crate::ConsumePolicy). On timeout the buffer
    /// is left untouched and returned inside the error.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Pattern`] if `pattern` does not compile.
    /// - [`SessionError::ConcurrentUse`] if another `expect` is pending.
    /// - [`SessionError::Timeout`] once the deadline passes.
    /// - [`SessionError::Eof`], [`SessionError::Closed`] or [`SessionError::Failed`]
    ///   once the stream has ended and the buffer no longer matches.
    pub async fn expect_timeout(
        &self,
        pattern: impl IntoPattern,
        timeout: Timeout,
    ) -> Result<MatchResult> {
        let pattern = pattern.into_pattern()?;
        let _guard = ExpectGuard::acquire(&self.expecting)?;
        let start = Instant::now();
        let deadline = timeout.deadline(start);

        loop {
            // Register for wakeups before inspecting the buffer so output that
            // arrives in between is not missed.
            let mut notified = pin!(self.shared.notify.notified());
            notified.as_mut().enable();

            {
                let mut inner = self.shared.lock();
                // Nothing can match a released buffer, not even an empty pattern.
                if inner.released {
                    if let Some(err) = self.shared.terminal_error(&inner) {
                        return Err(err);
                    }
                }
                if let Some(result) = inner.buffer.take_match(&pattern, self.options.consume) {
                    debug!(%pattern, index = result.index, matched = %result.matched.escape_debug(), "matched");
                    return Ok(result);
                }
                if let Some(err) = self.shared.terminal_error(&inner) {
                    debug!(%pattern, state = ?inner.state, "stream ended before a match");
                    return Err(err);
                }
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        let inner = self.shared.lock();
                        debug!(%pattern, %timeout, buffered = inner.buffer.len(), "expect timed out");
                        return Err(SessionError::Timeout {
                            timeout: deadline.duration_since(start),
                            pattern: pattern.to_string(),
                            buffer: inner.buffer.to_string_lossy(),
                        });
                    }
                }
                None => notified.await,
            }
        }
    }

    /// The current unconsumed output.
    pub fn buffer_snapshot(&self) -> String {
        self.shared.lock().buffer.to_string_lossy()
    }

    /// Discard all unconsumed output.
    pub fn clear_buffer(&self) {
        self.shared.lock().buffer.clear();
    }

    /// Stop the background reader, close the transport and release the buffer.
    ///
    /// A pending `expect` fails with [`SessionError::Closed`], and so does a
    /// `send` blocked on a peer that stopped reading. Calling `close` again is
    /// a no-op that returns `Ok(())`.
    pub fn close(&self) -> Result<()> {
        let Some(mut transport) = self
            .transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return Ok(());
        };

        {
            let mut inner = self.shared.lock();
            if inner.state != SessionState::Errored {
                inner.state = SessionState::Closed;
            }
            debug!(evicted = inner.buffer.evicted(), "closing session");
            inner.buffer.release();
            inner.released = true;
        }
        self.shared.latch(Termination::Closed);

        // A writer busy in a blocked `send` is released by the transport
        // close below and dropped with the session.
        match self.writer.try_lock() {
            Ok(mut writer) => drop(writer.take()),
            Err(TryLockError::Poisoned(poisoned)) => drop(poisoned.into_inner().take()),
            Err(TryLockError::WouldBlock) => debug!("closing while a write is in progress"),
        }

        transport.close().map_err(SessionError::Transport)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close transport on drop");
        }
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "session is closed")
}

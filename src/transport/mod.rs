//! The byte streams a [`Session`](crate::Session) can drive.
//!
//! A transport is split at session construction: its reader moves to the
//! session's background reader thread, its writer serves `send`, and the
//! transport itself is kept only to be closed.

mod fake;
mod pty;
mod tcp;

pub use fake::{FakeCli, FakeTransport, ROUTER_PROMPT};
pub use pty::PtyTransport;
pub use tcp::TcpTransport;

use std::io::{self, Read, Write};

pub trait Transport: Send {
    /// Hand over the read half. Called exactly once, when the session starts.
    ///
    /// Must fail if the transport is already closed.
    fn take_reader(&mut self) -> io::Result<Box<dyn Read + Send>>;

    /// Hand over the write half. Called exactly once, when the session starts.
    ///
    /// Must fail if the transport is already closed.
    fn take_writer(&mut self) -> io::Result<Box<dyn Write + Send>>;

    /// Release the underlying stream. A reader or writer blocked on this
    /// transport must return end-of-stream or an error afterwards.
    fn close(&mut self) -> io::Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn take_reader(&mut self) -> io::Result<Box<dyn Read + Send>> {
        (**self).take_reader()
    }

    fn take_writer(&mut self) -> io::Result<Box<dyn Write + Send>> {
        (**self).take_writer()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

pub(crate) fn already_closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "transport is closed")
}

pub(crate) fn already_taken(half: &str) -> io::Error {
    io::Error::other(format!("transport {half} already taken"))
}

use super::{Transport, already_closed, already_taken};
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use tracing::debug;

/// A plain TCP stream, e.g. a telnet-style device console.
pub struct TcpTransport {
    stream: Option<TcpStream>,
    reader_taken: bool,
}

impl TcpTransport {
    pub fn connect(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        debug!(peer = %stream.peer_addr()?, "connected");
        Ok(Self::from_stream(stream))
    }

    pub fn from_stream(stream: TcpStream) -> Self {
        Self {
            stream: Some(stream),
            reader_taken: false,
        }
    }
}

impl Transport for TcpTransport {
    fn take_reader(&mut self) -> io::Result<Box<dyn Read + Send>> {
        let stream = self.stream.as_ref().ok_or_else(already_closed)?;
        if self.reader_taken {
            return Err(already_taken("reader"));
        }
        let reader = stream.try_clone()?;
        self.reader_taken = true;
        Ok(Box::new(reader))
    }

    fn take_writer(&mut self) -> io::Result<Box<dyn Write + Send>> {
        let stream = self.stream.as_ref().ok_or_else(already_closed)?;
        Ok(Box::new(stream.try_clone()?))
    }

    fn close(&mut self) -> io::Result<()> {
        // Shutting down one handle also unblocks the cloned reader and writer.
        match self.stream.take() {
            // The peer may already have hung up.
            Some(stream) => match stream.shutdown(Shutdown::Both) {
                Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
                result => result,
            },
            None => Ok(()),
        }
    }
}

use super::{Transport, already_closed, already_taken};
use portable_pty::{Child, CommandBuilder, MasterPty, PtySize};
use std::io::{self, Read, Write};
use tracing::debug;

/// A program running inside a pseudo-terminal.
pub struct PtyTransport {
    master: Option<Box<dyn MasterPty + Send>>,
    child: Box<dyn Child + Send + Sync>,
    writer: Option<Box<dyn Write + Send>>,
    reader: Option<Box<dyn Read + Send>>,
}

impl PtyTransport {
    /// Spawn `command` in a new 24x80 PTY.
    pub fn spawn<S: AsRef<str>>(command: &str, args: &[S]) -> io::Result<Self> {
        let pty_system = portable_pty::native_pty_system();

        let pair = pty_system
            .openpty(PtySize {
                rows: 24,
                cols: 80,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| other(format!("failed to open PTY: {e}")))?;

        let mut cmd = CommandBuilder::new(command);
        for arg in args {
            cmd.arg(arg.as_ref());
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| other(format!("failed to spawn {command}: {e}")))?;

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| other(format!("failed to get PTY writer: {e}")))?;
        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| other(format!("failed to get PTY reader: {e}")))?;

        debug!(command, pid = child.process_id(), "spawned program in PTY");

        Ok(Self {
            master: Some(pair.master),
            child,
            writer: Some(writer),
            reader: Some(reader),
        })
    }

    /// Check if the child process is still running.
    pub fn is_running(&mut self) -> bool {
        self.child.try_wait().ok().flatten().is_none()
    }

    pub fn resize(&self, rows: u16, cols: u16) -> io::Result<()> {
        let master = self.master.as_ref().ok_or_else(already_closed)?;
        master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| other(e.to_string()))
    }
}

impl Transport for PtyTransport {
    fn take_reader(&mut self) -> io::Result<Box<dyn Read + Send>> {
        if self.master.is_none() {
            return Err(already_closed());
        }
        let reader = self.reader.take().ok_or_else(|| already_taken("reader"))?;
        Ok(Box::new(PtyReader(reader)))
    }

    fn take_writer(&mut self) -> io::Result<Box<dyn Write + Send>> {
        if self.master.is_none() {
            return Err(already_closed());
        }
        self.writer.take().ok_or_else(|| already_taken("writer"))
    }

    fn close(&mut self) -> io::Result<()> {
        if self.master.is_none() {
            return Ok(());
        }
        self.writer = None;
        if self.is_running() {
            self.child.kill()?;
        }
        self.child.wait()?;
        self.master = None;
        Ok(())
    }
}

/// Linux reports a hung-up PTY as `EIO` rather than a zero-length read.
struct PtyReader(Box<dyn Read + Send>);

impl Read for PtyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.0.read(buf) {
            #[cfg(unix)]
            Err(e) if e.raw_os_error() == Some(libc::EIO) => Ok(0),
            result => result,
        }
    }
}

fn other(message: String) -> io::Error {
    io::Error::other(message)
}

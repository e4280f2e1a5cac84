//! An in-memory command-line double.
//!
//! [`FakeCli`] answers each line written to it from a command table, the way a
//! network device's CLI answers `show` commands. Responses carry their own
//! trailing prompt; unknown commands get a `command: "..." not found` reply
//! with no prompt.

use super::{Transport, already_closed, already_taken};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::{self, JoinHandle};

pub const ROUTER_PROMPT: &str = "testrouter#";

const SHOW_VERSION: &str = r#"Cisco IOS Software, 3600 Software (C3660-I-M), Version 12.3(4)T
TAC Support: http://www.cisco.com/tac
Copyright (c) 1986-2003 by Cisco Systems, Inc.
Compiled Thu 18-Sep-03 15:37 by ccai
ROM: System Bootstrap, Version 12.0(6r)T, RELEASE SOFTWARE (fc1)
ROM:
C3660-1 uptime is 1 week, 3 days, 6 hours, 41 minutes
System returned to ROM by power-on
System image file is "slot0:tftpboot/c3660-i-mz.123-4.T"
Cisco 3660 (R527x) processor (revision 1.0) with 57344K/8192K bytes of memory.
Processor board ID JAB055180FF
R527x CPU at 225Mhz, Implementation 40, Rev 10.0, 2048KB L2 Cache
3660 Chassis type: ENTERPRISE
2 FastEthernet interfaces
4 Serial interfaces
DRAM configuration is 64 bits wide with parity disabled.
125K bytes of NVRAM.
16384K bytes of processor board System flash (Read/Write)
Flash card inserted. Reading filesystem...done.
20480K bytes of processor board PCMCIA Slot0 flash (Read/Write)
Configuration register is 0x2102
testrouter#"#;

const SHOW_SYSTEM_UPTIME: &str = "Current time:      1998-10-13 19:45:47 UTC
Time Source:       NTP CLOCK
System booted:     1998-10-12 20:51:41 UTC (22:54:06 ago)
Protocols started: 1998-10-13 19:33:45 UTC (00:12:02 ago)
Last configured:   1998-10-13 19:33:45 UTC (00:12:02 ago) by abc
12:45PM  up 22:54, 2 users, load averages: 0.07, 0.02, 0.01
testuser@testrouter#";

const SHOW_SYSTEM_USERS: &str = "7:30PM  up 4 days,  2:26, 2 users, load averages: 0.07, 0.02, 0.01
USER     TTY FROM              LOGIN@  IDLE WHAT
root     d0  -                Fri05PM 4days -csh (csh)
blue   p0 level5.company.net 7:30PM     - cli
testuser@testrouter#";

/// Builder for a scripted command-line backend.
#[derive(Debug, Clone, Default)]
pub struct FakeCli {
    responses: HashMap<String, String>,
    banner: Option<String>,
    hang_up_on: Option<String>,
}

impl FakeCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// A router answering `show version`, `show system uptime` and
    /// `show system users`.
    pub fn router() -> Self {
        Self::new()
            .respond("show version", SHOW_VERSION)
            .respond("show system uptime", SHOW_SYSTEM_UPTIME)
            .respond("show system users", SHOW_SYSTEM_USERS)
    }

    pub fn respond(mut self, command: impl Into<String>, output: impl Into<String>) -> Self {
        self.responses.insert(command.into(), output.into());
        self
    }

    /// Text emitted as soon as the backend starts.
    pub fn with_banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = Some(banner.into());
        self
    }

    /// End the stream after answering `command`.
    pub fn hang_up_on(mut self, command: impl Into<String>) -> Self {
        self.hang_up_on = Some(command.into());
        self
    }

    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.responses.keys().map(String::as_str)
    }

    fn reply(&self, line: &str) -> String {
        match self.responses.get(line) {
            Some(output) => output.clone(),
            None => format!("command: {line:?} not found"),
        }
    }

    /// Start the backend on its own thread and return the transport end.
    pub fn start(self) -> io::Result<FakeTransport> {
        let (input_tx, input_rx) = channel::<Input>();
        let (output_tx, output_rx) = channel::<Vec<u8>>();
        let worker = thread::Builder::new()
            .name("fake-cli".into())
            .spawn(move || self.serve(input_rx, output_tx))?;

        Ok(FakeTransport {
            input: Some(input_tx),
            reader: Some(ChannelReader {
                rx: output_rx,
                pending: Vec::new(),
                pos: 0,
            }),
            worker: Some(worker),
        })
    }

    fn serve(self, input: Receiver<Input>, output: Sender<Vec<u8>>) {
        if let Some(banner) = &self.banner {
            if output.send(banner.clone().into_bytes()).is_err() {
                return;
            }
        }

        let mut line = Vec::new();
        while let Ok(Input::Data(chunk)) = input.recv() {
            for byte in chunk {
                if byte != b'\n' {
                    line.push(byte);
                    continue;
                }
                let text = String::from_utf8_lossy(&line).trim_end_matches('\r').to_string();
                line.clear();

                if output.send(self.reply(&text).into_bytes()).is_err() {
                    return;
                }
                if self.hang_up_on.as_deref() == Some(text.as_str()) {
                    return;
                }
            }
        }
    }
}

/// What the transport end feeds the worker.
enum Input {
    Data(Vec<u8>),
    HangUp,
}

/// Transport end of a running [`FakeCli`].
pub struct FakeTransport {
    input: Option<Sender<Input>>,
    reader: Option<ChannelReader>,
    worker: Option<JoinHandle<()>>,
}

impl Transport for FakeTransport {
    fn take_reader(&mut self) -> io::Result<Box<dyn Read + Send>> {
        if self.input.is_none() {
            return Err(already_closed());
        }
        let reader = self.reader.take().ok_or_else(|| already_taken("reader"))?;
        Ok(Box::new(reader))
    }

    fn take_writer(&mut self) -> io::Result<Box<dyn Write + Send>> {
        let input = self.input.as_ref().ok_or_else(already_closed)?;
        Ok(Box::new(ChannelWriter { tx: input.clone() }))
    }

    fn close(&mut self) -> io::Result<()> {
        // Writers handed out earlier may still hold the channel open.
        if let Some(input) = self.input.take() {
            let _ = input.send(Input::HangUp);
        }
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| io::Error::other("fake CLI worker panicked"))?;
        }
        Ok(())
    }
}

struct ChannelWriter {
    tx: Sender<Input>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tx
            .send(Input::Data(buf.to_vec()))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "fake CLI has hung up"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Reads the chunks a [`FakeCli`] emits; end of stream once it stops.
struct ChannelReader {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    pos: usize,
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.pending.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.pending = chunk;
                    self.pos = 0;
                }
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len() - self.pos);
        buf[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_some(reader: &mut dyn Read) -> String {
        let mut buf = [0u8; 4096];
        let n = reader.read(&mut buf).unwrap();
        String::from_utf8_lossy(&buf[..n]).into_owned()
    }

    #[test]
    fn test_known_command_answers_with_prompt() {
        let mut transport = FakeCli::router().start().unwrap();
        let mut reader = transport.take_reader().unwrap();
        let mut writer = transport.take_writer().unwrap();
        writer.write_all(b"show version\n").unwrap();
        let out = read_some(&mut *reader);
        assert!(out.starts_with("Cisco IOS Software"));
        assert!(out.ends_with(ROUTER_PROMPT));
        transport.close().unwrap();
    }

    #[test]
    fn test_unknown_command_and_crlf() {
        let mut transport = FakeCli::router().start().unwrap();
        let mut reader = transport.take_reader().unwrap();
        let mut writer = transport.take_writer().unwrap();
        writer.write_all(b"reload\r\n").unwrap();
        assert_eq!(read_some(&mut *reader), "command: \"reload\" not found");
        transport.close().unwrap();
    }

    #[test]
    fn test_close_ends_stream() {
        let mut transport = FakeCli::new().start().unwrap();
        let mut reader = transport.take_reader().unwrap();
        let mut writer = transport.take_writer().unwrap();
        transport.close().unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
        assert!(writer.write_all(b"x\n").is_err());
        assert!(transport.take_writer().is_err());
    }

    #[test]
    fn test_reader_only_taken_once_and_not_after_close() {
        let mut transport = FakeCli::new().start().unwrap();
        assert!(transport.take_reader().is_ok());
        assert!(transport.take_reader().is_err());
        transport.close().unwrap();

        let mut closed = FakeCli::new().start().unwrap();
        closed.close().unwrap();
        assert!(closed.take_reader().is_err());
    }

    #[test]
    fn test_small_reads_split_chunks() {
        let mut transport = FakeCli::new().with_banner("hello").start().unwrap();
        let mut reader = transport.take_reader().unwrap();
        let mut buf = [0u8; 3];
        assert_eq!(reader.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"hel");
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"lo");
        transport.close().unwrap();
    }
}

//! # Expectty
//!
//! An expect-style session engine for automating terminal programs, shells,
//! and network device CLIs.
//!
//! A [`Session`] owns one [`Transport`] (a program in a PTY, a TCP stream, or
//! any custom byte stream). A background reader drains the transport into a
//! buffer while the caller alternates [`Session::send`] and
//! [`Session::expect`]; each `expect` waits for a regex to match the buffered
//! output, the deadline to pass, or the stream to end.
//!
//! ## Quick start
//!
//! ```no_run
//! use expectty::{Session, SessionOptions, Timeout};
//!
//! #[tokio::main]
//! async fn main() -> expectty::Result<()> {
//!     let (session, _done) = Session::spawn("sh", &[] as &[&str], SessionOptions::default())?;
//!     session.expect(r"\$ ?$").await?;
//!     session.send("echo 'hello world'\n")?;
//!     let m = session.expect_timeout("hello world", Timeout::from_secs(2)).await?;
//!     println!("saw {:?}", m.matched);
//!     session.send("exit\n")?;
//!     session.close()
//! }
//! ```
//!
//! `send` writes bytes exactly as given: remember the `\n`, or use
//! [`Session::send_line`].
//!
//! ## Timeouts
//!
//! [`Timeout`] is either `After(duration)` or `Never`. A timed-out `expect`
//! returns [`SessionError::Timeout`] carrying everything received so far, and
//! the session stays usable.
//!
//! ## Testing against a fake CLI
//!
//! ```
//! use expectty::{FakeCli, Session, SessionOptions, Timeout};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> expectty::Result<()> {
//! let transport = FakeCli::router().start().map_err(expectty::SessionError::Transport)?;
//! let (session, _done) = Session::new(transport, SessionOptions::default())?;
//! session.send("show version\n")?;
//! let m = session.expect_timeout("testrouter#$", Timeout::from_secs(1)).await?;
//! assert!(m.buffer.contains("Cisco IOS Software"));
//! session.close()
//! # }
//! ```
//!
//! ## Scripts
//!
//! The [`Engine`] runs a small line-oriented script language on top of a
//! session; see [`parse_str`].
//!
//! | Command | Description |
//! |---------|-------------|
//! | `send "text\n"` | Send bytes verbatim (escapes `\n \r \t \" \\`) |
//! | `sendline "text"` | Send text plus a newline |
//! | `secret "text\n"` | Send bytes that never reach logs or the output mirror |
//! | `type "text"` | Send one character at a time with random delays, then a newline |
//! | `expect "regex"` | Wait for a match with the default timeout |
//! | `expect "regex" 5s` | Wait up to 5 seconds (`never` for no limit) |
//! | `expect prompt` | Wait for the configured prompt pattern |
//! | `wait 500ms` | Pause (`ms` or `s` units, floats allowed) |
//! | `show "text"` | Write an annotation to the output handler |
//! | `# comment` | Full-line or inline comment |

mod buffer;
pub mod command;
pub mod commands;
pub mod engine;
pub mod error;
pub mod options;
pub mod parser;
pub mod pattern;
pub mod session;
pub mod transport;

pub use command::{Context, ScriptCommand};
pub use engine::Engine;
pub use error::{Result, SessionError};
pub use options::{BufferCap, ConsumePolicy, Direction, IoMirror, SessionOptions, Timeout};
pub use parser::{parse_file, parse_str};
pub use pattern::{IntoPattern, MatchResult, Pattern};
pub use session::{Session, SessionState, Termination, TerminationSignal};
pub use transport::{FakeCli, FakeTransport, PtyTransport, TcpTransport, Transport};

//! Errors returned by [`Session`](crate::Session) operations.
//!
//! Every variant that ends an `expect` carries the buffer observed at that
//! moment, so a caller can report what was actually received next to what
//! was expected.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Buffers longer than this are shown tail-first in error messages.
const MAX_SNIPPET: usize = 400;

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The transport could not be wrapped into a session (already closed,
    /// reader unavailable, reader thread could not start).
    #[error("transport unavailable: {0}")]
    Transport(#[source] io::Error),

    /// Writing to the transport failed, or the session no longer accepts input.
    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    /// No pattern matched before the deadline. The session is still usable.
    #[error("timeout after {timeout:?} waiting for {pattern}\n{}", snippet(buffer))]
    Timeout {
        timeout: Duration,
        pattern: String,
        buffer: String,
    },

    /// The stream ended cleanly before a match.
    #[error("end of stream before a match\n{}", snippet(buffer))]
    Eof { buffer: String },

    /// The session was closed before a match.
    #[error("session closed\n{}", snippet(buffer))]
    Closed { buffer: String },

    /// The stream failed with a read error before a match.
    #[error("stream failed: {message}\n{}", snippet(buffer))]
    Failed { message: String, buffer: String },

    /// A second `expect` was issued while another one was still waiting.
    #[error("an expect call is already pending on this session")]
    ConcurrentUse,

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// A pattern set with no alternatives, which could never match.
    #[error("invalid pattern: the pattern set is empty")]
    EmptyPattern,
}

impl SessionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// True when the session can no longer produce a match.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Eof { .. } | Self::Closed { .. } | Self::Failed { .. }
        )
    }

    /// The buffer content observed when the error was raised, if any.
    pub fn buffer(&self) -> Option<&str> {
        match self {
            Self::Timeout { buffer, .. }
            | Self::Eof { buffer }
            | Self::Closed { buffer }
            | Self::Failed { buffer, .. } => Some(buffer),
            _ => None,
        }
    }
}

fn snippet(buffer: &str) -> String {
    if buffer.is_empty() {
        return "received: (nothing)".to_string();
    }
    if buffer.len() <= MAX_SNIPPET {
        return format!("received ({} bytes): {:?}", buffer.len(), buffer);
    }
    let mut start = buffer.len() - MAX_SNIPPET;
    while !buffer.is_char_boundary(start) {
        start += 1;
    }
    format!(
        "received ({} bytes, showing the last {}): ...{:?}",
        buffer.len(),
        buffer.len() - start,
        &buffer[start..]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_shows_pattern_and_buffer() {
        let err = SessionError::Timeout {
            timeout: Duration::from_millis(250),
            pattern: "/router#/".to_string(),
            buffer: "command: \"bogus\" not found".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("250ms"));
        assert!(msg.contains("/router#/"));
        assert!(msg.contains("not found"));
        assert!(err.is_timeout());
        assert!(!err.is_terminal());
    }

    #[test]
    fn test_long_buffer_is_truncated_from_the_front() {
        let buffer = format!("{}TAIL", "x".repeat(2 * MAX_SNIPPET));
        let msg = snippet(&buffer);
        assert!(msg.contains("TAIL"));
        assert!(msg.len() < buffer.len());
    }

    #[test]
    fn test_buffer_accessor() {
        let err = SessionError::Eof {
            buffer: "bye".to_string(),
        };
        assert_eq!(err.buffer(), Some("bye"));
        assert!(err.is_terminal());
        assert_eq!(SessionError::ConcurrentUse.buffer(), None);
    }
}

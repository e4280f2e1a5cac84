//! Session construction options.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// How long an `expect` may wait.
///
/// `Never` is an explicit choice rather than a magic number, so "no limit"
/// can never be confused with "zero" or "use the default".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    Never,
    After(Duration),
}

impl Timeout {
    pub fn from_secs(secs: u64) -> Self {
        Timeout::After(Duration::from_secs(secs))
    }

    pub fn from_millis(millis: u64) -> Self {
        Timeout::After(Duration::from_millis(millis))
    }

    pub(crate) fn deadline(self, start: Instant) -> Option<Instant> {
        match self {
            Timeout::Never => None,
            // A deadline past the clock's range is as good as no deadline.
            Timeout::After(d) => start.checked_add(d),
        }
    }
}

impl Default for Timeout {
    fn default() -> Self {
        Timeout::from_secs(10)
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Timeout::After(d)
    }
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeout::Never => f.write_str("never"),
            Timeout::After(d) => write!(f, "{d:?}"),
        }
    }
}

/// Upper bound on buffered, unmatched output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferCap {
    Unbounded,
    /// Keep at most this many bytes, evicting the oldest first.
    Bounded(usize),
}

impl Default for BufferCap {
    fn default() -> Self {
        BufferCap::Bounded(64 * 1024)
    }
}

/// What a successful match removes from the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsumePolicy {
    /// Discard everything up to and including the end of the match.
    #[default]
    ThroughMatch,
    /// Remove only the matched bytes; text preceding the match stays
    /// available to later `expect` calls.
    MatchOnly,
}

/// Direction of bytes passed to an [`IoMirror`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Sent,
    Received,
}

/// Sink that observes every raw byte sent or received, for diagnostics.
pub type IoMirror = Arc<dyn Fn(Direction, &[u8]) + Send + Sync>;

/// Options for [`Session::new`](crate::Session::new).
///
/// ```
/// use expectty::{BufferCap, SessionOptions, Timeout};
///
/// let options = SessionOptions::default()
///     .with_timeout(Timeout::from_secs(2))
///     .with_buffer_cap(BufferCap::Unbounded);
/// assert_eq!(options.default_timeout, Timeout::from_secs(2));
/// ```
#[derive(Clone)]
pub struct SessionOptions {
    pub default_timeout: Timeout,
    pub buffer_cap: BufferCap,
    pub consume: ConsumePolicy,
    /// Size of each read issued by the background reader.
    pub read_chunk: usize,
    pub(crate) mirror: Option<IoMirror>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            default_timeout: Timeout::default(),
            buffer_cap: BufferCap::default(),
            consume: ConsumePolicy::default(),
            read_chunk: 4096,
            mirror: None,
        }
    }
}

impl SessionOptions {
    pub fn with_timeout(mut self, timeout: Timeout) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_buffer_cap(mut self, cap: BufferCap) -> Self {
        self.buffer_cap = cap;
        self
    }

    pub fn with_consume(mut self, policy: ConsumePolicy) -> Self {
        self.consume = policy;
        self
    }

    pub fn with_read_chunk(mut self, size: usize) -> Self {
        self.read_chunk = size.max(1);
        self
    }

    /// Mirror all raw I/O to `sink`.
    pub fn verbose<F>(mut self, sink: F) -> Self
    where
        F: Fn(Direction, &[u8]) + Send + Sync + 'static,
    {
        self.mirror = Some(Arc::new(sink));
        self
    }
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("default_timeout", &self.default_timeout)
            .field("buffer_cap", &self.buffer_cap)
            .field("consume", &self.consume)
            .field("read_chunk", &self.read_chunk)
            .field("mirror", &self.mirror.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_has_no_deadline() {
        let now = Instant::now();
        assert_eq!(Timeout::Never.deadline(now), None);
        assert_eq!(
            Timeout::from_millis(20).deadline(now),
            Some(now + Duration::from_millis(20))
        );
    }

    #[test]
    fn test_zero_is_not_never() {
        assert_ne!(Timeout::After(Duration::ZERO), Timeout::Never);
        assert!(Timeout::After(Duration::ZERO).deadline(Instant::now()).is_some());
    }

    #[test]
    fn test_defaults() {
        let opts = SessionOptions::default();
        assert_eq!(opts.default_timeout, Timeout::from_secs(10));
        assert_eq!(opts.buffer_cap, BufferCap::Bounded(65536));
        assert_eq!(opts.consume, ConsumePolicy::ThroughMatch);
        assert!(opts.mirror.is_none());
    }

    #[test]
    fn test_read_chunk_never_zero() {
        assert_eq!(SessionOptions::default().with_read_chunk(0).read_chunk, 1);
    }
}

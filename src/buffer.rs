use crate::options::{BufferCap, ConsumePolicy};
use crate::pattern::{Found, MatchResult, Pattern};

/// Output accumulated since the last consuming match.
#[derive(Debug)]
pub(crate) struct OutputBuffer {
    data: Vec<u8>,
    cap: BufferCap,
    evicted: u64,
}

impl OutputBuffer {
    pub fn new(cap: BufferCap) -> Self {
        Self {
            data: Vec::new(),
            cap,
            evicted: 0,
        }
    }

    /// Append a chunk in read order, evicting the oldest bytes past the cap.
    pub fn append(&mut self, chunk: &[u8]) {
        self.data.extend_from_slice(chunk);
        if let BufferCap::Bounded(max) = self.cap {
            if self.data.len() > max {
                let excess = self.data.len() - max;
                self.data.drain(..excess);
                self.evicted += excess as u64;
            }
        }
    }

    /// Find `pattern` and, if it matches, remove the consumed bytes per `policy`.
    pub fn take_match(&mut self, pattern: &Pattern, policy: ConsumePolicy) -> Option<MatchResult> {
        let found = pattern.find(&self.data)?;
        let result = self.describe(&found);
        match policy {
            ConsumePolicy::ThroughMatch => {
                self.data.drain(..found.end);
            }
            ConsumePolicy::MatchOnly => {
                self.data.drain(found.start..found.end);
            }
        }
        Some(result)
    }

    fn describe(&self, found: &Found) -> MatchResult {
        let text = |start: usize, end: usize| String::from_utf8_lossy(&self.data[start..end]).into_owned();
        MatchResult {
            index: found.index,
            matched: text(found.start, found.end),
            captures: found
                .captures
                .iter()
                .map(|c| c.map(|(s, e)| text(s, e)))
                .collect(),
            before: text(0, found.start),
            buffer: self.to_string_lossy(),
        }
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Drop the contents and free the allocation.
    pub fn release(&mut self) {
        self.data = Vec::new();
    }

    /// Total bytes dropped by the cap since creation.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}

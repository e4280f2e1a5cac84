//! Patterns matched against buffered session output.
//!
//! A [`Pattern`] holds one or more alternatives. When several are given they
//! are tried in the order supplied, and the first alternative that matches
//! anywhere in the buffer wins, even if a later one would match earlier.

use crate::error::{Result, SessionError};
use regex::bytes::Regex;
use std::fmt;

#[derive(Clone)]
enum Matcher {
    Literal(String),
    Regex(Regex),
}

impl Matcher {
    fn find(&self, haystack: &[u8]) -> Option<Found> {
        match self {
            Matcher::Literal(text) => {
                let needle = text.as_bytes();
                let start = if needle.is_empty() {
                    Some(0)
                } else {
                    haystack.windows(needle.len()).position(|w| w == needle)
                }?;
                Some(Found {
                    index: 0,
                    start,
                    end: start + needle.len(),
                    captures: Vec::new(),
                })
            }
            Matcher::Regex(re) => {
                let caps = re.captures(haystack)?;
                let whole = caps.get(0)?;
                Some(Found {
                    index: 0,
                    start: whole.start(),
                    end: whole.end(),
                    captures: caps
                        .iter()
                        .skip(1)
                        .map(|m| m.map(|m| (m.start(), m.end())))
                        .collect(),
                })
            }
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Literal(text) => write!(f, "{text:?}"),
            Matcher::Regex(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

/// A compiled matcher over session output.
#[derive(Clone)]
pub struct Pattern {
    alternatives: Vec<Matcher>,
}

impl Pattern {
    /// Compile a regular expression.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Pattern`](crate::SessionError::Pattern) if the
    /// expression is malformed.
    pub fn new(regex: &str) -> Result<Self> {
        Ok(Self {
            alternatives: vec![Matcher::Regex(Regex::new(regex)?)],
        })
    }

    /// Match `text` verbatim, with no regex interpretation.
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            alternatives: vec![Matcher::Literal(text.into())],
        }
    }

    /// Compile a set of regular expressions evaluated in first-match-wins order.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyPattern`](crate::SessionError::EmptyPattern)
    /// for an empty set and [`SessionError::Pattern`](crate::SessionError::Pattern)
    /// if any expression is malformed.
    ///
    /// ```
    /// use expectty::Pattern;
    ///
    /// let pattern = Pattern::any(["Password:", r"\$ $"]).unwrap();
    /// assert_eq!(pattern.len(), 2);
    /// ```
    pub fn any<I, S>(regexes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let alternatives = regexes
            .into_iter()
            .map(|re| Regex::new(re.as_ref()).map(Matcher::Regex))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if alternatives.is_empty() {
            return Err(SessionError::EmptyPattern);
        }
        Ok(Self { alternatives })
    }

    /// Append the alternatives of `other` after this pattern's own.
    pub fn or(mut self, other: Pattern) -> Self {
        self.alternatives.extend(other.alternatives);
        self
    }

    pub fn len(&self) -> usize {
        self.alternatives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }

    pub(crate) fn find(&self, haystack: &[u8]) -> Option<Found> {
        self.alternatives
            .iter()
            .enumerate()
            .find_map(|(index, m)| m.find(haystack).map(|found| Found { index, ..found }))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, alt) in self.alternatives.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{alt}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({self})")
    }
}

/// Byte offsets of a match inside the buffer it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Found {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub captures: Vec<Option<(usize, usize)>>,
}

/// The outcome of a successful `expect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    /// Which alternative of the pattern matched.
    pub index: usize,
    pub matched: String,
    /// Regex capture groups, excluding the whole match.
    pub captures: Vec<Option<String>>,
    /// Buffered text preceding the match.
    pub before: String,
    /// The full buffer observed at match time.
    pub buffer: String,
}

impl MatchResult {
    pub fn capture(&self, group: usize) -> Option<&str> {
        self.captures.get(group)?.as_deref()
    }
}

/// Conversion into a [`Pattern`], performed before an `expect` starts waiting
/// so that a malformed expression is reported immediately.
pub trait IntoPattern {
    fn into_pattern(self) -> Result<Pattern>;
}

impl IntoPattern for Pattern {
    fn into_pattern(self) -> Result<Pattern> {
        Ok(self)
    }
}

impl IntoPattern for &Pattern {
    fn into_pattern(self) -> Result<Pattern> {
        Ok(self.clone())
    }
}

impl IntoPattern for &str {
    fn into_pattern(self) -> Result<Pattern> {
        Pattern::new(self)
    }
}

impl IntoPattern for String {
    fn into_pattern(self) -> Result<Pattern> {
        Pattern::new(&self)
    }
}

impl IntoPattern for &String {
    fn into_pattern(self) -> Result<Pattern> {
        Pattern::new(self)
    }
}

impl IntoPattern for Regex {
    fn into_pattern(self) -> Result<Pattern> {
        Ok(Pattern {
            alternatives: vec![Matcher::Regex(self)],
        })
    }
}

impl<const N: usize> IntoPattern for [&str; N] {
    fn into_pattern(self) -> Result<Pattern> {
        Pattern::any(self)
    }
}

impl IntoPattern for &[&str] {
    fn into_pattern(self) -> Result<Pattern> {
        Pattern::any(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_match_offsets() {
        let p = Pattern::new(r"router#").unwrap();
        let found = p.find(b"show version\ntestrouter#").unwrap();
        assert_eq!(found.index, 0);
        assert_eq!(found.start, 17);
        assert_eq!(found.end, 24);
    }

    #[test]
    fn test_first_alternative_in_order_wins() {
        let p = Pattern::any(["world", "hello"]).unwrap();
        let found = p.find(b"hello world").unwrap();
        assert_eq!(found.index, 0);
        assert_eq!(found.start, 6);
    }

    #[test]
    fn test_later_alternative_used_when_first_misses() {
        let p = Pattern::any(["Password:", r"\$ $"]).unwrap();
        let found = p.find(b"user@host:~$ ").unwrap();
        assert_eq!(found.index, 1);
    }

    #[test]
    fn test_literal_ignores_regex_syntax() {
        let p = Pattern::literal("$ ");
        assert!(p.find(b"sh-5.2$ ").is_some());
        assert!(p.find(b"no prompt").is_none());
    }

    #[test]
    fn test_captures() {
        let p = Pattern::new(r"Version (\d+)\.(\d+)(x)?").unwrap();
        let found = p.find(b"Version 12.3(4)T").unwrap();
        assert_eq!(found.captures, vec![Some((8, 10)), Some((11, 12)), None]);
    }

    #[test]
    fn test_malformed_pattern_is_rejected() {
        let err = "(unclosed".into_pattern().unwrap_err();
        assert!(matches!(err, SessionError::Pattern(_)));
        assert!(Pattern::any(["ok", "[bad"]).is_err());
    }

    #[test]
    fn test_empty_set_is_rejected() {
        assert!(matches!(
            Pattern::any(Vec::<&str>::new()),
            Err(SessionError::EmptyPattern)
        ));
        let none: [&str; 0] = [];
        assert!(matches!(none.into_pattern(), Err(SessionError::EmptyPattern)));
        assert!(matches!(
            (&[] as &[&str]).into_pattern(),
            Err(SessionError::EmptyPattern)
        ));
    }

    #[test]
    fn test_or_keeps_order_and_display() {
        let p = Pattern::literal("a").or(Pattern::new("b+").unwrap());
        assert_eq!(p.len(), 2);
        assert_eq!(p.to_string(), "\"a\" | /b+/");
    }
}

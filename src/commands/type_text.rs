//! [`TypeText`] command: sends a line one keystroke at a time.
//!
//! Script syntax: `type "text here"`

use crate::command::{Context, ScriptCommand};
use crate::parser::parse_quoted_string;
use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

/// Writes `text` to the session one character at a time with random
/// per-character delays, then submits it with `\n`. Useful when the program
/// on the other end reacts to individual keystrokes, or when recording demos.
pub struct TypeText {
    pub text: String,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl TypeText {
    pub const NAME: &'static str = "type";

    /// Default timing is 50 to 150 ms per character.
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_timing(text, Duration::from_millis(50), Duration::from_millis(150))
    }

    pub fn with_timing(text: impl Into<String>, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            text: text.into(),
            min_delay: min_delay.min(max_delay),
            max_delay,
        }
    }

    fn next_delay(&self) -> Duration {
        let ms = rand::thread_rng()
            .gen_range(self.min_delay.as_millis()..=self.max_delay.as_millis());
        Duration::from_millis(ms as u64)
    }
}

#[async_trait(?Send)]
impl ScriptCommand for TypeText {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        Ok(Self::new(parse_quoted_string(args)?))
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        let mut utf8 = [0u8; 4];
        for ch in self.text.chars() {
            ctx.session().send(ch.encode_utf8(&mut utf8).as_bytes())?;
            sleep(self.next_delay()).await;
        }
        ctx.session().send(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let cmd = TypeText::parse(r#""show system users""#).unwrap();
        assert_eq!(cmd.text, "show system users");
    }

    #[test]
    fn test_parse_escaped_quotes() {
        let cmd = TypeText::parse(r#""echo \"hi\"""#).unwrap();
        assert_eq!(cmd.text, r#"echo "hi""#);
    }

    #[test]
    fn test_default_timing() {
        let cmd = TypeText::new("hello");
        assert_eq!(cmd.min_delay, Duration::from_millis(50));
        assert_eq!(cmd.max_delay, Duration::from_millis(150));
    }

    #[test]
    fn test_delay_within_bounds() {
        let cmd = TypeText::with_timing("hi", Duration::from_millis(10), Duration::from_millis(20));
        for _ in 0..50 {
            let d = cmd.next_delay();
            assert!(d >= Duration::from_millis(10) && d <= Duration::from_millis(20));
        }
    }

    #[test]
    fn test_inverted_bounds_are_clamped() {
        let cmd = TypeText::with_timing("hi", Duration::from_millis(30), Duration::from_millis(5));
        assert_eq!(cmd.min_delay, Duration::from_millis(5));
        assert_eq!(cmd.next_delay(), Duration::from_millis(5));
    }
}

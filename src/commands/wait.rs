//! [`Wait`] command: pauses the script while the session keeps reading.
//!
//! Script syntax: `wait 500ms` or `wait 1.5s`

use crate::command::{Context, ScriptCommand};
use crate::parser::parse_duration;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Pauses for a fixed duration. Output that arrives meanwhile accumulates
/// in the session buffer for the next `expect`.
pub struct Wait {
    pub duration: Duration,
}

impl Wait {
    pub const NAME: &'static str = "wait";

    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

#[async_trait(?Send)]
impl ScriptCommand for Wait {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        Ok(Self::new(parse_duration(args)?))
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        sleep(self.duration).await;
        debug!(
            duration = ?self.duration,
            buffered = ctx.session().buffer_snapshot().len(),
            state = ?ctx.session().state(),
            "wait finished"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_durations() {
        for (arg, expected) in [
            ("1s", Duration::from_secs(1)),
            ("500ms", Duration::from_millis(500)),
            ("1.5s", Duration::from_millis(1500)),
            (" 0ms ", Duration::ZERO),
        ] {
            assert_eq!(Wait::parse(arg).unwrap().duration, expected, "arg: {arg:?}");
        }
    }

    #[test]
    fn test_timeout_keywords_are_not_durations() {
        assert!(Wait::parse("never").is_err());
        assert!(Wait::parse("prompt").is_err());
        assert!(Wait::parse("5minutes").is_err());
    }
}

//! [`Expect`] command: blocks until a pattern matches the session output.
//!
//! Script syntax:
//! - `expect "\$ $"`: regex, session default timeout
//! - `expect "Password:" 10s`: custom timeout
//! - `expect prompt never`: the configured prompt, no time limit

use crate::command::{Context, ScriptCommand};
use crate::options::Timeout;
use crate::parser::{parse_timeout, split_quoted};
use crate::pattern::Pattern;
use anyhow::{Context as _, Result, anyhow};
use async_trait::async_trait;
use tracing::info;

/// What an [`Expect`] waits for.
#[derive(Debug, Clone)]
pub enum ExpectTarget {
    Pattern(Pattern),
    /// The engine's configured prompt pattern.
    Prompt,
}

/// Blocks until the target matches, the timeout elapses, or the stream ends.
///
/// The regex is compiled while parsing, so a malformed pattern fails the
/// whole script before anything is sent.
#[derive(Debug, Clone)]
pub struct Expect {
    pub target: ExpectTarget,
    /// `None` uses the session's default timeout.
    pub timeout: Option<Timeout>,
}

impl Expect {
    pub const NAME: &'static str = "expect";

    pub fn new(pattern: Pattern) -> Self {
        Self {
            target: ExpectTarget::Pattern(pattern),
            timeout: None,
        }
    }

    pub fn prompt() -> Self {
        Self {
            target: ExpectTarget::Prompt,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Timeout) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait(?Send)]
impl ScriptCommand for Expect {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        let args = args.trim();
        let (cmd, remainder) = if let Some(rest) = args.strip_prefix("prompt") {
            if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
                return Err(anyhow!("Expected quoted pattern or 'prompt' after 'expect'"));
            }
            (Self::prompt(), rest)
        } else if args.starts_with('"') {
            let (source, rest) = split_quoted(args)?;
            let pattern =
                Pattern::new(&source).with_context(|| format!("Invalid pattern: {source:?}"))?;
            (Self::new(pattern), rest)
        } else {
            return Err(anyhow!("Expected quoted pattern or 'prompt' after 'expect'"));
        };

        let remainder = remainder.trim();
        if remainder.is_empty() {
            Ok(cmd)
        } else {
            Ok(cmd.with_timeout(parse_timeout(remainder)?))
        }
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        let pattern = match &self.target {
            ExpectTarget::Pattern(pattern) => pattern.clone(),
            ExpectTarget::Prompt => ctx.prompt().clone(),
        };
        let result = ctx.expect(&pattern, self.timeout).await?;
        info!(%pattern, matched = %result.matched.escape_debug(), "expect satisfied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_default_timeout() {
        let cmd = Expect::parse(r#""\$ ""#).unwrap();
        assert!(matches!(cmd.target, ExpectTarget::Pattern(_)));
        assert_eq!(cmd.timeout, None);
    }

    #[test]
    fn test_parse_custom_timeout() {
        let cmd = Expect::parse(r#""hello world" 2s"#).unwrap();
        assert_eq!(cmd.timeout, Some(Timeout::After(Duration::from_secs(2))));
    }

    #[test]
    fn test_parse_never() {
        let cmd = Expect::parse(r#""Ready" never"#).unwrap();
        assert_eq!(cmd.timeout, Some(Timeout::Never));
    }

    #[test]
    fn test_parse_prompt_keyword() {
        let cmd = Expect::parse("prompt 500ms").unwrap();
        assert!(matches!(cmd.target, ExpectTarget::Prompt));
        assert_eq!(cmd.timeout, Some(Timeout::from_millis(500)));
        assert!(matches!(Expect::parse("prompt").unwrap().target, ExpectTarget::Prompt));
        assert!(Expect::parse("prompts").is_err());
    }

    #[test]
    fn test_parse_invalid_regex() {
        let err = Expect::parse(r#""(oops""#).unwrap_err().to_string();
        assert!(err.contains("Invalid pattern"), "got: {err}");
    }

    #[test]
    fn test_parse_unclosed_quote() {
        assert!(Expect::parse(r#""unclosed"#).is_err());
    }

    #[test]
    fn test_parse_missing_quote() {
        assert!(Expect::parse("no_quotes").is_err());
    }
}

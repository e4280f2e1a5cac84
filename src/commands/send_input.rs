//! Commands that write to the program: [`SendInput`], [`SendLine`] and [`SendSecret`].
//!
//! Script syntax:
//! - `send "show version\n"`: bytes exactly as written, escapes included
//! - `sendline "show version"`: the text plus a trailing newline
//! - `secret "hunter2\n"`: like `send`, but never mirrored or logged

use crate::command::{Context, ScriptCommand};
use crate::parser::parse_quoted_string;
use anyhow::Result;
use async_trait::async_trait;

/// Sends bytes to the program verbatim. No line terminator is added.
pub struct SendInput {
    pub data: Vec<u8>,
}

impl SendInput {
    pub const NAME: &'static str = "send";

    pub fn new(text: impl Into<String>) -> Self {
        Self {
            data: text.into().into_bytes(),
        }
    }
}

#[async_trait(?Send)]
impl ScriptCommand for SendInput {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        Ok(Self::new(parse_quoted_string(args)?))
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        ctx.session().send(&self.data)?;
        Ok(())
    }
}

/// Sends a line of text followed by `\n`.
pub struct SendLine {
    pub line: String,
}

impl SendLine {
    pub const NAME: &'static str = "sendline";
}

#[async_trait(?Send)]
impl ScriptCommand for SendLine {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        Ok(Self {
            line: parse_quoted_string(args)?,
        })
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        ctx.session().send_line(&self.line)?;
        Ok(())
    }
}

/// Sends a password or other secret without exposing it in logs or the mirror.
pub struct SendSecret {
    data: Vec<u8>,
}

impl SendSecret {
    pub const NAME: &'static str = "secret";
}

#[async_trait(?Send)]
impl ScriptCommand for SendSecret {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        Ok(Self {
            data: parse_quoted_string(args)?.into_bytes(),
        })
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        ctx.session().send_secret(&self.data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_is_verbatim() {
        let cmd = SendInput::parse(r#""show version""#).unwrap();
        assert_eq!(cmd.data, b"show version");
        let cmd = SendInput::parse(r#""show version\r\n""#).unwrap();
        assert_eq!(cmd.data, b"show version\r\n");
    }

    #[test]
    fn test_sendline_keeps_text() {
        let cmd = SendLine::parse(r#""exit""#).unwrap();
        assert_eq!(cmd.line, "exit");
    }

    #[test]
    fn test_secret_parse() {
        let cmd = SendSecret::parse(r#""p4ss\n""#).unwrap();
        assert_eq!(cmd.data, b"p4ss\n");
        assert!(SendSecret::parse("unquoted").is_err());
    }
}

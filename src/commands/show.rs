//! [`Show`] command: labels the captured transcript.
//!
//! Script syntax: `show "-- after login --"`

use crate::command::{Context, ScriptCommand};
use crate::parser::parse_quoted_string;
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

/// An annotation for whoever reads the output. Nothing reaches the program;
/// the text goes to the output handler on a line of its own, so it never
/// runs into the program's prompt.
pub struct Show {
    pub text: String,
}

impl Show {
    pub const NAME: &'static str = "show";

    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    fn framed(&self) -> Vec<u8> {
        format!("\n{}\n", self.text).into_bytes()
    }
}

#[async_trait(?Send)]
impl ScriptCommand for Show {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        Ok(Self::new(parse_quoted_string(args)?))
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        info!(note = %self.text, "annotation");
        ctx.emit(&self.framed());
        Ok(())
    }
}

//! The [`ScriptCommand`] trait and the [`Context`] type commands receive when executed.

use crate::error::SessionError;
use crate::options::Timeout;
use crate::pattern::{MatchResult, Pattern};
use crate::session::Session;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub(crate) type OutputHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Execution context passed to [`ScriptCommand::execute`].
///
/// Provides access to the session, the output handler, and the prompt pattern
/// that `expect prompt` resolves to.
pub struct Context {
    pub(crate) session: Session,
    pub(crate) output_handler: OutputHandler,
    pub(crate) prompt: Pattern,
}

impl Context {
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Pass bytes through the output handler (e.g. to stdout or a custom sink).
    pub fn emit(&self, data: &[u8]) {
        (self.output_handler)(data);
    }

    pub fn prompt(&self) -> &Pattern {
        &self.prompt
    }

    /// Wait for `pattern`, falling back to the session's default timeout.
    pub async fn expect(
        &self,
        pattern: &Pattern,
        timeout: Option<Timeout>,
    ) -> std::result::Result<MatchResult, SessionError> {
        let timeout = timeout.unwrap_or(self.session.options().default_timeout);
        self.session.expect_timeout(pattern, timeout).await
    }
}

/// A single script command.
///
/// Implement this trait to add a new command to the engine. Then:
///
/// 1. Define `pub const NAME: &'static str` on your struct, the script
///    keyword (e.g. `"send"`, `"expect"`) used by the parser.
/// 2. Re-export the struct from `src/commands/mod.rs`.
/// 3. Add one entry to the `REGISTRY` in [`crate::parser`]:
///    `(MyCmd::NAME, MyCmd::parse_boxed)`.
#[async_trait(?Send)]
pub trait ScriptCommand: 'static {
    /// The command name, accessible at runtime through a trait object.
    fn name(&self) -> &'static str;

    /// Parse this command from the argument string (everything after the
    /// command keyword on the script line).
    fn parse(args: &str) -> Result<Self>
    where
        Self: Sized;

    /// Parse and box this command; the function-pointer type stored in the
    /// command registry.
    fn parse_boxed(args: &str) -> Result<Box<dyn ScriptCommand>>
    where
        Self: Sized,
    {
        Ok(Box::new(Self::parse(args)?))
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()>;
}

use crate::command::{Context, OutputHandler, ScriptCommand};
use crate::options::{Direction, SessionOptions};
use crate::pattern::Pattern;
use crate::session::{Session, TerminationSignal};
use crate::transport::Transport;
use anyhow::{Context as _, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Prompt used by `expect prompt` unless [`Engine::with_prompt`] overrides it.
pub const DEFAULT_PROMPT: &str = r"[#$>] ?$";

/// Runs script commands, in order, against one [`Session`].
///
/// Program output is forwarded to an output handler as it arrives, and the
/// session is always closed when the script finishes or fails.
pub struct Engine {
    ctx: Context,
    termination: TerminationSignal,
}

impl Engine {
    /// Spawn `command` in a PTY, forwarding its output to `handler`.
    pub fn spawn_with_handler<S, F>(
        command: &str,
        args: &[S],
        options: SessionOptions,
        handler: F,
    ) -> Result<Self>
    where
        S: AsRef<str>,
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        let handler: OutputHandler = Arc::new(handler);
        let (session, termination) = Session::spawn(command, args, mirror_received(options, &handler))
            .with_context(|| format!("Failed to spawn {command}"))?;
        Self::from_session(session, termination, handler)
    }

    /// Run against any transport, forwarding output to `handler`.
    pub fn with_transport<F>(
        transport: impl Transport + 'static,
        options: SessionOptions,
        handler: F,
    ) -> Result<Self>
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        let handler: OutputHandler = Arc::new(handler);
        let (session, termination) = Session::new(transport, mirror_received(options, &handler))
            .context("Failed to open session")?;
        Self::from_session(session, termination, handler)
    }

    fn from_session(
        session: Session,
        termination: TerminationSignal,
        handler: OutputHandler,
    ) -> Result<Self> {
        Ok(Engine {
            ctx: Context {
                session,
                output_handler: handler,
                prompt: Pattern::new(DEFAULT_PROMPT)?,
            },
            termination,
        })
    }

    /// Pattern that `expect prompt` waits for.
    pub fn with_prompt(mut self, prompt: Pattern) -> Self {
        self.ctx.prompt = prompt;
        self
    }

    pub fn session(&self) -> &Session {
        &self.ctx.session
    }

    pub fn termination(&self) -> &TerminationSignal {
        &self.termination
    }

    /// Execute `commands` in order, stopping at the first failure, then close
    /// the session.
    pub async fn execute(&mut self, commands: Vec<Box<dyn ScriptCommand>>) -> Result<()> {
        let total = commands.len();
        let mut outcome = Ok(());
        for (i, cmd) in commands.iter().enumerate() {
            debug!(step = i + 1, total, command = cmd.name(), "executing");
            if let Err(e) = cmd.execute(&mut self.ctx).await {
                outcome = Err(e.context(format!("Step {} ({}) failed", i + 1, cmd.name())));
                break;
            }
        }

        let closed = self.ctx.session.close().context("Failed to close session");
        info!(steps = total, ok = outcome.is_ok(), "script finished");
        outcome.and(closed)
    }
}

/// Route received bytes to `handler`. Replaces any mirror already set on `options`.
fn mirror_received(options: SessionOptions, handler: &OutputHandler) -> SessionOptions {
    let handler = handler.clone();
    options.verbose(move |direction, data| {
        if direction == Direction::Received {
            handler(data);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;
    use crate::session::{SessionState, Termination};
    use crate::transport::FakeCli;
    use std::sync::Mutex;

    fn router_engine() -> (Engine, Arc<Mutex<Vec<u8>>>) {
        let output = Arc::new(Mutex::new(Vec::new()));
        let sink = output.clone();
        let transport = FakeCli::router().start().unwrap();
        let engine = Engine::with_transport(transport, SessionOptions::default(), move |data| {
            sink.lock().unwrap().extend_from_slice(data)
        })
        .unwrap();
        (engine, output)
    }

    #[tokio::test]
    async fn test_script_runs_and_closes_session() {
        let (mut engine, output) = router_engine();
        let commands = parse_str(
            "send \"show system uptime\\n\"\nexpect prompt 1s\nshow \"done\"\n",
        )
        .unwrap();

        engine.execute(commands).await.unwrap();

        let output = String::from_utf8_lossy(&output.lock().unwrap()).into_owned();
        assert!(output.contains("NTP CLOCK"));
        assert!(output.ends_with("\ndone\n"));
        assert_eq!(engine.session().state(), SessionState::Closed);
        assert_eq!(engine.termination().try_get(), Some(Termination::Closed));
    }

    #[tokio::test]
    async fn test_failing_step_is_reported_and_session_closed() {
        let (mut engine, _output) = router_engine();
        engine = engine.with_prompt(Pattern::literal("never-printed>"));
        let commands = parse_str("send \"show version\\n\"\nexpect prompt 100ms\nshow \"x\"\n").unwrap();

        let err = format!("{:#}", engine.execute(commands).await.unwrap_err());
        assert!(err.contains("Step 2 (expect) failed"), "got: {err}");
        assert!(err.contains("Configuration register is 0x2102"), "got: {err}");
        assert_eq!(engine.session().state(), SessionState::Closed);
    }
}

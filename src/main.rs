use anyhow::{Context, Result, anyhow};
use clap::{ArgGroup, Parser};
use expectty::parser::parse_timeout;
use expectty::{
    BufferCap, ConsumePolicy, Engine, FakeCli, Pattern, SessionOptions, TcpTransport, Timeout,
    parse_file,
};
use std::io::Write;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "expectty",
    about = "Run an expect script against a terminal program, a TCP endpoint, or a fake router",
    version
)]
#[command(group(ArgGroup::new("backend").required(true).args(["command", "connect", "fake_router"])))]
struct Args {
    /// Path to the script file
    #[arg(short, long)]
    script: String,

    /// Program to run in a PTY
    #[arg(short, long)]
    command: Option<String>,

    /// Connect to HOST:PORT over TCP instead of spawning a program
    #[arg(long, value_name = "HOST:PORT")]
    connect: Option<String>,

    /// Run against the built-in fake router CLI
    #[arg(long)]
    fake_router: bool,

    /// Default expect timeout (`10s`, `500ms`, or `never`)
    #[arg(short, long, default_value = "10s", value_parser = parse_timeout)]
    timeout: Timeout,

    /// Regex that `expect prompt` waits for
    #[arg(short, long)]
    prompt: Option<String>,

    /// Maximum buffered bytes (`unbounded` to disable the cap)
    #[arg(long, default_value = "65536", value_parser = parse_buffer_cap)]
    buffer_cap: BufferCap,

    /// Keep text preceding a match in the buffer; only the match is consumed
    #[arg(long)]
    retain_prefix: bool,

    /// Do not echo program output to stdout
    #[arg(short, long)]
    quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Arguments to pass to the command
    #[arg(trailing_var_arg = true)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let commands = parse_file(&args.script)
        .with_context(|| format!("Failed to parse script file: {}", args.script))?;

    let options = SessionOptions::default()
        .with_timeout(args.timeout)
        .with_buffer_cap(args.buffer_cap)
        .with_consume(if args.retain_prefix {
            ConsumePolicy::MatchOnly
        } else {
            ConsumePolicy::ThroughMatch
        });

    let mut engine = build_engine(&args, options)?;
    if let Some(prompt) = &args.prompt {
        let prompt = Pattern::new(prompt).with_context(|| format!("Invalid prompt: {prompt}"))?;
        engine = engine.with_prompt(prompt);
    }

    engine
        .execute(commands)
        .await
        .context("Failed to execute script")?;

    Ok(())
}

fn build_engine(args: &Args, options: SessionOptions) -> Result<Engine> {
    let quiet = args.quiet;
    let sink = move |data: &[u8]| {
        if !quiet {
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(data).and_then(|_| stdout.flush());
        }
    };

    if let Some(command) = &args.command {
        Engine::spawn_with_handler(command, &args.args, options, sink)
    } else if let Some(addr) = &args.connect {
        let transport = TcpTransport::connect(addr.as_str())
            .with_context(|| format!("Failed to connect to {addr}"))?;
        Engine::with_transport(transport, options, sink)
    } else if args.fake_router {
        let transport = FakeCli::router()
            .start()
            .context("Failed to start fake router")?;
        Engine::with_transport(transport, options, sink)
    } else {
        Err(anyhow!("No backend selected"))
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "expectty=debug",
        _ => "expectty=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_buffer_cap(s: &str) -> Result<BufferCap> {
    if s == "unbounded" {
        return Ok(BufferCap::Unbounded);
    }
    let bytes: usize = s.parse().context("expected a byte count or `unbounded`")?;
    if bytes == 0 {
        // Every byte would be evicted on arrival and no expect could match.
        return Err(anyhow!("buffer cap must be at least 1 byte"));
    }
    Ok(BufferCap::Bounded(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_buffer_cap() {
        assert_eq!(parse_buffer_cap("unbounded").unwrap(), BufferCap::Unbounded);
        assert_eq!(parse_buffer_cap("4096").unwrap(), BufferCap::Bounded(4096));
        assert!(parse_buffer_cap("0").is_err());
        assert!(parse_buffer_cap("-1").is_err());
        assert!(parse_buffer_cap("lots").is_err());
    }
}

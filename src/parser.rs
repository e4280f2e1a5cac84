//! Parser for automation scripts.
//!
//! The top-level entry points are [`parse_str`] and [`parse_file`].

use crate::command::ScriptCommand;
use crate::commands::{Expect, SendInput, SendLine, SendSecret, Show, TypeText, Wait};
use crate::options::Timeout;
use anyhow::{Context as _, Result, anyhow};
use std::path::Path;
use std::time::Duration;

/// Parse a script from a string slice and return the resulting commands.
///
/// Lines that are empty or start with `#` are ignored. Inline comments (` # ...`)
/// are stripped while preserving `#` characters inside quoted strings.
///
/// # Errors
///
/// Returns an error if any line contains an unknown command, a malformed
/// argument, an invalid regex, or an unclosed quoted string.
///
/// # Example
///
/// ```
/// use expectty::parse_str;
///
/// let commands = parse_str("send \"show version\\n\"\nexpect prompt 1s\n").unwrap();
/// assert_eq!(commands.len(), 2);
/// ```
pub fn parse_str(content: &str) -> Result<Vec<Box<dyn ScriptCommand>>> {
    let mut commands = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = strip_inline_comment(line);
        let cmd = parse_line(line)
            .with_context(|| format!("Failed to parse line {}: {}", line_num + 1, line))?;
        commands.push(cmd);
    }
    Ok(commands)
}

/// Read a script file and delegate to [`parse_str`].
pub fn parse_file(path: impl AsRef<Path>) -> Result<Vec<Box<dyn ScriptCommand>>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script file: {}", path.display()))?;
    parse_str(&content)
}

type ParseFn = fn(&str) -> Result<Box<dyn ScriptCommand>>;

static REGISTRY: &[(&str, ParseFn)] = &[
    (SendInput::NAME, SendInput::parse_boxed),
    (SendLine::NAME, SendLine::parse_boxed),
    (SendSecret::NAME, SendSecret::parse_boxed),
    (TypeText::NAME, TypeText::parse_boxed),
    (Expect::NAME, Expect::parse_boxed),
    (Wait::NAME, Wait::parse_boxed),
    (Show::NAME, Show::parse_boxed),
];

/// Dispatch a single non-empty, non-comment line to the matching command's parser.
fn parse_line(line: &str) -> Result<Box<dyn ScriptCommand>> {
    let (name, args) = line.split_once(' ').unwrap_or((line, ""));
    REGISTRY
        .iter()
        .find(|(cmd_name, _)| *cmd_name == name)
        .map(|(_, parse)| parse(args))
        .unwrap_or_else(|| Err(anyhow!("Unknown command: {}", name)))
}

/// Strip inline comments from a line, preserving `#` inside quoted strings.
fn strip_inline_comment(line: &str) -> &str {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            '#' if !in_quotes => return line[..i].trim(),
            _ => {}
        }
    }
    line
}

/// Parse a duration string: `1s`, `500ms`, `1.5s`.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if let Some(ms_str) = s.strip_suffix("ms") {
        let ms: u64 = ms_str
            .trim()
            .parse()
            .context("Invalid milliseconds value")?;
        Ok(Duration::from_millis(ms))
    } else if let Some(s_str) = s.strip_suffix('s') {
        let secs: f64 = s_str.trim().parse().context("Invalid seconds value")?;
        Duration::try_from_secs_f64(secs).context("Invalid seconds value")
    } else {
        Err(anyhow!("Duration must end with 's' or 'ms', got: {}", s))
    }
}

/// Parse a timeout: a duration, or `never` for no limit.
pub fn parse_timeout(s: &str) -> Result<Timeout> {
    match s.trim() {
        "never" => Ok(Timeout::Never),
        other => parse_duration(other).map(Timeout::After),
    }
}

/// Split a leading double-quoted string off `s`, returning the unescaped
/// content and whatever follows the closing quote.
pub(crate) fn split_quoted(s: &str) -> Result<(String, &str)> {
    let s = s.trim_start();
    let body = s
        .strip_prefix('"')
        .ok_or_else(|| anyhow!("Expected string to start with '\"'"))?;

    let mut out = String::new();
    let mut chars = body.char_indices();
    while let Some((i, ch)) = chars.next() {
        match ch {
            '"' => return Ok((out, &body[i + 1..])),
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, 't')) => out.push('\t'),
                Some((_, '"')) => out.push('"'),
                Some((_, '\\')) => out.push('\\'),
                // Unknown escapes are kept so regexes like `\d` or `\$` survive.
                Some((_, other)) => {
                    out.push('\\');
                    out.push(other);
                }
                None => break,
            },
            _ => out.push(ch),
        }
    }
    Err(anyhow!("Expected string to end with '\"'"))
}

/// Parse an argument consisting of exactly one double-quoted string.
pub(crate) fn parse_quoted_string(s: &str) -> Result<String> {
    let (text, rest) = split_quoted(s)?;
    if !rest.trim().is_empty() {
        return Err(anyhow!("Unexpected text after closing quote: {}", rest.trim()));
    }
    Ok(text)
}

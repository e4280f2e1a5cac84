use std::io::Write;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

fn write_script(script: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp script");
    file.write_all(script.as_bytes()).expect("write temp script");
    file
}

fn run(script: &NamedTempFile, backend: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_expectty"))
        .arg("--script")
        .arg(script.path())
        .args(backend)
        .output()
        .expect("run expectty")
}

#[test]
fn test_fake_router_script() {
    let script = write_script(
        r#"
# Walk through the canned router commands
send "show version\n"
expect prompt 1s
show "-- users --"
sendline "show system users"
expect "testuser@testrouter#" 1s
"#,
    );

    let output = run(&script, &["--fake-router", "--prompt", "testrouter#$"]);
    assert!(
        output.status.success(),
        "expectty failed with stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Cisco IOS Software"));
    assert!(stdout.contains("-- users --"));
    assert!(stdout.contains("blue   p0 level5.company.net"));
}

#[test]
fn test_timeout_reports_partial_output() {
    let script = write_script(
        r#"
send "show chassis\n"
expect prompt 300ms
"#,
    );

    let output = run(&script, &["--fake-router", "--quiet"]);
    assert!(!output.status.success(), "expectty should fail with timeout");
    assert!(output.stdout.is_empty());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("timeout after 300ms"), "got: {stderr}");
    assert!(stderr.contains(r#"command: \"show chassis\" not found"#), "got: {stderr}");
}

#[test]
fn test_invalid_script() {
    let script = write_script("invalid_command \"test\"\n");

    let output = run(&script, &["--fake-router"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown command"), "got: {stderr}");
}

#[test]
fn test_zero_buffer_cap_is_rejected() {
    let script = write_script("wait 1ms\n");
    let output = run(&script, &["--fake-router", "--buffer-cap", "0"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("buffer cap must be at least 1 byte"), "got: {stderr}");
}

#[test]
fn test_backend_is_required() {
    let script = write_script("wait 1ms\n");
    let output = run(&script, &[]);
    assert!(!output.status.success());
}

#[cfg(unix)]
#[test]
fn test_shell_script_with_comments() {
    let script = write_script(
        r#"
# Drive a real shell through a PTY
send "echo 'Hello' 'World'\n"   # two words, joined by echo
expect "Hello World" 5s

wait 50ms
sendline "exit"
"#,
    );

    let output = run(&script, &["--command", "sh"]);
    assert!(
        output.status.success(),
        "expectty failed with stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("Hello World"));
}

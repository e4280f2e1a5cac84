#![cfg(unix)]

use expectty::{Session, SessionError, SessionOptions, SessionState, Termination, Timeout};
use std::time::Duration;

fn spawn_sh() -> (Session, expectty::TerminationSignal) {
    Session::spawn("sh", &[] as &[&str], SessionOptions::default()).expect("spawn sh in a PTY")
}

#[tokio::test]
async fn test_shell_echo_and_exit() {
    let (session, done) = spawn_sh();

    // The echoed command line contains the expression, not its result.
    session.send("echo result-$((20 + 22))\n").unwrap();
    let m = session
        .expect_timeout(r"result-(\d+)", Timeout::from_secs(5))
        .await
        .unwrap();
    assert_eq!(m.capture(0), Some("42"));

    session.send("exit\n").unwrap();
    let end = tokio::time::timeout(Duration::from_secs(5), done.wait())
        .await
        .expect("shell exited");
    assert_eq!(end, Termination::Eof);
    assert_eq!(session.state(), SessionState::Eof);

    let err = session
        .expect_timeout("anything", Timeout::Never)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Eof { .. }));
    session.close().unwrap();
}

#[tokio::test]
async fn test_close_kills_running_program() {
    let (session, done) = spawn_sh();
    session.send("sleep 30\n").unwrap();

    session.close().unwrap();
    session.close().unwrap();
    assert_eq!(done.wait().await, Termination::Closed);
}

#[test]
fn test_missing_program_is_a_transport_error() {
    let err = Session::spawn(
        "/nonexistent/definitely-not-a-shell",
        &[] as &[&str],
        SessionOptions::default(),
    )
    .err()
    .expect("spawn must fail");
    assert!(matches!(err, SessionError::Transport(_)));
}

#[test]
fn test_resize_before_and_after_close() {
    use expectty::{PtyTransport, Transport};

    let mut transport = PtyTransport::spawn("sh", &[] as &[&str]).expect("spawn sh");
    assert!(transport.is_running());
    transport.resize(40, 120).unwrap();

    transport.close().unwrap();
    assert!(transport.resize(24, 80).is_err());
    assert!(transport.take_reader().is_err());
}

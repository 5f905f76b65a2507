//! Black-box tests driving the built `ish` binary against real Unix
//! utilities, covering the end-to-end scenarios the shell core is meant
//! to support.

use std::io::Write;
use std::process::{Command, Stdio};

fn run(cmd: &str) -> (String, String, i32) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_ish"))
        .arg("-c")
        .arg(cmd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn ish");
    let output = child.wait_with_output().expect("wait for ish");
    (
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
        output.status.code().unwrap_or(-1),
    )
}

#[test]
fn sequential_commands_both_run() {
    let (stdout, _, status) = run("echo hello ; echo world");
    assert_eq!(stdout, "hello\nworld\n");
    assert_eq!(status, 0);
}

#[test]
fn pipe_feeds_stdout_to_stdin() {
    let (stdout, _, status) = run("echo a | tr a b");
    assert_eq!(stdout, "b\n");
    assert_eq!(status, 0);
}

#[test]
fn pipe_with_stderr_merges_error_stream() {
    let (stdout, _, _status) = run("sh -c 'echo err 1>&2' |& cat");
    assert_eq!(stdout, "err\n");
}

#[test]
fn exit_status_of_last_command_is_reported() {
    let (_, _, status) = run("false");
    assert_eq!(status, 1);
}

#[test]
fn command_not_found_is_reported_not_fatal() {
    let (_, stderr, status) = run("this-command-does-not-exist-xyz");
    assert_ne!(status, 0);
    assert!(stderr.contains("not found") || stderr.contains("ish:"));
}

#[test]
fn output_redirection_writes_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.txt");
    let cmd = format!("echo redirected > {}", path.display());
    let (_, _, status) = run(&cmd);
    assert_eq!(status, 0);
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents, "redirected\n");
}

#[test]
fn append_redirection_does_not_truncate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.txt");
    std::fs::write(&path, "first\n").unwrap();
    let cmd = format!("echo second >> {}", path.display());
    run(&cmd);
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents, "first\nsecond\n");
}

#[test]
fn input_redirection_reads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("in.txt");
    std::fs::write(&path, "from file\n").unwrap();
    let cmd = format!("cat < {}", path.display());
    let (stdout, _, _) = run(&cmd);
    assert_eq!(stdout, "from file\n");
}

#[test]
fn setenv_round_trip_is_visible_to_children() {
    let (stdout, _, _) = run("setenv FOO bar ; sh -c 'echo $FOO'");
    assert_eq!(stdout, "bar\n");
}

#[test]
fn quoted_arguments_keep_embedded_spaces() {
    let (stdout, _, _) = run("echo 'one two'");
    assert_eq!(stdout, "one two\n");
}

#[test]
fn empty_command_line_is_a_noop() {
    let (stdout, stderr, status) = run("");
    assert_eq!(stdout, "");
    assert_eq!(stderr, "");
    assert_eq!(status, 0);
}

#[test]
fn background_job_is_listed_then_reaped() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_ish"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn ish");
    let mut stdin = child.stdin.take().unwrap();
    writeln!(stdin, "sleep 1 &").unwrap();
    writeln!(stdin, "jobs").unwrap();
    drop(stdin);
    let output = child.wait_with_output().expect("wait for ish");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("sleep 1"));
}

#![cfg(unix)]

use s2s::core::config::RunnerConfig;
use s2s::core::process::{CommandRunner, ProcessInvocation, TokioCommandRunner};
use std::fs;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn runner() -> TokioCommandRunner {
    TokioCommandRunner::new(&RunnerConfig::default()).with_echo(false)
}

fn sh(script: &str) -> ProcessInvocation {
    ProcessInvocation::new(vec!["sh".into(), "-c".into(), script.into()])
}

#[tokio::test]
async fn test_large_stdin_round_trips_through_cat() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.txt");
    let output = dir.path().join("out.txt");
    let payload: String = (0..40_000).map(|i| format!("line {}\n", i)).collect();
    fs::write(&input, &payload).unwrap();

    let invocation = ProcessInvocation::new(vec!["cat".into()])
        .with_stdin(&input)
        .with_stdout(&output);
    let result = runner().run(&invocation).await.unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(fs::read_to_string(&output).unwrap(), payload);
}

#[tokio::test]
async fn test_heavy_output_on_both_streams_does_not_deadlock() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out.txt");
    let err = dir.path().join("err.txt");
    let script = "i=0; while [ $i -lt 5000 ]; do echo out$i; echo err$i >&2; i=$((i+1)); done";

    let result = runner()
        .run(&sh(script).with_stdout(&out).with_stderr(&err))
        .await
        .unwrap();

    assert_eq!(result.exit_code, 0);
    let stdout = fs::read_to_string(&out).unwrap();
    let stderr = fs::read_to_string(&err).unwrap();
    assert_eq!(stdout.lines().count(), 5000);
    assert_eq!(stderr.lines().count(), 5000);
    assert!(stdout.ends_with("out4999\n"));
    assert!(stderr.ends_with("err4999\n"));
}

#[tokio::test]
async fn test_child_ignoring_stdin_still_completes() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.bin");
    fs::write(&input, vec![b'x'; 1 << 20]).unwrap();

    let result = runner()
        .run(&sh("exit 4").with_stdin(&input))
        .await
        .unwrap();
    assert_eq!(result.exit_code, 4);
}

#[tokio::test]
async fn test_no_stdin_means_immediate_eof() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out.txt");
    let result = runner()
        .run(&sh("wc -c").with_stdout(&out))
        .await
        .unwrap();
    assert_eq!(result.exit_code, 0);
    assert_eq!(fs::read_to_string(&out).unwrap().trim(), "0");
}

#[tokio::test]
async fn test_background_grandchild_does_not_hold_the_run() {
    let started = Instant::now();
    let result = runner()
        .run(&sh("sleep 5 & echo started; exit 0"))
        .await
        .unwrap();
    assert_eq!(result.exit_code, 0);
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn test_slow_writer_output_is_complete() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out.txt");
    let result = runner()
        .run(&sh("echo a; sleep 0.2; echo b; sleep 0.2; echo c").with_stdout(&out))
        .await
        .unwrap();
    assert_eq!(result.exit_code, 0);
    assert_eq!(fs::read_to_string(&out).unwrap(), "a\nb\nc\n");
}

#[tokio::test]
async fn test_unwritable_sink_is_reported() {
    let dir = TempDir::new().unwrap();
    let sink = dir.path().join("missing-dir").join("out.txt");
    let err = runner().run(&sh("true").with_stdout(&sink)).await.unwrap_err();
    assert_eq!(err.code, "PROC-003");
}

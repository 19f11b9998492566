// tests/process_launcher.rs
//
// These tests spawn real `sh` processes.
#![cfg(unix)]

use std::error::Error;
use std::time::Duration;

use failfast::engine::{BatchOutcome, FailureCause, LogReporter, Supervisor, SupervisorOptions};
use failfast::exec::{ProcessLauncher, Task, TaskLauncher, TaskStatus};
use failfast::types::OutputMode;
use failfast_test_utils::init_tracing;
use tempfile::tempdir;
use tokio::time::{timeout, Instant};

type TestResult = Result<(), Box<dyn Error>>;

const POLL: Duration = Duration::from_millis(20);
const GRACE: Duration = Duration::from_millis(500);

fn supervisor() -> Supervisor<ProcessLauncher, LogReporter> {
    let options = SupervisorOptions {
        poll_interval: POLL,
        report_interval: Duration::from_secs(60),
    };
    Supervisor::new(ProcessLauncher::new(GRACE), LogReporter, options)
}

async fn wait_terminal(handle: &mut dyn failfast::exec::TaskHandle) -> TaskStatus {
    loop {
        let status = handle.poll();
        if status.is_terminal() {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn successful_processes_make_a_successful_batch() -> TestResult {
    init_tracing();

    let tasks = vec![
        Task::shell("one", "exit 0"),
        Task::shell("two", "sleep 0.1"),
        Task::new("three", "true"),
    ];

    let result = timeout(Duration::from_secs(10), supervisor().run(tasks)).await??;

    assert_eq!(result.outcome, BatchOutcome::Success);
    assert_eq!(result.succeeded, 3);
    Ok(())
}

#[tokio::test]
async fn failing_process_stops_long_running_siblings() -> TestResult {
    init_tracing();

    let tasks = vec![
        Task::shell("sleeper-1", "sleep 30"),
        Task::shell("broken", "exit 7"),
        Task::shell("sleeper-2", "sleep 30"),
    ];

    let started = Instant::now();
    let result = timeout(Duration::from_secs(10), supervisor().run(tasks)).await??;

    assert_eq!(
        result.outcome,
        BatchOutcome::Failure {
            failed: 1,
            cause: FailureCause::TaskFailed
        }
    );
    assert_eq!(result.cancelled, 2);
    // SIGTERM is honoured, so well within grace period + a couple of ticks.
    assert!(started.elapsed() < GRACE + POLL * 10);
    Ok(())
}

#[tokio::test]
async fn process_ignoring_sigterm_is_killed_after_grace_period() -> TestResult {
    init_tracing();

    let mut launcher = ProcessLauncher::new(Duration::from_millis(200));
    let mut handle = launcher.launch(Task::shell("stubborn", "trap '' TERM; sleep 30"))?;

    // Give the shell a moment to install its trap.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(handle.poll(), TaskStatus::Running);

    let started = Instant::now();
    handle.cancel();
    let status = timeout(Duration::from_secs(5), wait_terminal(handle.as_mut())).await?;

    assert_eq!(status, TaskStatus::Cancelled);
    assert!(started.elapsed() >= Duration::from_millis(200));
    Ok(())
}

#[tokio::test]
async fn poll_is_idempotent_and_cancel_after_exit_is_a_noop() -> TestResult {
    init_tracing();

    let mut launcher = ProcessLauncher::default();
    let mut handle = launcher.launch(Task::shell("quick", "exit 3"))?;

    let status = timeout(Duration::from_secs(5), wait_terminal(handle.as_mut())).await?;
    assert_eq!(status, TaskStatus::Failed(3));

    handle.cancel();
    handle.cancel();
    assert_eq!(handle.poll(), TaskStatus::Failed(3));
    assert_eq!(handle.poll(), TaskStatus::Failed(3));
    Ok(())
}

#[tokio::test]
async fn exit_observed_together_with_cancel_keeps_its_exit_code() -> TestResult {
    init_tracing();

    let mut launcher = ProcessLauncher::default();
    let mut handle = launcher.launch(Task::shell("exits", "exit 4"))?;

    // Block the runtime thread so the runner task is not polled until both
    // the exit and the cancel request are pending.
    std::thread::sleep(Duration::from_millis(300));
    handle.cancel();

    let status = timeout(Duration::from_secs(5), wait_terminal(handle.as_mut())).await?;
    assert_eq!(status, TaskStatus::Failed(4));
    Ok(())
}

#[tokio::test]
async fn cancellation_reaches_background_grandchildren() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let pid_file = dir.path().join("bg.pid");

    let mut launcher = ProcessLauncher::new(GRACE);
    let script = format!("sleep 30 & echo $! > {}; wait", pid_file.display());
    let mut handle = launcher.launch(Task::shell("spawner", &script))?;

    let deadline = Instant::now() + Duration::from_secs(5);
    let bg_pid: libc::pid_t = loop {
        if let Ok(text) = std::fs::read_to_string(&pid_file) {
            if let Ok(pid) = text.trim().parse() {
                break pid;
            }
        }
        assert!(Instant::now() < deadline, "background pid was never written");
        tokio::time::sleep(Duration::from_millis(10)).await;
    };
    assert!(process_exists(bg_pid), "background sleep should be running");

    handle.cancel();
    let status = timeout(Duration::from_secs(5), wait_terminal(handle.as_mut())).await?;
    assert_eq!(status, TaskStatus::Cancelled);

    // The group kill is asynchronous to our view of the orphaned sleep.
    let deadline = Instant::now() + Duration::from_secs(2);
    while process_exists(bg_pid) {
        assert!(Instant::now() < deadline, "background process {bg_pid} survived cancellation");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    Ok(())
}

/// True while `pid` is a live (non-zombie) process.
fn process_exists(pid: libc::pid_t) -> bool {
    // Zombies still answer kill(pid, 0); on Linux, read their state instead.
    if std::path::Path::new("/proc/self/stat").exists() {
        return match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => stat
                .rsplit_once(')')
                .and_then(|(_, rest)| rest.split_whitespace().next())
                .is_some_and(|state| state != "Z" && state != "X"),
            Err(_) => false,
        };
    }

    // SAFETY: signal 0 only checks that the pid exists.
    unsafe { libc::kill(pid, 0) == 0 }
}

#[tokio::test]
async fn environment_overrides_and_appends_reach_the_process() -> TestResult {
    init_tracing();

    let tasks = vec![
        Task::shell("record-mode", r#"test "$RECORD_MODE" = "true""#).env("RECORD_MODE", "true"),
        Task::shell("search-path", r#"test "$FAILFAST_EXTRA_PATH" = "/a:/b""#)
            .env("FAILFAST_EXTRA_PATH", "/a")
            .append_env("FAILFAST_EXTRA_PATH", "/b"),
    ];

    let result = timeout(Duration::from_secs(10), supervisor().run(tasks)).await??;
    assert!(result.is_success(), "{result}");
    Ok(())
}

#[tokio::test]
async fn working_directory_is_applied() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    std::fs::write(dir.path().join("marker.txt"), "x")?;

    let tasks = vec![Task::shell("in-dir", "test -f marker.txt")
        .cwd(dir.path())
        .output(OutputMode::Null)];

    let result = timeout(Duration::from_secs(10), supervisor().run(tasks)).await??;
    assert!(result.is_success(), "{result}");
    Ok(())
}

#[tokio::test]
async fn missing_program_aborts_and_cleans_up_siblings() -> TestResult {
    init_tracing();

    let tasks = vec![
        Task::shell("sleeper", "sleep 30"),
        Task::new("ghost", "failfast-no-such-program-1b9c"),
        Task::shell("never-started", "sleep 30"),
    ];

    let started = Instant::now();
    let err = timeout(Duration::from_secs(10), supervisor().run(tasks))
        .await?
        .expect_err("missing program must be a launch error");

    assert!(err.is_launch_error(), "unexpected error: {err:?}");
    assert!(err.to_string().contains("ghost"));
    // The sleeper was terminated rather than waited for.
    assert!(started.elapsed() < GRACE + POLL * 10);
    Ok(())
}

#[tokio::test]
async fn missing_working_directory_is_a_launch_error() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let mut launcher = ProcessLauncher::default();
    let result = launcher.launch(Task::new("nowhere", "true").cwd(dir.path().join("missing")));

    match result {
        Err(err) => assert!(err.is_launch_error(), "unexpected error: {err:?}"),
        Ok(_) => panic!("expected a launch error"),
    }
    Ok(())
}

// tests/supervisor_fake_launcher.rs

use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use failfast::engine::{
    BatchOutcome, FailureCause, LogReporter, Progress, Supervisor, SupervisorOptions,
};
use failfast::exec::Task;
use failfast_test_utils::fake_launcher::{FakeLauncher, Script};
use failfast_test_utils::{init_tracing, with_timeout};
use tokio::time::Instant;

type TestResult = Result<(), Box<dyn Error>>;

const POLL: Duration = Duration::from_millis(5);

fn fast_options() -> SupervisorOptions {
    SupervisorOptions {
        poll_interval: POLL,
        report_interval: Duration::from_secs(60),
    }
}

fn tasks(names: &[&str]) -> Vec<Task> {
    names.iter().map(|n| Task::shell(*n, "unused")).collect()
}

#[tokio::test]
async fn empty_batch_succeeds_without_polling() -> TestResult {
    init_tracing();

    let launcher = FakeLauncher::new();
    let recorder = launcher.recorder();
    let mut supervisor = Supervisor::new(launcher, LogReporter, fast_options());

    let result = with_timeout(supervisor.run(Vec::new())).await?;

    assert!(result.is_success());
    assert_eq!(result.total, 0);
    assert_eq!(recorder.total_polls(), 0);
    assert!(recorder.launched().is_empty());
    Ok(())
}

/// Scenario A: three tasks succeed after short delays.
#[tokio::test]
async fn all_tasks_succeed_without_cancellation() -> TestResult {
    init_tracing();

    let launcher = FakeLauncher::new()
        .script("t1", Script::SucceedAfter(Duration::from_millis(10)))
        .script("t2", Script::SucceedAfter(Duration::from_millis(30)))
        .script("t3", Script::SucceedAfter(Duration::from_millis(20)));
    let recorder = launcher.recorder();
    let mut supervisor = Supervisor::new(launcher, LogReporter, fast_options());

    let result = with_timeout(supervisor.run(tasks(&["t1", "t2", "t3"]))).await?;

    assert_eq!(result.outcome, BatchOutcome::Success);
    assert_eq!(result.succeeded, 3);
    assert_eq!(result.exit_code(), 0);
    assert_eq!(recorder.total_cancels(), 0);
    assert_eq!(recorder.launched(), vec!["t1", "t2", "t3"]);
    Ok(())
}

/// Scenario B: the middle task fails immediately, the others never finish on
/// their own.
#[tokio::test]
async fn first_failure_cancels_every_sibling_exactly_once() -> TestResult {
    init_tracing();

    let launcher = FakeLauncher::new()
        .script("t1", Script::RunUntilCancelled)
        .script("t2", Script::FailAfter(Duration::ZERO, 3))
        .script("t3", Script::RunUntilCancelled);
    let recorder = launcher.recorder();
    let mut supervisor = Supervisor::new(launcher, LogReporter, fast_options());

    let started = Instant::now();
    let result = with_timeout(supervisor.run(tasks(&["t1", "t2", "t3"]))).await?;

    assert_eq!(
        result.outcome,
        BatchOutcome::Failure {
            failed: 1,
            cause: FailureCause::TaskFailed
        }
    );
    assert_eq!(result.cancelled, 2);
    assert_ne!(result.exit_code(), 0);

    assert_eq!(recorder.cancel_count("t1"), 1);
    assert_eq!(recorder.cancel_count("t3"), 1);
    assert_eq!(recorder.cancel_count("t2"), 0);

    // Cancelled handles stop at once here, so a few ticks are plenty.
    assert!(started.elapsed() < Duration::from_secs(1));
    Ok(())
}

#[tokio::test]
async fn cancellation_is_not_resent_while_tasks_wind_down() -> TestResult {
    init_tracing();

    // t1 fails at once; t2 and t3 stay running for several ticks after the
    // cancel request.
    let launcher = FakeLauncher::new()
        .script("t1", Script::FailAfter(Duration::ZERO, 1))
        .script("t2", Script::StopAfterCancel(Duration::from_millis(20)))
        .script("t3", Script::StopAfterCancel(Duration::from_millis(40)));
    let recorder = launcher.recorder();
    let mut supervisor = Supervisor::new(launcher, LogReporter, fast_options());

    let result = with_timeout(supervisor.run(tasks(&["t1", "t2", "t3"]))).await?;

    assert_eq!(result.failed(), 1);
    assert_eq!(result.cancelled, 2);
    assert_eq!(recorder.cancel_count("t2"), 1);
    assert_eq!(recorder.cancel_count("t3"), 1);
    assert_eq!(recorder.total_cancels(), 2);
    Ok(())
}

#[tokio::test]
async fn failure_count_ignores_order_of_failures() -> TestResult {
    init_tracing();

    let launcher = FakeLauncher::new()
        .script("a", Script::FailAfter(Duration::ZERO, 1))
        .script("b", Script::FailAfter(Duration::ZERO, 2))
        .script("c", Script::RunUntilCancelled);
    let recorder = launcher.recorder();
    let mut supervisor = Supervisor::new(launcher, LogReporter, fast_options());

    let result = with_timeout(supervisor.run(tasks(&["a", "b", "c"]))).await?;

    // Both failures are seen in the same sweep.
    assert_eq!(result.failed(), 2);
    assert_eq!(result.cancelled, 1);
    assert_eq!(recorder.cancel_count("c"), 1);
    Ok(())
}

/// Scenario C: a launch failure aborts the batch and cleans up what was
/// already started.
#[tokio::test]
async fn launch_failure_cancels_already_launched_tasks() -> TestResult {
    init_tracing();

    let launcher = FakeLauncher::new()
        .script("t1", Script::RunUntilCancelled)
        .script("t2", Script::RunUntilCancelled)
        .script("t3", Script::FailToLaunch)
        .script("t4", Script::RunUntilCancelled);
    let recorder = launcher.recorder();

    let reports = Arc::new(Mutex::new(Vec::<Progress>::new()));
    let sink = Arc::clone(&reports);
    let reporter = move |p: &Progress| sink.lock().unwrap().push(*p);
    let mut supervisor = Supervisor::new(launcher, reporter, fast_options());

    let err = with_timeout(supervisor.run(tasks(&["t1", "t2", "t3", "t4"])))
        .await
        .expect_err("launch failure must abort the batch");

    assert!(err.is_launch_error(), "unexpected error: {err:?}");
    assert_eq!(recorder.launched(), vec!["t1", "t2"]);
    assert_eq!(recorder.cancel_count("t1"), 1);
    assert_eq!(recorder.cancel_count("t2"), 1);
    assert_eq!(recorder.cancel_count("t4"), 0);
    assert!(reports.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn remaining_count_never_increases() -> TestResult {
    init_tracing();

    let launcher = FakeLauncher::new()
        .script("t1", Script::SucceedAfter(Duration::from_millis(10)))
        .script("t2", Script::SucceedAfter(Duration::from_millis(40)))
        .script("t3", Script::SucceedAfter(Duration::from_millis(80)))
        .script("t4", Script::SucceedAfter(Duration::from_millis(120)));

    let reports = Arc::new(Mutex::new(Vec::<Progress>::new()));
    let sink = Arc::clone(&reports);
    let reporter = move |p: &Progress| sink.lock().unwrap().push(*p);

    let options = SupervisorOptions {
        poll_interval: POLL,
        report_interval: Duration::from_millis(15),
    };
    let mut supervisor = Supervisor::new(launcher, reporter, options);

    let result = with_timeout(supervisor.run(tasks(&["t1", "t2", "t3", "t4"]))).await?;
    assert!(result.is_success());

    let reports = reports.lock().unwrap();
    assert!(!reports.is_empty(), "expected at least one progress report");
    for pair in reports.windows(2) {
        assert!(pair[1].remaining <= pair[0].remaining);
        assert!(pair[1].elapsed >= pair[0].elapsed);
    }
    for report in reports.iter() {
        assert_eq!(report.total, 4);
        assert!(report.remaining <= 4);
        assert!(report.remaining > 0);
    }
    Ok(())
}

#[tokio::test]
async fn interrupt_cancels_running_tasks() -> TestResult {
    init_tracing();

    let launcher = FakeLauncher::new()
        .script("t1", Script::RunUntilCancelled)
        .script("t2", Script::SucceedAfter(Duration::ZERO))
        .script("t3", Script::RunUntilCancelled);
    let recorder = launcher.recorder();
    let mut supervisor = Supervisor::new(launcher, LogReporter, fast_options());

    let interrupt = tokio::time::sleep(Duration::from_millis(30));
    let result = with_timeout(supervisor.run_until(tasks(&["t1", "t2", "t3"]), interrupt)).await?;

    assert_eq!(
        result.outcome,
        BatchOutcome::Failure {
            failed: 0,
            cause: FailureCause::Interrupted
        }
    );
    assert_eq!(result.succeeded, 1);
    assert_eq!(result.cancelled, 2);
    assert_eq!(recorder.cancel_count("t1"), 1);
    assert_eq!(recorder.cancel_count("t2"), 0);
    assert_eq!(recorder.cancel_count("t3"), 1);
    Ok(())
}

#[tokio::test]
async fn slow_cancellation_still_terminates() -> TestResult {
    init_tracing();

    let launcher = FakeLauncher::new()
        .script("stubborn", Script::StopAfterCancel(Duration::from_millis(100)))
        .script("broken", Script::FailAfter(Duration::from_millis(5), 1));
    let mut supervisor = Supervisor::new(launcher, LogReporter, fast_options());

    let started = Instant::now();
    let result = with_timeout(supervisor.run(tasks(&["stubborn", "broken"]))).await?;

    assert!(!result.is_success());
    assert_eq!(result.cancelled, 1);
    assert!(started.elapsed() >= Duration::from_millis(100));
    Ok(())
}

#[tokio::test]
async fn zero_poll_interval_polls_continuously() -> TestResult {
    init_tracing();

    let options = SupervisorOptions {
        poll_interval: Duration::ZERO,
        report_interval: Duration::from_secs(60),
    };

    let launcher = FakeLauncher::new()
        .script("a", Script::SucceedAfter(Duration::from_millis(5)))
        .script("b", Script::FailAfter(Duration::from_millis(10), 2))
        .script("c", Script::StopAfterCancel(Duration::from_millis(5)));
    let recorder = launcher.recorder();
    let mut supervisor = Supervisor::new(launcher, LogReporter, options);

    let result = with_timeout(supervisor.run(tasks(&["a", "b", "c"]))).await?;

    assert_eq!(result.succeeded, 1);
    assert_eq!(result.failed(), 1);
    assert_eq!(result.cancelled, 1);
    assert_eq!(recorder.cancel_count("c"), 1);
    Ok(())
}

#[tokio::test]
async fn zero_poll_interval_still_releases_after_launch_failure() -> TestResult {
    init_tracing();

    let options = SupervisorOptions {
        poll_interval: Duration::ZERO,
        report_interval: Duration::from_secs(60),
    };

    let launcher = FakeLauncher::new()
        .script("a", Script::StopAfterCancel(Duration::from_millis(5)))
        .script("b", Script::FailToLaunch);
    let recorder = launcher.recorder();
    let mut supervisor = Supervisor::new(launcher, LogReporter, options);

    let err = with_timeout(supervisor.run(tasks(&["a", "b"])))
        .await
        .expect_err("launch failure must abort the batch");

    assert!(err.is_launch_error(), "unexpected error: {err:?}");
    assert_eq!(recorder.cancel_count("a"), 1);
    Ok(())
}

// src/engine/supervisor.rs

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::engine::batch::BatchState;
use crate::engine::report::{Progress, ProgressReporter};
use crate::engine::{BatchResult, FailureCause};
use crate::errors::Result;
use crate::exec::{Task, TaskHandle, TaskLauncher, TaskStatus};

/// Default time between two poll sweeps.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default time between two progress notifications.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(15);

/// Timing knobs of one supervised run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorOptions {
    /// `Duration::ZERO` polls continuously, yielding to the runtime between
    /// sweeps.
    pub poll_interval: Duration,
    pub report_interval: Duration,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            report_interval: DEFAULT_REPORT_INTERVAL,
        }
    }
}

/// Runs a batch of tasks in parallel and cancels the rest on the first
/// failure.
///
/// All decisions are made by one control loop; the handles report their
/// status through non-blocking polls, so [`BatchState`] needs no locking.
pub struct Supervisor<L: TaskLauncher, R: ProgressReporter> {
    launcher: L,
    reporter: R,
    options: SupervisorOptions,
}

impl<L: TaskLauncher, R: ProgressReporter> fmt::Debug for Supervisor<L, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<L: TaskLauncher, R: ProgressReporter> Supervisor<L, R> {
    pub fn new(launcher: L, reporter: R, options: SupervisorOptions) -> Self {
        Self {
            launcher,
            reporter,
            options,
        }
    }

    pub fn options(&self) -> SupervisorOptions {
        self.options
    }

    /// Run the batch until every task is terminal.
    ///
    /// Returns `Err` only for a [`LaunchError`](crate::errors::FailfastError::LaunchError);
    /// failing tasks are reported in the returned [`BatchResult`].
    pub async fn run(&mut self, tasks: Vec<Task>) -> Result<BatchResult> {
        self.run_until(tasks, std::future::pending::<()>()).await
    }

    /// Like [`run`](Self::run), but when `interrupt` completes the batch is
    /// treated as failed and every running task is cancelled.
    pub async fn run_until<F>(&mut self, tasks: Vec<Task>, interrupt: F) -> Result<BatchResult>
    where
        F: Future<Output = ()>,
    {
        let started = Instant::now();
        let total = tasks.len();

        if total == 0 {
            info!("empty batch; nothing to run");
            return Ok(BatchResult::empty());
        }

        info!(total, "launching batch");
        let mut handles = self.launch_all(tasks).await?;
        let mut state = BatchState::new(total);

        // A zero poll interval means polling continuously.
        let mut ticker = (!self.options.poll_interval.is_zero()).then(|| {
            let mut ticker = tokio::time::interval(self.options.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        let mut next_report = started + self.options.report_interval;

        tokio::pin!(interrupt);
        let mut interrupted = false;

        while !state.is_finished() {
            tokio::select! {
                _ = next_tick(&mut ticker) => {}
                _ = &mut interrupt, if !interrupted => {
                    interrupted = true;
                    warn!("batch interrupted");
                    state.interrupt();
                }
            }

            sweep(&mut handles, &mut state);

            let now = Instant::now();
            if now >= next_report && !state.is_finished() {
                self.reporter.report(&Progress {
                    remaining: state.remaining(),
                    total,
                    elapsed: now - started,
                });
                next_report = now + self.options.report_interval;
            }
        }

        let result = state.result(started.elapsed());
        if result.is_success() {
            info!(%result, "batch finished");
        } else {
            warn!(%result, "batch finished");
        }
        Ok(result)
    }

    /// Launch every task in order. On the first launch error, cancel and
    /// release everything launched so far before returning the error.
    async fn launch_all(&mut self, tasks: Vec<Task>) -> Result<Vec<Box<dyn TaskHandle>>> {
        let mut handles: Vec<Box<dyn TaskHandle>> = Vec::with_capacity(tasks.len());

        for task in tasks {
            match self.launcher.launch(task) {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    warn!(
                        error = %err,
                        launched = handles.len(),
                        "launch failed; cancelling tasks launched so far"
                    );
                    release_all(&mut handles, self.options.poll_interval).await;
                    return Err(err);
                }
            }
        }

        Ok(handles)
    }
}

/// One tick: poll every running handle, then act on what was seen.
fn sweep(handles: &mut [Box<dyn TaskHandle>], state: &mut BatchState) {
    for (index, handle) in handles.iter_mut().enumerate() {
        if !state.is_running(index) {
            continue;
        }

        let status = handle.poll();
        if state.observe(index, status) {
            if matches!(status, TaskStatus::Failed(_)) {
                warn!(task = %handle.name(), ?status, "task failed");
            } else {
                debug!(task = %handle.name(), ?status, "task reached terminal status");
            }
        }
    }

    // Polling is complete for this tick; only now act on a failure.
    let to_cancel = state.begin_cancellation();
    if !to_cancel.is_empty() {
        let reason = match state.failure() {
            Some(FailureCause::Interrupted) => "batch interrupted",
            _ => "one or more tasks failed",
        };
        warn!(count = to_cancel.len(), "{reason}; cancelling remaining tasks");

        for index in to_cancel {
            handles[index].cancel();
        }
    }
}

/// Cancel every handle and wait until each one reports a terminal status.
async fn release_all(handles: &mut [Box<dyn TaskHandle>], poll_interval: Duration) {
    for handle in handles.iter_mut() {
        handle.cancel();
    }

    loop {
        let mut pending = 0;
        for handle in handles.iter_mut() {
            if !handle.poll().is_terminal() {
                pending += 1;
            }
        }
        if pending == 0 {
            break;
        }
        debug!(pending, "waiting for cancelled tasks to be released");
        if poll_interval.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(poll_interval).await;
        }
    }
}

/// Wait for the next poll sweep; without a ticker, only yield to the runtime.
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => tokio::task::yield_now().await,
    }
}

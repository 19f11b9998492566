// src/engine/report.rs

use std::time::Duration;

use tracing::info;

/// Periodic progress notification emitted by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Handles that have not reached a terminal status.
    pub remaining: usize,
    pub total: usize,
    /// Time since the batch started.
    pub elapsed: Duration,
}

/// Sink for progress notifications. Formatting and destination are up to
/// the implementation.
pub trait ProgressReporter: Send {
    fn report(&mut self, progress: &Progress);
}

impl<F> ProgressReporter for F
where
    F: FnMut(&Progress) + Send,
{
    fn report(&mut self, progress: &Progress) {
        (*self)(progress)
    }
}

/// Reporter that emits an `info` event per notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn report(&mut self, progress: &Progress) {
        info!(
            remaining = progress.remaining,
            total = progress.total,
            elapsed_s = progress.elapsed.as_secs(),
            "{} task(s) still running",
            progress.remaining
        );
    }
}

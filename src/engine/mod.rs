// src/engine/mod.rs

//! Supervision engine.
//!
//! - [`batch`] is the pure state machine: per-handle status, terminal
//!   count, the first-writer-wins failure flag and the one-time transition
//!   into cancelling.
//! - [`supervisor`] is the async shell around it: launching, the poll loop,
//!   sending cancellations and reporting progress.
//! - [`report`] defines the progress notification and reporter sinks.

use std::fmt;
use std::time::Duration;

pub mod batch;
pub mod report;
pub mod supervisor;

pub use batch::BatchState;
pub use report::{LogReporter, Progress, ProgressReporter};
pub use supervisor::{Supervisor, SupervisorOptions};

/// Why a batch ended up failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    /// At least one task failed on its own.
    TaskFailed,
    /// The caller interrupted the batch (Ctrl-C, overall timeout).
    Interrupted,
}

/// Overall verdict of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Success,
    /// `failed` counts tasks that failed on their own; cancelled siblings are
    /// reported in [`BatchResult::cancelled`].
    Failure { failed: usize, cause: FailureCause },
}

/// What [`Supervisor::run`] returns once every handle is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub outcome: BatchOutcome,
    pub total: usize,
    pub succeeded: usize,
    pub cancelled: usize,
    pub elapsed: Duration,
}

impl BatchResult {
    /// Result of a batch with no tasks at all.
    pub fn empty() -> Self {
        Self {
            outcome: BatchOutcome::Success,
            total: 0,
            succeeded: 0,
            cancelled: 0,
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Success)
    }

    /// Number of tasks that failed on their own.
    pub fn failed(&self) -> usize {
        match self.outcome {
            BatchOutcome::Success => 0,
            BatchOutcome::Failure { failed, .. } => failed,
        }
    }

    /// Process-style exit indicator: `0` on success, `1` otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

impl fmt::Display for BatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            BatchOutcome::Success => write!(
                f,
                "all {} task(s) succeeded in {:.2}s",
                self.total,
                self.elapsed.as_secs_f64()
            ),
            BatchOutcome::Failure { failed, cause } => {
                write!(f, "{} of {} task(s) failed", failed, self.total)?;
                if self.cancelled > 0 {
                    write!(f, ", {} cancelled", self.cancelled)?;
                }
                if cause == FailureCause::Interrupted {
                    write!(f, " (interrupted)")?;
                }
                write!(f, " after {:.2}s", self.elapsed.as_secs_f64())
            }
        }
    }
}

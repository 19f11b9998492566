// src/engine/batch.rs

//! Pure batch state machine.
//!
//! `BatchState` records what the supervisor has observed about each handle
//! and decides when cancellation must start. It has no channels, no Tokio
//! types and performs no IO, so every transition can be unit tested
//! directly.

use std::time::Duration;

use crate::engine::{BatchOutcome, BatchResult, FailureCause};
use crate::exec::TaskStatus;

#[derive(Debug)]
pub struct BatchState {
    statuses: Vec<TaskStatus>,
    terminal: usize,
    succeeded: usize,
    failed: usize,
    cancelled: usize,
    /// Set at most once; the first cause wins.
    failure: Option<FailureCause>,
    cancellation_initiated: bool,
}

impl BatchState {
    pub fn new(total: usize) -> Self {
        Self {
            statuses: vec![TaskStatus::Running; total],
            terminal: 0,
            succeeded: 0,
            failed: 0,
            cancelled: 0,
            failure: None,
            cancellation_initiated: false,
        }
    }

    pub fn total(&self) -> usize {
        self.statuses.len()
    }

    /// Number of handles that have not reached a terminal status yet.
    pub fn remaining(&self) -> usize {
        self.total() - self.terminal
    }

    pub fn is_finished(&self) -> bool {
        self.terminal == self.total()
    }

    pub fn is_running(&self, index: usize) -> bool {
        matches!(self.statuses.get(index), Some(TaskStatus::Running))
    }

    pub fn status(&self, index: usize) -> Option<TaskStatus> {
        self.statuses.get(index).copied()
    }

    pub fn failure(&self) -> Option<FailureCause> {
        self.failure
    }

    pub fn cancellation_initiated(&self) -> bool {
        self.cancellation_initiated
    }

    /// Record a polled status for handle `index`.
    ///
    /// Returns `true` if the handle just became terminal. `Running` and
    /// repeated terminal reports are ignored.
    pub fn observe(&mut self, index: usize, status: TaskStatus) -> bool {
        let Some(slot) = self.statuses.get_mut(index) else {
            return false;
        };
        if slot.is_terminal() || !status.is_terminal() {
            return false;
        }

        *slot = status;
        self.terminal += 1;

        match status {
            TaskStatus::Succeeded => self.succeeded += 1,
            TaskStatus::Failed(_) => self.failed += 1,
            TaskStatus::Cancelled => self.cancelled += 1,
            TaskStatus::Running => unreachable!("filtered above"),
        }

        if status.is_failure() {
            self.set_failure(FailureCause::TaskFailed);
        }

        true
    }

    /// Inject a synthetic failure (Ctrl-C, overall timeout).
    pub fn interrupt(&mut self) {
        self.set_failure(FailureCause::Interrupted);
    }

    fn set_failure(&mut self, cause: FailureCause) {
        if self.failure.is_none() {
            self.failure = Some(cause);
        }
    }

    /// One-time transition into "cancelling".
    ///
    /// Returns the indices of all handles still running the first time it is
    /// called after a failure was recorded, and an empty list otherwise.
    pub fn begin_cancellation(&mut self) -> Vec<usize> {
        if self.failure.is_none() || self.cancellation_initiated {
            return Vec::new();
        }
        self.cancellation_initiated = true;

        self.statuses
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_terminal())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn result(&self, elapsed: Duration) -> BatchResult {
        let outcome = match self.failure {
            None => BatchOutcome::Success,
            Some(cause) => BatchOutcome::Failure {
                failed: self.failed,
                cause,
            },
        };

        BatchResult {
            outcome,
            total: self.total(),
            succeeded: self.succeeded,
            cancelled: self.cancelled,
            elapsed,
        }
    }
}

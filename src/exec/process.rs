// src/exec/process.rs

//! [`TaskHandle`] backed by a real OS process.

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::{debug, warn};

use crate::exec::handle::{TaskHandle, TaskStatus};

/// Handle to a process owned by a runner task (see [`super::task_runner`]).
///
/// The handle itself never touches the `Child`: it only holds the two ends
/// of the runner's channels.
/// - `cancel_tx` is taken on the first `cancel`, so the request is sent at
///   most once.
/// - `done_rx` yields the final status exactly once; it is cached here so
///   later polls return the same value.
#[derive(Debug)]
pub struct ProcessHandle {
    name: String,
    pid: Option<u32>,
    status: TaskStatus,
    cancel_tx: Option<oneshot::Sender<()>>,
    done_rx: oneshot::Receiver<TaskStatus>,
}

impl ProcessHandle {
    pub(crate) fn new(
        name: String,
        pid: Option<u32>,
        cancel_tx: oneshot::Sender<()>,
        done_rx: oneshot::Receiver<TaskStatus>,
    ) -> Self {
        Self {
            name,
            pid,
            status: TaskStatus::Running,
            cancel_tx: Some(cancel_tx),
            done_rx,
        }
    }
}

impl TaskHandle for ProcessHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn poll(&mut self) -> TaskStatus {
        if self.status.is_terminal() {
            return self.status;
        }

        match self.done_rx.try_recv() {
            Ok(status) => {
                self.status = status;
                // Nothing left to cancel.
                self.cancel_tx = None;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Closed) => {
                warn!(task = %self.name, pid = self.pid, "runner exited without reporting a status");
                self.status = TaskStatus::Failed(-1);
                self.cancel_tx = None;
            }
        }

        self.status
    }

    fn cancel(&mut self) {
        match self.cancel_tx.take() {
            Some(tx) => {
                if tx.send(()).is_err() {
                    debug!(task = %self.name, "process already finished while cancelling");
                }
            }
            None => {
                debug!(task = %self.name, "cancel ignored; already requested or task finished");
            }
        }
    }
}

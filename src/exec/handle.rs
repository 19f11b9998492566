// src/exec/handle.rs

//! The live side of a launched task.

/// Status of a launched task as seen by the supervisor.
///
/// Everything except `Running` is terminal and never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Running,
    Succeeded,
    /// The process exited on its own with a failing exit code. `-1` is used
    /// when no code is available (killed by a signal, runner lost).
    Failed(i32),
    /// The process was stopped because the supervisor asked it to.
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Running)
    }

    /// `Failed` and `Cancelled` both count as a failed task.
    pub fn is_failure(self) -> bool {
        matches!(self, TaskStatus::Failed(_) | TaskStatus::Cancelled)
    }
}

/// One spawned external job.
///
/// Contract:
/// - `poll` never blocks and keeps returning the same status once a terminal
///   status was reached.
/// - `cancel` asks the job to stop. Calling it again, or after the job has
///   finished, has no effect. A cancelled job reaches a terminal status within
///   a bounded grace period.
/// - Dropping a handle must not leak the underlying process.
pub trait TaskHandle: Send {
    /// Name of the task this handle was launched from (diagnostics only).
    fn name(&self) -> &str;

    fn poll(&mut self) -> TaskStatus;

    fn cancel(&mut self);
}

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use failfast::errors::{FailfastError, Result};
use failfast::exec::{Task, TaskHandle, TaskLauncher, TaskStatus};
use tokio::time::Instant;

/// How a fake task behaves once launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// Exit 0 after the given delay.
    SucceedAfter(Duration),
    /// Exit with `code` after the given delay.
    FailAfter(Duration, i32),
    /// Never exits on its own; stops as soon as it is cancelled.
    RunUntilCancelled,
    /// Never exits on its own; takes this long to stop after a cancel
    /// (models a process that needs the grace period).
    StopAfterCancel(Duration),
    /// `launch` itself fails, like a missing executable.
    FailToLaunch,
}

/// Shared record of what the fake launcher and its handles saw.
#[derive(Debug, Clone, Default)]
pub struct FakeRecorder {
    launched: Arc<Mutex<Vec<String>>>,
    cancels: Arc<Mutex<HashMap<String, usize>>>,
    polls: Arc<Mutex<usize>>,
}

impl FakeRecorder {
    /// Names of successfully launched tasks, in launch order.
    pub fn launched(&self) -> Vec<String> {
        self.launched.lock().unwrap().clone()
    }

    /// Raw number of `cancel` calls made on the handle of `task`.
    pub fn cancel_count(&self, task: &str) -> usize {
        self.cancels.lock().unwrap().get(task).copied().unwrap_or(0)
    }

    pub fn total_cancels(&self) -> usize {
        self.cancels.lock().unwrap().values().sum()
    }

    pub fn total_polls(&self) -> usize {
        *self.polls.lock().unwrap()
    }
}

/// A fake launcher that:
/// - never spawns a process
/// - gives every task a handle following its [`Script`]
/// - records launches, polls and every single `cancel` call.
#[derive(Debug, Clone)]
pub struct FakeLauncher {
    scripts: HashMap<String, Script>,
    default_script: Script,
    recorder: FakeRecorder,
}

impl FakeLauncher {
    /// Tasks without a script succeed after 10ms.
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            default_script: Script::SucceedAfter(Duration::from_millis(10)),
            recorder: FakeRecorder::default(),
        }
    }

    pub fn script(mut self, task: &str, script: Script) -> Self {
        self.scripts.insert(task.to_string(), script);
        self
    }

    pub fn recorder(&self) -> FakeRecorder {
        self.recorder.clone()
    }
}

impl Default for FakeLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskLauncher for FakeLauncher {
    fn launch(&mut self, task: Task) -> Result<Box<dyn TaskHandle>> {
        let name = task.name().to_string();
        let script = self
            .scripts
            .get(&name)
            .copied()
            .unwrap_or(self.default_script);

        if script == Script::FailToLaunch {
            return Err(FailfastError::LaunchError {
                task: name,
                source: io::Error::new(io::ErrorKind::NotFound, "fake: no such program"),
            });
        }

        self.recorder.launched.lock().unwrap().push(name.clone());

        Ok(Box::new(FakeHandle {
            name,
            script,
            started: Instant::now(),
            cancelled_at: None,
            status: TaskStatus::Running,
            recorder: self.recorder.clone(),
        }))
    }
}

/// Handle produced by [`FakeLauncher`].
pub struct FakeHandle {
    name: String,
    script: Script,
    started: Instant,
    cancelled_at: Option<Instant>,
    status: TaskStatus,
    recorder: FakeRecorder,
}

impl FakeHandle {
    fn compute_status(&self, now: Instant) -> TaskStatus {
        if let Some(at) = self.cancelled_at {
            return match self.script {
                Script::StopAfterCancel(grace) if now < at + grace => TaskStatus::Running,
                _ => TaskStatus::Cancelled,
            };
        }

        match self.script {
            Script::SucceedAfter(d) if now >= self.started + d => TaskStatus::Succeeded,
            Script::FailAfter(d, code) if now >= self.started + d => TaskStatus::Failed(code),
            _ => TaskStatus::Running,
        }
    }
}

impl TaskHandle for FakeHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn poll(&mut self) -> TaskStatus {
        *self.recorder.polls.lock().unwrap() += 1;
        if !self.status.is_terminal() {
            self.status = self.compute_status(Instant::now());
        }
        self.status
    }

    fn cancel(&mut self) {
        *self
            .recorder
            .cancels
            .lock()
            .unwrap()
            .entry(self.name.clone())
            .or_insert(0) += 1;

        if !self.status.is_terminal() && self.cancelled_at.is_none() {
            self.cancelled_at = Some(Instant::now());
        }
    }
}

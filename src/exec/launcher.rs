// src/exec/launcher.rs

//! Pluggable launcher abstraction.
//!
//! The supervisor talks to a `TaskLauncher` instead of spawning processes
//! itself. Production code uses [`ProcessLauncher`]; tests swap in a fake
//! launcher whose handles follow a script and record every `cancel`.

use std::ffi::OsString;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::info;

use crate::errors::{FailfastError, Result};
use crate::exec::handle::TaskHandle;
use crate::exec::process::ProcessHandle;
use crate::exec::task::Task;
use crate::exec::task_runner::{forward_lines, run_child};
use crate::types::OutputMode;

/// How long a cancelled process gets to exit before it is killed.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Trait abstracting how a task is turned into a running job.
pub trait TaskLauncher: Send {
    /// Start `task` and return its handle.
    ///
    /// Must fail with [`FailfastError::LaunchError`] if the job cannot be
    /// started at all.
    fn launch(&mut self, task: Task) -> Result<Box<dyn TaskHandle>>;
}

/// Launcher that spawns real OS processes with `tokio::process`.
///
/// Must be used from within a Tokio runtime: each process is owned by a
/// spawned runner task.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    grace_period: Duration,
}

impl ProcessLauncher {
    pub fn new(grace_period: Duration) -> Self {
        Self { grace_period }
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }
}

impl Default for ProcessLauncher {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE_PERIOD)
    }
}

impl TaskLauncher for ProcessLauncher {
    fn launch(&mut self, task: Task) -> Result<Box<dyn TaskHandle>> {
        let name = task.name().to_string();
        let launch_err = |source: std::io::Error| FailfastError::LaunchError {
            task: name.clone(),
            source,
        };

        let mut cmd = build_command(&task).map_err(launch_err)?;
        let mut child = cmd.spawn().map_err(launch_err)?;
        let pid = child.id();

        info!(
            task = %name,
            pid,
            cmd = %task.command_line(),
            "started task process"
        );

        if let Some(stdout) = child.stdout.take() {
            forward_lines(name.clone(), "stdout", stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(name.clone(), "stderr", stderr);
        }

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let (done_tx, done_rx) = oneshot::channel();

        tokio::spawn(run_child(
            name.clone(),
            child,
            cancel_rx,
            done_tx,
            self.grace_period,
        ));

        Ok(Box::new(ProcessHandle::new(name, pid, cancel_tx, done_rx)))
    }
}

fn build_command(task: &Task) -> std::io::Result<Command> {
    let mut cmd = Command::new(task.program());
    cmd.args(task.arguments())
        .stdin(Stdio::null())
        .kill_on_drop(true);

    if let Some(dir) = task.working_dir() {
        cmd.current_dir(dir);
    }

    for (key, value) in task.env_overrides() {
        cmd.env(key, value);
    }

    for (key, value) in task.env_appends() {
        // An override of the same key is the base we append to.
        let base = task
            .env_overrides()
            .get(key)
            .map(OsString::from)
            .or_else(|| std::env::var_os(key));
        cmd.env(key, append_path_value(base, value)?);
    }

    match task.output_mode() {
        OutputMode::Log => {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }
        OutputMode::Inherit => {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }
        OutputMode::Null => {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
    }

    // Own process group, so cancellation reaches grandchildren too.
    #[cfg(unix)]
    cmd.process_group(0);

    Ok(cmd)
}

/// Join `value` onto an inherited path-list variable.
fn append_path_value(base: Option<OsString>, value: &str) -> std::io::Result<OsString> {
    let mut parts: Vec<std::path::PathBuf> = match base {
        Some(ref existing) if !existing.is_empty() => std::env::split_paths(existing).collect(),
        _ => Vec::new(),
    };
    parts.push(value.into());

    std::env::join_paths(parts).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })
}

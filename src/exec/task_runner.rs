// src/exec/task_runner.rs

//! Per-process runner task.
//!
//! Every launched process gets one Tokio task that owns the `Child`. It
//! either observes the process exiting on its own, or receives a
//! cancellation request and stops the process: first politely (SIGTERM to
//! the process group on Unix), then by force once the grace period is over.
//! In both cases the final status is delivered exactly once over a oneshot
//! channel, which is what [`ProcessHandle::poll`](super::ProcessHandle)
//! reads.

use std::process::ExitStatus;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::exec::handle::TaskStatus;

pub(crate) async fn run_child(
    name: String,
    mut child: Child,
    mut cancel_rx: oneshot::Receiver<()>,
    done_tx: oneshot::Sender<TaskStatus>,
    grace_period: Duration,
) {
    let pid = child.id();

    // Either the process exits on its own (normal case), or the supervisor
    // asks us to stop it. An exit that is already observable wins over a
    // cancel that arrived at the same time.
    let status = tokio::select! {
        biased;

        status_res = child.wait() => {
            match status_res {
                Ok(status) => exit_status(&name, pid, status),
                Err(e) => {
                    warn!(task = %name, pid, error = %e, "waiting for task process failed");
                    force_kill(&name, &mut child).await;
                    TaskStatus::Failed(-1)
                }
            }
        }

        cancel = &mut cancel_rx => {
            match (cancel, child.try_wait()) {
                // Exited before the reactor reported it.
                (_, Ok(Some(status))) => exit_status(&name, pid, status),
                (Ok(()), _) => {
                    info!(task = %name, pid, "cancellation requested; terminating process");
                    terminate(&name, &mut child, grace_period).await;
                    TaskStatus::Cancelled
                }
                (Err(_), _) => {
                    // The handle was dropped without an explicit cancel.
                    debug!(task = %name, pid, "task handle dropped; killing process");
                    force_kill(&name, &mut child).await;
                    TaskStatus::Cancelled
                }
            }
        }
    };

    if done_tx.send(status).is_err() {
        debug!(task = %name, "task handle gone before the final status was delivered");
    }
}

fn exit_status(name: &str, pid: Option<u32>, status: ExitStatus) -> TaskStatus {
    let code = status.code().unwrap_or(-1);
    info!(
        task = %name,
        pid,
        exit_code = code,
        success = status.success(),
        "task process exited"
    );
    if status.success() {
        TaskStatus::Succeeded
    } else {
        TaskStatus::Failed(code)
    }
}

/// Ask the process to stop, escalating to a kill after `grace_period`.
async fn terminate(name: &str, child: &mut Child, grace_period: Duration) {
    if let Err(e) = request_termination(child) {
        warn!(task = %name, error = %e, "failed to send termination signal");
    }

    match tokio::time::timeout(grace_period, child.wait()).await {
        Ok(Ok(status)) => {
            info!(
                task = %name,
                exit_code = status.code().unwrap_or(-1),
                "task process stopped after cancellation"
            );
        }
        Ok(Err(e)) => {
            warn!(task = %name, error = %e, "error waiting for cancelled task process");
            force_kill(name, child).await;
        }
        Err(_) => {
            warn!(
                task = %name,
                grace_ms = grace_period.as_millis() as u64,
                "task process ignored termination within the grace period; killing"
            );
            force_kill(name, child).await;
        }
    }
}

/// Kill the whole process group (Unix) and reap the child.
async fn force_kill(name: &str, child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        if let Err(e) = signal_group(pid, libc::SIGKILL) {
            debug!(task = %name, pid, error = %e, "failed to SIGKILL process group");
        }
    }

    if let Err(e) = child.kill().await {
        warn!(task = %name, error = %e, "failed to kill task process");
    }
}

#[cfg(unix)]
fn request_termination(child: &mut Child) -> std::io::Result<()> {
    match child.id() {
        Some(pid) => signal_group(pid, libc::SIGTERM),
        // Already reaped.
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child) -> std::io::Result<()> {
    child.start_kill()
}

/// Send `signal` to the process group led by `pid`.
///
/// Task processes are spawned as group leaders, so this also reaches
/// anything a shell wrapper started.
#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) -> std::io::Result<()> {
    let pgid = libc::pid_t::try_from(pid)
        .map_err(|_| std::io::Error::other(format!("pid {pid} out of range")))?;

    // SAFETY: killpg(2) has no memory-safety preconditions; the target group
    // is one we created for our own child.
    #[allow(unsafe_code)]
    let ret = unsafe { libc::killpg(pgid, signal) };
    if ret == -1 {
        let err = std::io::Error::last_os_error();
        // The whole group is already gone.
        if err.raw_os_error() == Some(libc::ESRCH) {
            return Ok(());
        }
        return Err(err);
    }
    Ok(())
}

/// Forward every line of a child's output stream as a `debug` event.
pub(crate) fn forward_lines<R>(name: String, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();

        while let Ok(Some(line)) = lines.next_line().await {
            debug!(task = %name, stream, "{}", line);
        }
    });
}

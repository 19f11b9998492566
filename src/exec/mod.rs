// src/exec/mod.rs

//! Process execution layer.
//!
//! This module turns [`Task`] descriptions into running jobs and exposes
//! them to the supervisor through the [`TaskHandle`] trait.
//!
//! - [`task`] holds the immutable task description.
//! - [`handle`] defines `TaskHandle` and `TaskStatus`.
//! - [`launcher`] provides the `TaskLauncher` trait and the production
//!   `ProcessLauncher`, which tests replace with a fake implementation.
//! - [`process`] is the handle type returned by `ProcessLauncher`.
//! - [`task_runner`] owns each child process: waiting, terminating,
//!   escalating to a kill and forwarding output to the log.

pub mod handle;
pub mod launcher;
pub mod process;
pub mod task;
pub mod task_runner;

pub use handle::{TaskHandle, TaskStatus};
pub use launcher::{DEFAULT_GRACE_PERIOD, ProcessLauncher, TaskLauncher};
pub use process::ProcessHandle;
pub use task::Task;

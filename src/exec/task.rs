// src/exec/task.rs

//! Immutable description of one external job.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::types::OutputMode;

/// One external job: a program, its arguments, where to run it and which
/// environment variables to override.
///
/// A `Task` is built by the caller before the batch starts and handed to a
/// [`TaskLauncher`](crate::exec::TaskLauncher) exactly once. The supervisor
/// never looks inside it beyond the name, which is only used for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    name: String,
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env: BTreeMap<String, String>,
    append_env: BTreeMap<String, String>,
    output: OutputMode,
}

impl Task {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
            append_env: BTreeMap::new(),
            output: OutputMode::default(),
        }
    }

    /// Run `cmd` through the platform shell (`sh -c` / `cmd /C`).
    pub fn shell(name: impl Into<String>, cmd: &str) -> Self {
        if cfg!(windows) {
            Task::new(name, "cmd").arg("/C").arg(cmd)
        } else {
            Task::new(name, "sh").arg("-c").arg(cmd)
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Override (or add) an environment variable for this task only.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Append `value` to the inherited value of `key`, separated by the
    /// platform path separator (e.g. extending `PYTHONPATH`).
    pub fn append_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.append_env.insert(key.into(), value.into());
        self
    }

    pub fn output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn env_overrides(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn env_appends(&self) -> &BTreeMap<String, String> {
        &self.append_env
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output
    }

    /// Human-readable command line, for logs and `--dry-run`.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                line.push_str(&format!("{arg:?}"));
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

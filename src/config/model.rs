// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::engine::SupervisorOptions;
use crate::types::OutputMode;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// poll_interval = "1s"
/// report_interval = "15s"
/// grace_period = "5s"
///
/// [default]
/// env = { RECORD_MODE = "true" }
/// append_env = { PYTHONPATH = "." }
///
/// [task.lint]
/// cmd = "python check.py"
///
/// [[discover]]
/// root = "tests"
/// pattern = "**/test_*.py"
/// program = "python"
/// args = ["{path}"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// Defaults merged into every task from `[default]`.
    #[serde(default)]
    pub default: DefaultSection,

    /// Explicit tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    /// `[[discover]]` rules, each expanding into one task per matching file.
    #[serde(default)]
    pub discover: Vec<DiscoverConfig>,
}

/// Validated configuration.
///
/// Built from a [`RawConfigFile`] through `TryFrom` (see `validate.rs`), so
/// durations are parsed and globs are known to compile.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    options: SupervisorOptions,
    grace_period: std::time::Duration,
    default: DefaultSection,
    task: BTreeMap<String, TaskConfig>,
    discover: Vec<DiscoverConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        options: SupervisorOptions,
        grace_period: std::time::Duration,
        default: DefaultSection,
        task: BTreeMap<String, TaskConfig>,
        discover: Vec<DiscoverConfig>,
    ) -> Self {
        Self {
            options,
            grace_period,
            default,
            task,
            discover,
        }
    }

    pub fn supervisor_options(&self) -> SupervisorOptions {
        self.options
    }

    pub fn grace_period(&self) -> std::time::Duration {
        self.grace_period
    }

    pub fn default_section(&self) -> &DefaultSection {
        &self.default
    }

    pub fn tasks(&self) -> &BTreeMap<String, TaskConfig> {
        &self.task
    }

    pub fn discover_rules(&self) -> &[DiscoverConfig] {
        &self.discover
    }
}

/// `[config]` section: supervisor timing.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Time between two poll sweeps, e.g. `"1s"` or `"200ms"`.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    /// Time between two "N task(s) still running" notifications.
    #[serde(default = "default_report_interval")]
    pub report_interval: String,

    /// How long a cancelled task gets before it is killed.
    #[serde(default = "default_grace_period")]
    pub grace_period: String,
}

fn default_poll_interval() -> String {
    "1s".to_string()
}

fn default_report_interval() -> String {
    "15s".to_string()
}

fn default_grace_period() -> String {
    "5s".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            report_interval: default_report_interval(),
            grace_period: default_grace_period(),
        }
    }
}

/// `[default]` section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct DefaultSection {
    /// Working directory, relative to the config file's directory.
    #[serde(default)]
    pub cwd: Option<String>,

    #[serde(default)]
    pub output: Option<OutputMode>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub append_env: BTreeMap<String, String>,
}

/// `[task.<name>]` section.
///
/// Exactly one of `cmd` (run through the shell) or `program` (+ `args`) must
/// be set.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    #[serde(default)]
    pub cmd: Option<String>,

    #[serde(default)]
    pub program: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,

    /// Overrides `default.cwd`.
    #[serde(default)]
    pub cwd: Option<String>,

    #[serde(default)]
    pub output: Option<OutputMode>,

    /// Merged over `default.env`; task values win.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Merged over `default.append_env`; task values win.
    #[serde(default)]
    pub append_env: BTreeMap<String, String>,
}

/// `[[discover]]` rule: one task per file under `root` matching `pattern`.
///
/// `{path}` in `args` is replaced by the absolute path of the matched file;
/// if no argument contains it, the path is appended as the last argument.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscoverConfig {
    /// Directory to search, relative to the config file's directory.
    pub root: String,

    /// Glob matched against paths relative to `root`.
    pub pattern: String,

    #[serde(default)]
    pub exclude: Vec<String>,

    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub cwd: Option<String>,

    #[serde(default)]
    pub output: Option<OutputMode>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub append_env: BTreeMap<String, String>,
}

/// Placeholder substituted in `[[discover]]` arguments.
pub const PATH_PLACEHOLDER: &str = "{path}";

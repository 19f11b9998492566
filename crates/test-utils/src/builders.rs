#![allow(dead_code)]

use std::collections::BTreeMap;

use failfast::config::{
    ConfigFile, ConfigSection, DefaultSection, DiscoverConfig, RawConfigFile, TaskConfig,
};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                default: DefaultSection::default(),
                task: BTreeMap::new(),
                discover: Vec::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_discover(mut self, rule: DiscoverConfig) -> Self {
        self.config.discover.push(rule);
        self
    }

    pub fn with_default_env(mut self, key: &str, value: &str) -> Self {
        self.config.default.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_default_cwd(mut self, dir: &str) -> Self {
        self.config.default.cwd = Some(dir.to_string());
        self
    }

    pub fn with_poll_interval(mut self, duration: &str) -> Self {
        self.config.config.poll_interval = duration.to_string();
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    /// Task run through the shell.
    pub fn new(cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                cmd: Some(cmd.to_string()),
                ..TaskConfig::default()
            },
        }
    }

    /// Task run as `program` + `args`, without a shell.
    pub fn program(program: &str) -> Self {
        Self {
            task: TaskConfig {
                program: Some(program.to_string()),
                ..TaskConfig::default()
            },
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.task.args.push(arg.to_string());
        self
    }

    pub fn cwd(mut self, dir: &str) -> Self {
        self.task.cwd = Some(dir.to_string());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.task.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn append_env(mut self, key: &str, value: &str) -> Self {
        self.task.append_env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// Builder for a `[[discover]]` rule.
pub struct DiscoverBuilder {
    rule: DiscoverConfig,
}

impl DiscoverBuilder {
    pub fn new(root: &str, pattern: &str, program: &str) -> Self {
        Self {
            rule: DiscoverConfig {
                root: root.to_string(),
                pattern: pattern.to_string(),
                exclude: Vec::new(),
                program: program.to_string(),
                args: Vec::new(),
                cwd: None,
                output: None,
                env: BTreeMap::new(),
                append_env: BTreeMap::new(),
            },
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.rule.args.push(arg.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.rule.exclude.push(pattern.to_string());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.rule.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> DiscoverConfig {
        self.rule
    }
}

// src/config/validate.rs

use std::collections::BTreeSet;
use std::time::Duration;

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::engine::SupervisorOptions;
use crate::errors::{FailfastError, Result};
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::FailfastError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let (options, grace_period) = validate_global_config(&raw)?;
        validate_tasks(&raw)?;
        validate_discover_rules(&raw)?;
        Ok(ConfigFile::new_unchecked(
            options,
            grace_period,
            raw.default,
            raw.task,
            raw.discover,
        ))
    }
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<(SupervisorOptions, Duration)> {
    let poll_interval = parse_field("poll_interval", &cfg.config.poll_interval)?;
    let report_interval = parse_field("report_interval", &cfg.config.report_interval)?;
    let grace_period = parse_field("grace_period", &cfg.config.grace_period)?;

    if poll_interval.is_zero() {
        return Err(FailfastError::ConfigError(
            "[config].poll_interval must be greater than zero".to_string(),
        ));
    }
    if report_interval.is_zero() {
        return Err(FailfastError::ConfigError(
            "[config].report_interval must be greater than zero".to_string(),
        ));
    }

    let options = SupervisorOptions {
        poll_interval,
        report_interval,
    };
    Ok((options, grace_period))
}

fn parse_field(field: &str, value: &str) -> Result<Duration> {
    parse_duration(value)
        .map_err(|e| FailfastError::ConfigError(format!("[config].{field}: {e}")))
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if name.trim().is_empty() {
            return Err(FailfastError::ConfigError(
                "task names must not be empty".to_string(),
            ));
        }

        match (&task.cmd, &task.program) {
            (Some(_), Some(_)) => {
                return Err(FailfastError::ConfigError(format!(
                    "task '{name}' sets both `cmd` and `program`; pick one"
                )));
            }
            (None, None) => {
                return Err(FailfastError::ConfigError(format!(
                    "task '{name}' needs either `cmd` or `program`"
                )));
            }
            (Some(cmd), None) if cmd.trim().is_empty() => {
                return Err(FailfastError::ConfigError(format!(
                    "task '{name}' has an empty `cmd`"
                )));
            }
            (None, Some(program)) if program.trim().is_empty() => {
                return Err(FailfastError::ConfigError(format!(
                    "task '{name}' has an empty `program`"
                )));
            }
            (Some(_), None) if !task.args.is_empty() => {
                return Err(FailfastError::ConfigError(format!(
                    "task '{name}' uses `args` with `cmd`; put arguments into `cmd` or use `program`"
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

fn validate_discover_rules(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = BTreeSet::new();

    for (i, rule) in cfg.discover.iter().enumerate() {
        if rule.program.trim().is_empty() {
            return Err(FailfastError::ConfigError(format!(
                "[[discover]] #{} has an empty `program`",
                i + 1
            )));
        }

        for pattern in std::iter::once(&rule.pattern).chain(rule.exclude.iter()) {
            Glob::new(pattern).map_err(|e| {
                FailfastError::ConfigError(format!(
                    "[[discover]] #{} has an invalid glob '{}': {}",
                    i + 1,
                    pattern,
                    e
                ))
            })?;
        }

        if !seen.insert((rule.root.as_str(), rule.pattern.as_str())) {
            return Err(FailfastError::ConfigError(format!(
                "[[discover]] #{} repeats root '{}' with pattern '{}'",
                i + 1,
                rule.root,
                rule.pattern
            )));
        }
    }
    Ok(())
}

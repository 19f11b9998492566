// src/config/batch.rs

//! Turn a validated [`ConfigFile`] into the ordered list of [`Task`]s that
//! make up one batch.
//!
//! Explicit `[task.<name>]` entries come first (sorted by name), followed by
//! each `[[discover]]` rule's matches (sorted by path).

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::config::model::{ConfigFile, DefaultSection, DiscoverConfig, PATH_PLACEHOLDER, TaskConfig};
use crate::errors::{FailfastError, Result};
use crate::exec::Task;
use crate::fs::FileSystem;

/// Build the batch described by `cfg`.
///
/// `root_dir` is the directory relative paths are resolved against (the
/// config file's directory).
pub fn build_tasks(cfg: &ConfigFile, root_dir: &Path, fs: &dyn FileSystem) -> Result<Vec<Task>> {
    let defaults = cfg.default_section();
    let mut names = BTreeSet::new();
    let mut tasks = Vec::new();

    for (name, task_cfg) in cfg.tasks() {
        names.insert(name.clone());
        tasks.push(explicit_task(name, task_cfg, defaults, root_dir));
    }

    for rule in cfg.discover_rules() {
        for path in discover_files(rule, root_dir, fs)? {
            let name = task_name_for(&path, root_dir);
            if !names.insert(name.clone()) {
                return Err(FailfastError::ConfigError(format!(
                    "discovered task '{name}' clashes with another task of the same name"
                )));
            }
            tasks.push(discovered_task(name, &path, rule, defaults, root_dir));
        }
    }

    debug!(count = tasks.len(), "built batch from config");
    Ok(tasks)
}

fn explicit_task(name: &str, cfg: &TaskConfig, defaults: &DefaultSection, root_dir: &Path) -> Task {
    let task = match (&cfg.cmd, &cfg.program) {
        (Some(cmd), _) => Task::shell(name, cmd),
        (None, Some(program)) => Task::new(name, program.as_str()).args(cfg.args.iter().cloned()),
        // Ruled out by validation.
        (None, None) => Task::new(name, ""),
    };

    apply_settings(
        task,
        Settings {
            cwd: cfg.cwd.as_deref(),
            output: cfg.output,
            env: &cfg.env,
            append_env: &cfg.append_env,
        },
        defaults,
        root_dir,
    )
}

fn discovered_task(
    name: String,
    path: &Path,
    rule: &DiscoverConfig,
    defaults: &DefaultSection,
    root_dir: &Path,
) -> Task {
    let path_str = path.to_string_lossy();
    let mut args: Vec<String> = rule
        .args
        .iter()
        .map(|a| a.replace(PATH_PLACEHOLDER, &path_str))
        .collect();
    if !rule.args.iter().any(|a| a.contains(PATH_PLACEHOLDER)) {
        args.push(path_str.into_owned());
    }

    let task = Task::new(name, rule.program.as_str()).args(args);

    apply_settings(
        task,
        Settings {
            cwd: rule.cwd.as_deref(),
            output: rule.output,
            env: &rule.env,
            append_env: &rule.append_env,
        },
        defaults,
        root_dir,
    )
}

/// Per-task settings that fall back to `[default]`.
struct Settings<'a> {
    cwd: Option<&'a str>,
    output: Option<crate::types::OutputMode>,
    env: &'a BTreeMap<String, String>,
    append_env: &'a BTreeMap<String, String>,
}

fn apply_settings(mut task: Task, settings: Settings<'_>, defaults: &DefaultSection, root_dir: &Path) -> Task {
    let cwd = settings.cwd.or(defaults.cwd.as_deref());
    task = task.cwd(match cwd {
        Some(dir) => root_dir.join(dir),
        None => root_dir.to_path_buf(),
    });

    if let Some(output) = settings.output.or(defaults.output) {
        task = task.output(output);
    }

    // Task values are applied last, so they win.
    for (k, v) in defaults.env.iter().chain(settings.env.iter()) {
        task = task.env(k.as_str(), v.as_str());
    }
    for (k, v) in defaults.append_env.iter().chain(settings.append_env.iter()) {
        task = task.append_env(k.as_str(), v.as_str());
    }

    task
}

/// All files under `rule.root` matching the rule, sorted by path.
fn discover_files(rule: &DiscoverConfig, root_dir: &Path, fs: &dyn FileSystem) -> Result<Vec<PathBuf>> {
    let search_root = root_dir.join(&rule.root);
    if !fs.is_dir(&search_root) {
        return Err(FailfastError::ConfigError(format!(
            "[[discover]] root '{}' is not a directory",
            search_root.display()
        )));
    }

    let include = build_globset(std::slice::from_ref(&rule.pattern))?;
    let exclude = build_globset(&rule.exclude)?;

    let mut files = Vec::new();
    let mut stack = vec![search_root.clone()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Ok(rel) = path.strip_prefix(&search_root) {
                    let rel_str = rel.to_string_lossy().replace('\\', "/");
                    if include.is_match(&rel_str) && !exclude.is_match(&rel_str) {
                        files.push(path);
                    }
                }
            }
        }
    }

    files.sort();
    debug!(root = %search_root.display(), pattern = %rule.pattern, count = files.len(), "discovered files");
    Ok(files)
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build().context("building glob set")?)
}

/// Discovered tasks are named by their path relative to the config
/// directory, with forward slashes.
fn task_name_for(path: &Path, root_dir: &Path) -> String {
    let rel = path.strip_prefix(root_dir).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}

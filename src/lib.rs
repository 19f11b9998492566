// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{build_tasks, config_root_dir, load_and_validate};
use crate::engine::{LogReporter, Supervisor, SupervisorOptions};
use crate::exec::{ProcessLauncher, Task};
use crate::fs::RealFileSystem;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and batch expansion
/// - the process launcher and log reporter
/// - the supervisor
/// - Ctrl-C and `--timeout` handling
///
/// Returns the process exit code.
pub async fn run(args: CliArgs) -> Result<i32> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let root_dir = config_root_dir(&config_path);

    let tasks = build_tasks(&cfg, &root_dir, &RealFileSystem)?;

    let defaults = cfg.supervisor_options();
    let options = SupervisorOptions {
        poll_interval: args.poll_interval.unwrap_or(defaults.poll_interval),
        report_interval: args.report_interval.unwrap_or(defaults.report_interval),
    };
    let grace_period = args.grace_period.unwrap_or(cfg.grace_period());

    if args.dry_run {
        print_dry_run(&tasks, options, grace_period);
        return Ok(0);
    }

    if options.poll_interval.is_zero() || options.report_interval.is_zero() {
        anyhow::bail!("--poll-interval and --report-interval must be greater than zero");
    }

    let launcher = ProcessLauncher::new(grace_period);
    let mut supervisor = Supervisor::new(launcher, LogReporter, options);

    let names: Vec<_> = tasks.iter().map(Task::name).collect();
    info!(?names, options = ?supervisor.options(), ?grace_period, "starting batch");

    let result = supervisor
        .run_until(tasks, interrupt_signal(args.timeout))
        .await?;

    println!("{result}");
    Ok(result.exit_code())
}

/// Completes on Ctrl-C or when the optional overall timeout expires.
async fn interrupt_signal(timeout: Option<Duration>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    let deadline = async {
        match timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = ctrl_c => info!("Ctrl+C received"),
        _ = deadline => warn!(?timeout, "batch timeout expired"),
    }
}

/// Simple dry-run output: print timing and every task of the batch.
fn print_dry_run(tasks: &[Task], options: SupervisorOptions, grace_period: Duration) {
    println!("failfast dry-run");
    println!("  poll_interval = {:?}", options.poll_interval);
    println!("  report_interval = {:?}", options.report_interval);
    println!("  grace_period = {:?}", grace_period);
    println!();

    println!("tasks ({}):", tasks.len());
    for task in tasks {
        println!("  - {}", task.name());
        println!("      cmd: {}", task.command_line());
        if let Some(dir) = task.working_dir() {
            println!("      cwd: {}", dir.display());
        }
        for (key, value) in task.env_overrides() {
            println!("      env: {key}={value}");
        }
        for (key, value) in task.env_appends() {
            println!("      append_env: {key}+={value}");
        }
        println!("      output: {:?}", task.output_mode());
    }

    debug!("dry-run complete (no execution)");
}

// src/config/mod.rs

//! Configuration loading and validation for failfast.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate timing, task definitions and discovery rules (`validate.rs`).
//! - Expand the config into the batch of tasks to run (`batch.rs`).

pub mod batch;
pub mod loader;
pub mod model;
pub mod validate;

pub use batch::build_tasks;
pub use loader::{config_root_dir, load_and_validate, load_from_path};
pub use model::{
    ConfigFile, ConfigSection, DefaultSection, DiscoverConfig, RawConfigFile, TaskConfig,
};

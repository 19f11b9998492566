// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FailfastError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// A task's process could not be started. Fatal for the whole batch.
    #[error("Failed to launch task '{task}': {source}")]
    LaunchError {
        task: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FailfastError {
    /// True if this error came from spawning a task process.
    pub fn is_launch_error(&self) -> bool {
        matches!(self, FailfastError::LaunchError { .. })
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, FailfastError>;

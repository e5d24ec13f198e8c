//! Error types shared across the crate.
//!
//! Batch-level failures are not errors: executors report them as
//! [`crate::engine::executor::Outcome`] values. The types here cover what can
//! stop the process or a whole controller step.

use thiserror::Error;

pub use crate::browser::BrowserError;

/// Unrecoverable configuration problems. The bot never starts a batch with one.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {msg}")]
    Io { path: String, msg: String },

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Missing required configuration field: '{field}'")]
    MissingField { field: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Unknown task '{name}'")]
    UnknownTask { name: String },
}

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("checkpoint JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum BotError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("authentication failed: {0}")]
    Authentication(String),
}

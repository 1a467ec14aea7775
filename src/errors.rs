// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Only setup-level failures surface as [`ThunderError`]; everything that
//! happens inside the control loop (build failures, crashes, per-directory
//! watch errors) is contained there and reported through logging.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ThunderError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("File watcher error: {0}")]
    WatchError(#[from] notify::Error),

    #[error("No watchable directories under {0:?}")]
    NoWatchableDirectories(Vec<PathBuf>),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ThunderError>;

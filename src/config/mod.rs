// src/config/mod.rs

//! Configuration loading and validation for thunder.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk, or fall back to defaults (`loader.rs`).
//! - Turn the raw file into a validated [`WatchConfig`] (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    default_config_path, load_and_validate, load_from_path, load_or_default, render_template,
    ConfigOrigin,
};
pub use model::{RawConfigFile, WatchConfig};

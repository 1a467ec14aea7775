// src/project/init.rs

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{info, warn};

use crate::config::model::{DEFAULT_MAIN_FILE, DEFAULT_SOURCE_SUFFIX};
use crate::config::render_template;
use crate::fs::FileSystem;
use crate::project::detect::detect_entry_point;

/// Result of `thunder init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// A configuration file was already present; nothing was touched.
    AlreadyInitialised(PathBuf),
    Created {
        config: PathBuf,
        main_file: String,
        /// False when no entry point was found and the default was used.
        detected: bool,
    },
}

/// Write a starter configuration to `config_path` (relative paths are taken
/// from `root`) and create the build output directory under `root`.
pub fn init_project(fs: &dyn FileSystem, root: &Path, config_path: &Path) -> Result<InitOutcome> {
    let config_path = root.join(config_path);
    if fs.exists(&config_path) {
        warn!(path = ?config_path, "configuration already exists; leaving it alone");
        return Ok(InitOutcome::AlreadyInitialised(config_path));
    }

    let (main_file, detected) = match detect_entry_point(fs, root, DEFAULT_SOURCE_SUFFIX) {
        Some(entry) => (entry.to_string_lossy().replace('\\', "/"), true),
        None => {
            warn!(
                fallback = DEFAULT_MAIN_FILE,
                "no entry point found; using the default"
            );
            (DEFAULT_MAIN_FILE.to_string(), false)
        }
    };
    if detected {
        info!(main_file = %main_file, "detected entry point");
    }

    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs.create_dir_all(parent)?;
    }
    fs.write(&config_path, render_template(&main_file).as_bytes())?;
    fs.create_dir_all(&root.join("tmp"))?;

    info!(path = ?config_path, "created configuration");
    Ok(InitOutcome::Created {
        config: config_path,
        main_file,
        detected,
    })
}

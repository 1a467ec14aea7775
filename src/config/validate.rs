// src/config/validate.rs

use std::path::PathBuf;
use std::time::Duration;

use crate::config::model::{RawConfigFile, WatchConfig};
use crate::errors::{Result, ThunderError};
use crate::watch::exclude::ExcludeSet;

impl TryFrom<RawConfigFile> for WatchConfig {
    type Error = crate::errors::ThunderError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;

        let exclude = ExcludeSet::new(&raw.exclude_dirs)
            .map_err(|e| ThunderError::ConfigError(format!("exclude_dirs: {e:#}")))?;

        // An explicitly empty list means "the current directory", same as omitting it.
        let watch_dirs: Vec<PathBuf> = if raw.watch_dirs.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            raw.watch_dirs.iter().map(PathBuf::from).collect()
        };

        Ok(WatchConfig::new_unchecked(
            PathBuf::from(raw.build_path),
            raw.main_file,
            watch_dirs,
            exclude,
            raw.build_args,
            raw.run_args,
            Duration::from_millis(raw.debounce),
            raw.build_tool,
            raw.source_suffix,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_non_empty("build_path", &cfg.build_path)?;
    ensure_non_empty("main_file", &cfg.main_file)?;
    ensure_non_empty("build_tool", &cfg.build_tool)?;
    ensure_non_empty("source_suffix", &cfg.source_suffix)?;
    validate_watch_dirs(cfg)?;
    Ok(())
}

fn ensure_non_empty(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ThunderError::ConfigError(format!(
            "`{key}` must not be empty"
        )));
    }
    Ok(())
}

fn validate_watch_dirs(cfg: &RawConfigFile) -> Result<()> {
    for dir in cfg.watch_dirs.iter() {
        if dir.trim().is_empty() {
            return Err(ThunderError::ConfigError(
                "`watch_dirs` contains an empty entry".to_string(),
            ));
        }
    }
    Ok(())
}

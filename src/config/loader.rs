// src/config/loader.rs

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::model::{RawConfigFile, WatchConfig};
use crate::errors::{Result, ThunderError};

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Read from this file.
    File(PathBuf),
    /// No config file found; built-in defaults.
    Defaults,
}

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it into a [`WatchConfig`].
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<WatchConfig> {
    let raw_config = load_from_path(&path)?;
    let config = WatchConfig::try_from(raw_config)?;
    Ok(config)
}

/// Like [`load_and_validate`], but a missing file yields the built-in
/// defaults instead of an error. Any other failure (unreadable file, bad
/// TOML, invalid values) is still reported.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<(WatchConfig, ConfigOrigin)> {
    let path = path.as_ref();
    match load_and_validate(path) {
        Ok(cfg) => Ok((cfg, ConfigOrigin::File(path.to_path_buf()))),
        Err(ThunderError::IoError(err)) if err.kind() == ErrorKind::NotFound => {
            Ok((WatchConfig::default(), ConfigOrigin::Defaults))
        }
        Err(err) => Err(err),
    }
}

/// Config file looked up in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("thunder.toml")
}

/// Starter configuration written by `thunder init`.
pub fn render_template(main_file: &str) -> String {
    format!(
        r#"# Thunder configuration
# Rebuild and restart your app on every save.

# Build settings
build_path = "./tmp/main"
main_file = "{main_file}"
build_tool = "go"
build_args = []
run_args = []

# Watch settings
watch_dirs = ["."]
exclude_dirs = ["tmp", "vendor", ".git", "node_modules", ".idea", "bin"]
source_suffix = ".go"

# Quiet period after the last change before rebuilding (milliseconds)
debounce = 100
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_round_trips_through_the_parser() {
        let raw: RawConfigFile = toml::from_str(&render_template("cmd/api/main.go")).unwrap();
        assert_eq!(raw.main_file, "cmd/api/main.go");

        let cfg = WatchConfig::try_from(raw).unwrap();
        assert_eq!(cfg.build_path(), &PathBuf::from("./tmp/main"));
        assert_eq!(cfg.debounce().as_millis(), 100);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (cfg, origin) = load_or_default(dir.path().join("thunder.toml")).unwrap();
        assert_eq!(origin, ConfigOrigin::Defaults);
        assert_eq!(cfg.main_file(), "main.go");
    }
}

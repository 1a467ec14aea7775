#![allow(dead_code)]

use thunder::config::{RawConfigFile, WatchConfig};

/// Builder for `WatchConfig` to simplify test setup.
///
/// Starts from the built-in defaults.
pub struct WatchConfigBuilder {
    config: RawConfigFile,
}

impl WatchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn main_file(mut self, main_file: &str) -> Self {
        self.config.main_file = main_file.to_string();
        self
    }

    pub fn build_path(mut self, path: &str) -> Self {
        self.config.build_path = path.to_string();
        self
    }

    /// Replace the watch roots.
    pub fn watch_dirs(mut self, dirs: &[&str]) -> Self {
        self.config.watch_dirs = dirs.iter().map(|d| d.to_string()).collect();
        self
    }

    /// Add one exclusion on top of the defaults.
    pub fn exclude_dir(mut self, pattern: &str) -> Self {
        self.config.exclude_dirs.push(pattern.to_string());
        self
    }

    pub fn build_arg(mut self, arg: &str) -> Self {
        self.config.build_args.push(arg.to_string());
        self
    }

    pub fn run_arg(mut self, arg: &str) -> Self {
        self.config.run_args.push(arg.to_string());
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.debounce = ms;
        self
    }

    pub fn build_tool(mut self, tool: &str) -> Self {
        self.config.build_tool = tool.to_string();
        self
    }

    pub fn source_suffix(mut self, suffix: &str) -> Self {
        self.config.source_suffix = suffix.to_string();
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> WatchConfig {
        WatchConfig::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for WatchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

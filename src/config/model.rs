// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::watch::exclude::ExcludeSet;

/// Configuration as read from `thunder.toml`.
///
/// Every key is optional; a missing key takes the same default the
/// supervisor uses when no config file exists at all:
///
/// ```toml
/// build_path = "./tmp/main"
/// main_file = "main.go"
/// watch_dirs = ["."]
/// exclude_dirs = ["tmp", "vendor", ".git", "node_modules", ".idea", "bin"]
/// build_args = []
/// run_args = []
/// debounce = 100
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RawConfigFile {
    /// Where the build step writes the executable.
    pub build_path: String,

    /// Entry-point source handed to the build step as its last argument.
    pub main_file: String,

    /// Roots to watch recursively.
    pub watch_dirs: Vec<String>,

    /// Directory base names (or base-name globs) skipped at any depth.
    pub exclude_dirs: Vec<String>,

    /// Extra arguments placed between `build -o <artifact>` and the entry point.
    pub build_args: Vec<String>,

    /// Arguments passed to the artifact when it is started.
    pub run_args: Vec<String>,

    /// Quiet period in milliseconds.
    pub debounce: u64,

    /// Program invoked as `<build_tool> build -o ...`.
    pub build_tool: String,

    /// Only changes to files whose name ends with this suffix trigger a rebuild.
    pub source_suffix: String,
}

pub(crate) const DEFAULT_BUILD_PATH: &str = "./tmp/main";
pub(crate) const DEFAULT_MAIN_FILE: &str = "main.go";
pub(crate) const DEFAULT_EXCLUDE_DIRS: [&str; 6] =
    ["tmp", "vendor", ".git", "node_modules", ".idea", "bin"];
pub(crate) const DEFAULT_DEBOUNCE_MS: u64 = 100;
pub(crate) const DEFAULT_BUILD_TOOL: &str = "go";
pub(crate) const DEFAULT_SOURCE_SUFFIX: &str = ".go";

impl Default for RawConfigFile {
    fn default() -> Self {
        Self {
            build_path: DEFAULT_BUILD_PATH.to_string(),
            main_file: DEFAULT_MAIN_FILE.to_string(),
            watch_dirs: vec![".".to_string()],
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect(),
            build_args: Vec::new(),
            run_args: Vec::new(),
            debounce: DEFAULT_DEBOUNCE_MS,
            build_tool: DEFAULT_BUILD_TOOL.to_string(),
            source_suffix: DEFAULT_SOURCE_SUFFIX.to_string(),
        }
    }
}

/// Validated, immutable watch configuration.
///
/// Construct via `WatchConfig::try_from(RawConfigFile)` (see `validate.rs`),
/// `WatchConfig::default()`, or the loader helpers.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    build_path: PathBuf,
    main_file: String,
    watch_dirs: Vec<PathBuf>,
    exclude: ExcludeSet,
    build_args: Vec<String>,
    run_args: Vec<String>,
    debounce: Duration,
    build_tool: String,
    source_suffix: String,
}

impl WatchConfig {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new_unchecked(
        build_path: PathBuf,
        main_file: String,
        watch_dirs: Vec<PathBuf>,
        exclude: ExcludeSet,
        build_args: Vec<String>,
        run_args: Vec<String>,
        debounce: Duration,
        build_tool: String,
        source_suffix: String,
    ) -> Self {
        Self {
            build_path,
            main_file,
            watch_dirs,
            exclude,
            build_args,
            run_args,
            debounce,
            build_tool,
            source_suffix,
        }
    }

    pub fn build_path(&self) -> &PathBuf {
        &self.build_path
    }

    pub fn main_file(&self) -> &str {
        &self.main_file
    }

    pub fn watch_dirs(&self) -> &[PathBuf] {
        &self.watch_dirs
    }

    pub fn exclude(&self) -> &ExcludeSet {
        &self.exclude
    }

    pub fn build_args(&self) -> &[String] {
        &self.build_args
    }

    pub fn run_args(&self) -> &[String] {
        &self.run_args
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn build_tool(&self) -> &str {
        &self.build_tool
    }

    pub fn source_suffix(&self) -> &str {
        &self.source_suffix
    }

    /// Copy of this config with a different entry point (`thunder run <ENTRY>`).
    pub fn with_main_file(mut self, main_file: impl Into<String>) -> Self {
        self.main_file = main_file.into();
        self
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        // The built-in defaults always validate.
        match WatchConfig::try_from(RawConfigFile::default()) {
            Ok(cfg) => cfg,
            Err(err) => unreachable!("built-in defaults are invalid: {err}"),
        }
    }
}

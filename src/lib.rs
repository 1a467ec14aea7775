// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod project;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::{load_or_default, ConfigOrigin, WatchConfig};
use crate::engine::{Runtime, Supervisor};
use crate::errors::{Result, ThunderError};
use crate::exec::{ensure_parent_dir, SystemToolchain};
use crate::fs::{FileSystem, RealFileSystem};
use crate::project::{init_project, InitOutcome};
use crate::types::ChangeEvent;
use crate::watch::ChangeSource;

/// Capacity of the channel between the change source and the debouncer.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    match args.command {
        Command::Init => {
            let fs = RealFileSystem;
            match init_project(&fs, Path::new("."), Path::new(&args.config))? {
                InitOutcome::AlreadyInitialised(path) => {
                    eprintln!("{} already exists", path.display());
                }
                InitOutcome::Created {
                    config, main_file, ..
                } => {
                    eprintln!("created {} (entry point: {main_file})", config.display());
                    eprintln!("run `thunder run` to start");
                }
            }
            Ok(())
        }
        Command::Run { entry } => {
            let config_path = PathBuf::from(&args.config);
            let cfg = load_config(&config_path, entry)?;
            run_supervisor(cfg, shutdown_signal()).await
        }
    }
}

fn load_config(path: &Path, entry: Option<String>) -> Result<WatchConfig> {
    let (mut cfg, origin) = load_or_default(path)?;
    match origin {
        ConfigOrigin::File(path) => info!(path = ?path, "loaded configuration"),
        ConfigOrigin::Defaults => {
            warn!(path = ?path, "no configuration file found; using defaults")
        }
    }
    if let Some(entry) = entry {
        cfg = cfg.with_main_file(entry);
    }
    Ok(cfg)
}

/// Watch, build and run with the real filesystem and toolchain until
/// `shutdown` resolves.
///
/// Setup failures (artifact directory, watcher creation, nothing to watch)
/// are returned before anything is built.
pub async fn run_supervisor<S>(cfg: WatchConfig, shutdown: S) -> Result<()>
where
    S: std::future::Future<Output = ()>,
{
    ensure_parent_dir(cfg.build_path()).map_err(|err| {
        ThunderError::ConfigError(format!(
            "cannot create directory for {:?}: {err}",
            cfg.build_path()
        ))
    })?;

    let (tx, rx) = mpsc::channel::<ChangeEvent>(EVENT_CHANNEL_CAPACITY);
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let source = ChangeSource::open(&cfg, fs, tx)?;

    let supervisor = Supervisor::new(cfg, SystemToolchain);
    Runtime::new(supervisor, rx)
        .with_source(source)
        .run(shutdown)
        .await
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

// src/exec/toolchain.rs

//! Pluggable build/run backend.
//!
//! The supervisor talks to a [`Toolchain`] instead of spawning processes
//! itself. [`SystemToolchain`] is the production implementation; tests can
//! provide their own that records what was built and launched without
//! touching a compiler.

use std::future::Future;
use std::pin::Pin;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::WatchConfig;
use crate::errors::Result;
use crate::exec::process::{CommandSpec, ProcessHandle};

/// How a build step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    Succeeded,
    /// The build command exited with a failure status (`None`: killed by a signal).
    Failed(Option<i32>),
    /// Shutdown began while the build was running; the build was killed.
    Cancelled,
}

/// Trait abstracting how the artifact is built and started.
pub trait Toolchain: Send + Sync + 'static {
    /// Build the configured entry point into the configured artifact path.
    ///
    /// Output goes straight to the developer's terminal. If `cancel` fires
    /// the build must be abandoned and [`BuildOutcome::Cancelled`] returned.
    /// `Err` is reserved for failing to run the build command at all.
    fn build<'a>(
        &'a self,
        config: &'a WatchConfig,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<BuildOutcome>> + Send + 'a>>;

    /// Start the freshly built artifact. Must not block.
    fn launch(&self, config: &WatchConfig) -> Result<ProcessHandle>;
}

/// `<build_tool> build -o <build_path> <build_args...> <main_file>`
pub fn build_command(config: &WatchConfig) -> CommandSpec {
    CommandSpec::new(config.build_tool())
        .arg("build")
        .arg("-o")
        .arg(config.build_path().as_os_str())
        .args(config.build_args())
        .arg(config.main_file())
}

/// `<build_path> <run_args...>`
pub fn run_command(config: &WatchConfig) -> CommandSpec {
    CommandSpec::new(config.build_path().as_os_str()).args(config.run_args())
}

/// Real toolchain: runs the configured build tool and the built artifact as
/// OS processes.
#[derive(Debug, Clone, Default)]
pub struct SystemToolchain;

impl Toolchain for SystemToolchain {
    fn build<'a>(
        &'a self,
        config: &'a WatchConfig,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<BuildOutcome>> + Send + 'a>> {
        Box::pin(async move {
            let spec = build_command(config);
            debug!(cmd = %spec.display(), "running build");

            let mut child = spec
                .command()
                .spawn()
                .with_context(|| format!("spawning build command '{}'", spec.display()))?;

            tokio::select! {
                status = child.wait() => {
                    let status = status
                        .with_context(|| format!("waiting for build command '{}'", spec.display()))?;
                    if status.success() {
                        Ok(BuildOutcome::Succeeded)
                    } else {
                        Ok(BuildOutcome::Failed(status.code()))
                    }
                }
                () = cancel.cancelled() => {
                    info!("shutdown requested; killing build");
                    // kill_on_drop covers the case where this fails.
                    let _ = child.kill().await;
                    Ok(BuildOutcome::Cancelled)
                }
            }
        })
    }

    fn launch(&self, config: &WatchConfig) -> Result<ProcessHandle> {
        Ok(ProcessHandle::start(&run_command(config))?)
    }
}

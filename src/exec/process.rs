// src/exec/process.rs

//! One supervised child process.

use std::ffi::OsString;
use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Pause observed after an instance is gone, so the OS can release its
/// ports and file locks before the artifact is rebuilt.
pub const STOP_GRACE: Duration = Duration::from_millis(50);

/// Upper bound on waiting for a cancelled instance to exit. After that the
/// instance is detached (its waiter keeps running in the background).
pub const VACATE_TIMEOUT: Duration = Duration::from_secs(5);

/// A program plus its arguments, run with the terminal's standard streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl CommandSpec {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Human-readable command line for logs.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.to_string_lossy().into_owned()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }

    /// Tokio command inheriting stdin/stdout/stderr. The child is killed if
    /// its handle is dropped.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }
}

/// How an instance ended, as seen by its waiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceExit {
    /// We cancelled it. Never reported as a failure.
    Stopped,
    /// Exited on its own with status zero.
    Finished,
    /// Exited on its own with a failure status. `None` means it was killed
    /// by a signal we did not send.
    Crashed(Option<i32>),
    /// The exit could not be observed.
    Lost,
}

/// Decide what an observed exit means.
///
/// `cancelled` wins over everything else: once a stop was requested, any
/// exit status (including the one produced by killing the child) is ours.
pub fn classify_exit(status: &std::io::Result<Option<i32>>, cancelled: bool) -> InstanceExit {
    if cancelled {
        return InstanceExit::Stopped;
    }
    match status {
        Ok(Some(0)) => InstanceExit::Finished,
        Ok(code) => InstanceExit::Crashed(*code),
        Err(_) => InstanceExit::Lost,
    }
}

/// Handle on the running instance of the artifact.
///
/// The process is observed by a background waiter task. [`stop`] cancels it
/// through the handle's [`CancellationToken`]; an exit that happens after
/// cancellation is never logged as a crash.
///
/// [`stop`]: ProcessHandle::stop
pub struct ProcessHandle {
    label: String,
    pid: Option<u32>,
    cancel: CancellationToken,
    waiter: JoinHandle<InstanceExit>,
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("label", &self.label)
            .field("pid", &self.pid)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl ProcessHandle {
    /// Spawn `spec` with inherited terminal streams. Returns as soon as the
    /// process is started.
    pub fn start(spec: &CommandSpec) -> anyhow::Result<Self> {
        let label = spec.display();
        let mut child = spec
            .command()
            .spawn()
            .with_context(|| format!("starting '{label}'"))?;
        let pid = child.id();

        let mut handle = Self::from_exit_future(label, move |token| async move {
            tokio::select! {
                status = child.wait() => status.map(|s| s.code()),
                () = token.cancelled() => {
                    child.kill().await?;
                    Ok(None)
                }
            }
        });
        handle.pid = pid;
        Ok(handle)
    }

    /// Supervise an arbitrary exit future.
    ///
    /// `exit` receives the handle's cancellation token and must resolve once
    /// the underlying instance is gone, with its exit code (`Some(0)` for
    /// success). This is what [`start`](Self::start) builds on, and what
    /// fake toolchains use to stand in for real processes.
    pub fn from_exit_future<F, Fut>(label: impl Into<String>, exit: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = std::io::Result<Option<i32>>> + Send + 'static,
    {
        let label = label.into();
        let cancel = CancellationToken::new();
        let exit = exit(cancel.clone());

        let token = cancel.clone();
        let waiter_label = label.clone();
        let waiter = tokio::spawn(async move {
            let status = exit.await;
            let outcome = classify_exit(&status, token.is_cancelled());
            report_exit(&waiter_label, &status, outcome);
            outcome
        });

        Self {
            label,
            pid: None,
            cancel,
            waiter,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// True once the instance has exited and its exit was reported.
    pub fn is_finished(&self) -> bool {
        self.waiter.is_finished()
    }

    /// Cancel the instance, wait (bounded) for its exit to be observed, then
    /// observe [`STOP_GRACE`].
    ///
    /// Returns `None` if the instance did not exit within
    /// [`VACATE_TIMEOUT`] and was detached.
    pub async fn stop(self) -> Option<InstanceExit> {
        let Self {
            label,
            cancel,
            mut waiter,
            ..
        } = self;

        cancel.cancel();

        let exit = match tokio::time::timeout(VACATE_TIMEOUT, &mut waiter).await {
            Ok(Ok(exit)) => Some(exit),
            Ok(Err(err)) => {
                warn!(app = %label, error = %err, "waiter task failed while stopping");
                Some(InstanceExit::Lost)
            }
            Err(_) => {
                warn!(
                    app = %label,
                    timeout_ms = VACATE_TIMEOUT.as_millis() as u64,
                    "instance did not exit in time; detaching it"
                );
                None
            }
        };

        tokio::time::sleep(STOP_GRACE).await;
        exit
    }

    /// Wait for the instance to exit on its own.
    pub async fn wait(self) -> InstanceExit {
        match self.waiter.await {
            Ok(exit) => exit,
            Err(err) => {
                warn!(app = %self.label, error = %err, "waiter task failed");
                InstanceExit::Lost
            }
        }
    }
}

fn report_exit(label: &str, status: &std::io::Result<Option<i32>>, outcome: InstanceExit) {
    match outcome {
        InstanceExit::Stopped => debug!(app = %label, "application stopped"),
        InstanceExit::Finished => info!(app = %label, "application exited"),
        InstanceExit::Crashed(code) => error!(
            app = %label,
            exit_code = ?code,
            "application exited with error"
        ),
        InstanceExit::Lost => {
            if let Err(err) = status {
                warn!(app = %label, error = %err, "could not observe application exit");
            }
        }
    }
}

/// Make sure the directory the artifact is written into exists.
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_always_means_stopped() {
        assert_eq!(classify_exit(&Ok(Some(1)), true), InstanceExit::Stopped);
        assert_eq!(classify_exit(&Ok(None), true), InstanceExit::Stopped);
        assert_eq!(classify_exit(&Ok(Some(0)), true), InstanceExit::Stopped);
    }

    #[test]
    fn uncancelled_failures_are_crashes() {
        assert_eq!(classify_exit(&Ok(Some(2)), false), InstanceExit::Crashed(Some(2)));
        assert_eq!(classify_exit(&Ok(None), false), InstanceExit::Crashed(None));
        assert_eq!(classify_exit(&Ok(Some(0)), false), InstanceExit::Finished);
    }

    #[test]
    fn command_spec_display_joins_arguments() {
        let spec = CommandSpec::new("go").args(["build", "-o", "./tmp/main"]).arg("main.go");
        assert_eq!(spec.display(), "go build -o ./tmp/main main.go");
    }

    #[tokio::test(start_paused = true)]
    async fn stop_reports_stopped_and_observes_grace() {
        let handle = ProcessHandle::from_exit_future("fake", |token| async move {
            token.cancelled().await;
            Ok(Some(143))
        });

        let started = tokio::time::Instant::now();
        let exit = handle.stop().await;

        assert_eq!(exit, Some(InstanceExit::Stopped));
        assert!(started.elapsed() >= STOP_GRACE);
    }

    #[tokio::test(start_paused = true)]
    async fn self_exit_with_error_is_a_crash() {
        let handle = ProcessHandle::from_exit_future("fake", |_token| async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(Some(3))
        });
        assert_eq!(handle.wait().await, InstanceExit::Crashed(Some(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_instance_is_detached_after_timeout() {
        let handle = ProcessHandle::from_exit_future("stuck", |_token| async move {
            std::future::pending::<()>().await;
            Ok(None)
        });
        assert_eq!(handle.stop().await, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn real_process_crash_and_stop_are_told_apart() {
        let crashing = ProcessHandle::start(&CommandSpec::new("sh").args(["-c", "exit 7"])).unwrap();
        assert_eq!(crashing.wait().await, InstanceExit::Crashed(Some(7)));

        let sleeper = ProcessHandle::start(&CommandSpec::new("sleep").arg("30")).unwrap();
        assert!(sleeper.pid().is_some());
        assert_eq!(sleeper.stop().await, Some(InstanceExit::Stopped));
    }
}

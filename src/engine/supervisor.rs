// src/engine/supervisor.rs

//! Build-run supervisor.
//!
//! All shared state (phase, pending debounce timer, running instance) lives
//! in one `SupervisorState` behind one mutex. The mutex is only held while a
//! transition is decided, never across a build or a stop, so the event loop
//! and the debounce timers are never stuck behind a slow compiler.
//!
//! A rebuild sequence claims the supervisor by moving it to
//! [`Phase::Stopping`]; any other trigger that arrives before the sequence
//! settles in `Running` or `Idle` is dropped. Shutdown waits for an
//! in-flight sequence to settle before it returns.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::WatchConfig;
use crate::engine::debounce::PendingRebuild;
use crate::engine::{Phase, RebuildOutcome, TriggerCause};
use crate::exec::{BuildOutcome, ProcessHandle, Toolchain, STOP_GRACE, VACATE_TIMEOUT};

/// The currently running instance of the artifact.
///
/// Its cancellation token is the one inside `handle`.
#[derive(Debug)]
pub struct RunningInstance {
    pub handle: ProcessHandle,
    /// Counts successful launches; the first instance is 1.
    pub generation: u64,
}

#[derive(Debug)]
pub(crate) struct SupervisorState {
    pub(crate) phase: Phase,
    pub(crate) pending: Option<PendingRebuild>,
    pub(crate) instance: Option<RunningInstance>,
    pub(crate) next_timer_id: u64,
    pub(crate) launches: u64,
    pub(crate) shutting_down: bool,
}

/// Point-in-time view of the supervisor, for logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorSnapshot {
    pub phase: Phase,
    pub timer_pending: bool,
    /// An instance exists and has not exited yet.
    pub instance_alive: bool,
    pub launches: u64,
    pub shutting_down: bool,
}

struct Shared<T: Toolchain> {
    config: WatchConfig,
    toolchain: T,
    state: Mutex<SupervisorState>,
    /// Fires once at shutdown; in-flight builds listen on child tokens.
    shutdown: CancellationToken,
    /// Woken whenever the phase leaves `Stopping`/`Building`.
    settled: Notify,
}

/// Owns the build/run lifecycle. Cheap to clone; clones share state.
pub struct Supervisor<T: Toolchain> {
    shared: Arc<Shared<T>>,
}

impl<T: Toolchain> Clone for Supervisor<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Toolchain> std::fmt::Debug for Supervisor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl<T: Toolchain> Supervisor<T> {
    pub fn new(config: WatchConfig, toolchain: T) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                toolchain,
                state: Mutex::new(SupervisorState {
                    phase: Phase::Idle,
                    pending: None,
                    instance: None,
                    next_timer_id: 0,
                    launches: 0,
                    shutting_down: false,
                }),
                shutdown: CancellationToken::new(),
                settled: Notify::new(),
            }),
        }
    }

    pub fn config(&self) -> &WatchConfig {
        &self.shared.config
    }

    pub fn toolchain(&self) -> &T {
        &self.shared.toolchain
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    pub fn snapshot(&self) -> SupervisorSnapshot {
        let st = self.lock();
        SupervisorSnapshot {
            phase: st.phase,
            timer_pending: st.pending.is_some(),
            instance_alive: st
                .instance
                .as_ref()
                .is_some_and(|i| !i.handle.is_finished()),
            launches: st.launches,
            shutting_down: st.shutting_down,
        }
    }

    /// Run `f` while holding the coordination lock.
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut SupervisorState) -> R) -> R {
        let mut st = self.lock();
        f(&mut st)
    }

    fn lock(&self) -> MutexGuard<'_, SupervisorState> {
        // A panic while holding the lock cannot leave the state half-updated
        // in a way later transitions can't cope with; keep going.
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, st: &mut SupervisorState, phase: Phase) {
        st.phase = phase;
        if !phase.is_busy() {
            self.shared.settled.notify_waiters();
        }
    }

    fn settle(&self, phase: Phase) {
        let mut st = self.lock();
        self.set_phase(&mut st, phase);
    }

    /// Resolve once no rebuild sequence is in flight.
    async fn wait_until_settled(&self) {
        loop {
            let notified = self.shared.settled.notified();
            tokio::pin!(notified);
            // Register before checking so a transition in between is not missed.
            notified.as_mut().enable();
            if !self.phase().is_busy() {
                return;
            }
            notified.await;
        }
    }

    /// Initial, unconditional build-and-run cycle.
    pub async fn start(&self) -> RebuildOutcome {
        info!(
            entry = %self.shared.config.main_file(),
            artifact = ?self.shared.config.build_path(),
            "initial build"
        );
        self.rebuild(TriggerCause::Startup).await
    }

    /// Stop the current instance (if any), build, and start a new instance
    /// if the build succeeded.
    ///
    /// Returns [`RebuildOutcome::Skipped`] without touching anything when
    /// another sequence is already in flight.
    pub async fn rebuild(&self, cause: TriggerCause) -> RebuildOutcome {
        let previous = {
            let mut st = self.lock();
            if st.shutting_down {
                return RebuildOutcome::ShuttingDown;
            }
            if st.phase.is_busy() {
                debug!(%cause, phase = ?st.phase, "rebuild already in flight; ignoring trigger");
                return RebuildOutcome::Skipped;
            }
            st.phase = Phase::Stopping;
            st.instance.take()
        };

        if let Some(instance) = previous {
            info!(
                app = %instance.handle.label(),
                generation = instance.generation,
                "stopping application"
            );
            instance.handle.stop().await;
        }

        {
            let mut st = self.lock();
            if st.shutting_down {
                self.set_phase(&mut st, Phase::Idle);
                return RebuildOutcome::ShuttingDown;
            }
            st.phase = Phase::Building;
        }

        info!(%cause, "building...");
        let started = Instant::now();
        let result = self
            .shared
            .toolchain
            .build(&self.shared.config, self.shared.shutdown.child_token())
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(BuildOutcome::Succeeded) => {
                info!(elapsed_ms, "build completed");
            }
            Ok(BuildOutcome::Failed(code)) => {
                error!(exit_code = ?code, elapsed_ms, "build failed; waiting for the next change");
                self.settle(Phase::Idle);
                return RebuildOutcome::BuildFailed;
            }
            Ok(BuildOutcome::Cancelled) => {
                self.settle(Phase::Idle);
                return RebuildOutcome::ShuttingDown;
            }
            Err(err) => {
                error!(error = %err, "could not run build; waiting for the next change");
                self.settle(Phase::Idle);
                return RebuildOutcome::BuildFailed;
            }
        }

        // Launch under the lock so shutdown either sees the new instance or
        // prevents it from starting.
        let mut st = self.lock();
        if st.shutting_down {
            self.set_phase(&mut st, Phase::Idle);
            return RebuildOutcome::ShuttingDown;
        }

        info!("starting application");
        match self.shared.toolchain.launch(&self.shared.config) {
            Ok(handle) => {
                st.launches += 1;
                st.instance = Some(RunningInstance {
                    handle,
                    generation: st.launches,
                });
                self.set_phase(&mut st, Phase::Running);
                RebuildOutcome::Started
            }
            Err(err) => {
                error!(error = %err, "could not start application");
                self.set_phase(&mut st, Phase::Idle);
                RebuildOutcome::LaunchFailed
            }
        }
    }

    /// Cancel the pending rebuild timer, cancel any in-flight build, and
    /// stop the running instance. Idempotent.
    ///
    /// Returns once an in-flight rebuild sequence has settled too, so no
    /// build or instance outlives the call. Closing the change source is
    /// left to the owner of the subscription, after this returns.
    pub async fn shutdown(&self) {
        let claimed = {
            let mut st = self.lock();
            if st.shutting_down {
                None
            } else {
                st.shutting_down = true;
                Some((st.pending.take(), st.instance.take()))
            }
        };
        let Some((pending, instance)) = claimed else {
            self.wait_for_in_flight().await;
            return;
        };

        if let Some(pending) = pending {
            debug!(timer = pending.id(), "cancelling pending rebuild");
            pending.cancel();
        }

        self.shared.shutdown.cancel();

        if let Some(instance) = instance {
            info!(app = %instance.handle.label(), "stopping application");
            instance.handle.stop().await;
        }

        self.wait_for_in_flight().await;

        let mut st = self.lock();
        if st.phase == Phase::Running {
            self.set_phase(&mut st, Phase::Idle);
        }
    }

    async fn wait_for_in_flight(&self) {
        // A sequence stopping an instance may need the full vacate timeout.
        let limit = VACATE_TIMEOUT + STOP_GRACE * 2;
        if tokio::time::timeout(limit, self.wait_until_settled())
            .await
            .is_err()
        {
            warn!(
                phase = ?self.phase(),
                timeout_ms = limit.as_millis() as u64,
                "rebuild still in flight after shutdown"
            );
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.lock().shutting_down
    }
}

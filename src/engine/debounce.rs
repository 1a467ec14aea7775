// src/engine/debounce.rs

//! Trailing-edge debounce of change events.
//!
//! Every accepted event replaces the pending timer: the previous one is
//! aborted and a fresh one is armed for the full quiet period. Only when a
//! timer survives its whole period does it request a rebuild, carrying the
//! last event that armed it.
//!
//! The timer slot lives in the supervisor's state so arming, cancelling and
//! shutdown are all decided under the same lock. Each armed timer gets an
//! id; a timer whose sleep finished just as a newer event replaced it finds
//! a different id in the slot and does nothing.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::engine::supervisor::Supervisor;
use crate::engine::TriggerCause;
use crate::exec::Toolchain;
use crate::types::ChangeEvent;

/// The one armed debounce timer.
#[derive(Debug)]
pub struct PendingRebuild {
    id: u64,
    deadline: Instant,
    timer: JoinHandle<()>,
}

impl PendingRebuild {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Abort the timer task. A no-op if it already fired.
    pub fn cancel(self) {
        self.timer.abort();
    }
}

/// Collapses bursts of change events into single rebuild requests.
#[derive(Debug)]
pub struct Debouncer<T: Toolchain> {
    supervisor: Supervisor<T>,
    quiet: Duration,
}

impl<T: Toolchain> Debouncer<T> {
    /// Debounce with the supervisor's configured quiet period.
    pub fn new(supervisor: Supervisor<T>) -> Self {
        let quiet = supervisor.config().debounce();
        Self::with_quiet_period(supervisor, quiet)
    }

    pub fn with_quiet_period(supervisor: Supervisor<T>, quiet: Duration) -> Self {
        Self { supervisor, quiet }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Accept one change event: (re)arm the timer for a full quiet period.
    ///
    /// Returns `false` if the event was dropped because shutdown started.
    /// Must be called from inside a tokio runtime.
    pub fn on_event(&self, event: ChangeEvent) -> bool {
        let quiet = self.quiet;
        let supervisor = self.supervisor.clone();

        self.supervisor.with_state(move |st| {
            if st.shutting_down {
                trace!(path = ?event.path, "shutting down; change ignored");
                return false;
            }

            if let Some(previous) = st.pending.take() {
                trace!(timer = previous.id(), "re-arming debounce timer");
                previous.cancel();
            }

            st.next_timer_id += 1;
            let id = st.next_timer_id;
            let deadline = Instant::now() + quiet;

            let timer = tokio::spawn(async move {
                tokio::time::sleep_until(deadline).await;
                fire(supervisor, id, event).await;
            });

            st.pending = Some(PendingRebuild {
                id,
                deadline,
                timer,
            });
            true
        })
    }

    /// Drop the armed timer, if any, without rebuilding.
    pub fn cancel_pending(&self) -> bool {
        let pending = self.supervisor.with_state(|st| st.pending.take());
        match pending {
            Some(p) => {
                debug!(timer = p.id(), "pending rebuild cancelled");
                p.cancel();
                true
            }
            None => false,
        }
    }
}

async fn fire<T: Toolchain>(supervisor: Supervisor<T>, id: u64, event: ChangeEvent) {
    let claimed = supervisor.with_state(|st| {
        if st.pending.as_ref().is_some_and(|p| p.id() == id) {
            // Dropping our own JoinHandle detaches this task; it keeps running.
            st.pending = None;
            true
        } else {
            false
        }
    });
    if !claimed {
        trace!(timer = id, "superseded timer fired; ignoring");
        return;
    }

    info!(file = %event.file_name(), kind = %event.kind, "file changed");
    let outcome = supervisor.rebuild(TriggerCause::Change(event)).await;
    debug!(timer = id, ?outcome, "rebuild request finished");
}

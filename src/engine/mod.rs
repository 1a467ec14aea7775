// src/engine/mod.rs

//! The watch → debounce → rebuild → restart control loop.
//!
//! - [`supervisor`] owns the build/run state machine and the single
//!   coordination lock guarding the pending timer and the running instance.
//! - [`debounce`] turns bursts of change events into one rebuild trigger,
//!   using the supervisor's lock for its timer slot.
//! - [`runtime`] is the async shell: initial build, event loop, shutdown.

use std::fmt;

use crate::types::ChangeEvent;

pub mod debounce;
pub mod runtime;
pub mod supervisor;

pub use debounce::{Debouncer, PendingRebuild};
pub use runtime::Runtime;
pub use supervisor::{RunningInstance, Supervisor, SupervisorSnapshot};

/// Where the supervisor is in its build/run cycle.
///
/// `Stopping` and `Building` mean a rebuild sequence is in flight; no other
/// sequence may start until it returns to `Idle` or `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No instance and nothing in flight (initially, and after a failed build).
    Idle,
    /// Tearing down the previous instance.
    Stopping,
    /// Build command running.
    Building,
    /// An instance was started by the last successful build.
    Running,
}

impl Phase {
    pub fn is_busy(self) -> bool {
        matches!(self, Phase::Stopping | Phase::Building)
    }
}

/// Why a rebuild was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerCause {
    /// Unconditional first cycle when the supervisor starts.
    Startup,
    /// A debounced file change; carries the event that fired the timer.
    Change(ChangeEvent),
}

impl fmt::Display for TriggerCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerCause::Startup => f.write_str("startup"),
            TriggerCause::Change(ev) => write!(f, "{} {}", ev.kind, ev.file_name()),
        }
    }
}

/// What a single rebuild request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// Built and started a new instance.
    Started,
    /// The build step failed; no instance is running.
    BuildFailed,
    /// Built, but the artifact could not be started.
    LaunchFailed,
    /// Another rebuild sequence was in flight; this trigger was dropped.
    Skipped,
    /// Shutdown began before or during the sequence.
    ShuttingDown,
}

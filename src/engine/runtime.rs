// src/engine/runtime.rs

use std::future::Future;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::debounce::Debouncer;
use crate::engine::supervisor::Supervisor;
use crate::errors::Result;
use crate::exec::Toolchain;
use crate::types::ChangeEvent;
use crate::watch::ChangeSource;

/// Async shell around the supervisor.
///
/// Runs the initial build, feeds change events into the debouncer until the
/// shutdown signal resolves (or the event stream ends), then tears down in
/// order: pending timer and running instance first, change source last.
pub struct Runtime<T: Toolchain> {
    supervisor: Supervisor<T>,
    debouncer: Debouncer<T>,
    events: mpsc::Receiver<ChangeEvent>,
    source: Option<ChangeSource>,
}

impl<T: Toolchain> Runtime<T> {
    pub fn new(supervisor: Supervisor<T>, events: mpsc::Receiver<ChangeEvent>) -> Self {
        let debouncer = Debouncer::new(supervisor.clone());
        Self {
            supervisor,
            debouncer,
            events,
            source: None,
        }
    }

    /// Attach the change source feeding `events`; it is closed after the
    /// supervisor has shut down.
    pub fn with_source(mut self, source: ChangeSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn supervisor(&self) -> &Supervisor<T> {
        &self.supervisor
    }

    pub async fn run<S>(self, shutdown_signal: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        let Runtime {
            supervisor,
            debouncer,
            mut events,
            source,
        } = self;

        info!(
            debounce_ms = debouncer.quiet_period().as_millis() as u64,
            "thunder runtime started"
        );

        let initial = supervisor.clone();
        let mut watch_task = tokio::spawn(async move {
            let outcome = initial.start().await;
            debug!(?outcome, "initial cycle finished");

            while let Some(event) = events.recv().await {
                debug!(path = ?event.path, kind = %event.kind, "change event");
                debouncer.on_event(event);
            }
            debug!("change event stream closed");
        });

        let loop_finished = tokio::select! {
            () = shutdown_signal => {
                info!("shutdown requested");
                false
            }
            res = &mut watch_task => {
                match res {
                    Ok(()) => warn!("change source stopped; shutting down"),
                    Err(err) => warn!(error = %err, "watch loop failed; shutting down"),
                }
                true
            }
        };

        supervisor.shutdown().await;

        if let Some(source) = source {
            source.close();
        }

        // Timers are already cancelled and shutdown is flagged, so whatever
        // the loop would still do is a no-op.
        if !loop_finished {
            watch_task.abort();
            let _ = watch_task.await;
        }

        info!("thunder runtime exiting");
        Ok(())
    }
}

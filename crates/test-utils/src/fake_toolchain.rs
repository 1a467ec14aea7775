use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use thunder::config::WatchConfig;
use thunder::errors::Result;
use thunder::exec::{BuildOutcome, ProcessHandle, Toolchain};

/// Something the fake toolchain observed, with the (tokio) time it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolchainEvent {
    BuildStarted { at: Instant },
    BuildFinished { at: Instant, outcome: BuildOutcome },
    Launched { at: Instant, instance: u64 },
    /// The instance exited because it was cancelled.
    Stopped { at: Instant, instance: u64 },
    /// The instance exited on its own with `code`.
    Crashed { at: Instant, instance: u64, code: i32 },
}

#[derive(Debug, Default)]
struct Inner {
    log: Mutex<Vec<ToolchainEvent>>,
    scripted: Mutex<VecDeque<BuildOutcome>>,
    build_time: Mutex<Duration>,
    stop_time: Mutex<Duration>,
    crash_after: Mutex<Option<(Duration, i32)>>,
    next_instance: AtomicU64,
    live: AtomicUsize,
    max_live: AtomicUsize,
}

/// A fake toolchain that:
/// - records builds, launches, stops and crashes with timestamps
/// - builds in a configurable (virtual) time and succeeds unless scripted
///   otherwise
/// - launches instances that run until cancelled, or crash after a delay
///
/// Clones share state, so a test can keep one and hand another to the
/// supervisor.
#[derive(Debug, Clone, Default)]
pub struct FakeToolchain {
    inner: Arc<Inner>,
}

impl FakeToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_build_time(self, d: Duration) -> Self {
        *self.inner.build_time.lock().unwrap() = d;
        self
    }

    /// How long an instance takes to exit once cancelled.
    pub fn with_stop_time(self, d: Duration) -> Self {
        *self.inner.stop_time.lock().unwrap() = d;
        self
    }

    /// Every instance launched from now on exits with `code` after `after`.
    pub fn crash_instances_after(&self, after: Duration, code: i32) {
        *self.inner.crash_after.lock().unwrap() = Some((after, code));
    }

    /// The next build (not already scripted) fails with `code`.
    pub fn fail_next_build(&self, code: i32) {
        self.inner
            .scripted
            .lock()
            .unwrap()
            .push_back(BuildOutcome::Failed(Some(code)));
    }

    pub fn events(&self) -> Vec<ToolchainEvent> {
        self.inner.log.lock().unwrap().clone()
    }

    /// Start times of every build, in order.
    pub fn build_starts(&self) -> Vec<Instant> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ToolchainEvent::BuildStarted { at } => Some(at),
                _ => None,
            })
            .collect()
    }

    pub fn launches(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ToolchainEvent::Launched { .. }))
            .count()
    }

    pub fn stops(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ToolchainEvent::Stopped { .. }))
            .count()
    }

    pub fn live_instances(&self) -> usize {
        self.inner.live.load(Ordering::SeqCst)
    }

    /// Highest number of instances that were alive at the same time.
    pub fn max_concurrent_instances(&self) -> usize {
        self.inner.max_live.load(Ordering::SeqCst)
    }

    fn record(&self, event: ToolchainEvent) {
        self.inner.log.lock().unwrap().push(event);
    }
}

impl Toolchain for FakeToolchain {
    fn build<'a>(
        &'a self,
        _config: &'a WatchConfig,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<BuildOutcome>> + Send + 'a>> {
        Box::pin(async move {
            self.record(ToolchainEvent::BuildStarted { at: Instant::now() });
            let build_time = *self.inner.build_time.lock().unwrap();

            let outcome = tokio::select! {
                () = tokio::time::sleep(build_time) => {
                    self.inner
                        .scripted
                        .lock()
                        .unwrap()
                        .pop_front()
                        .unwrap_or(BuildOutcome::Succeeded)
                }
                () = cancel.cancelled() => BuildOutcome::Cancelled,
            };

            self.record(ToolchainEvent::BuildFinished {
                at: Instant::now(),
                outcome,
            });
            Ok(outcome)
        })
    }

    fn launch(&self, _config: &WatchConfig) -> Result<ProcessHandle> {
        let instance = self.inner.next_instance.fetch_add(1, Ordering::SeqCst) + 1;
        let live = self.inner.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_live.fetch_max(live, Ordering::SeqCst);
        self.record(ToolchainEvent::Launched {
            at: Instant::now(),
            instance,
        });

        let crash_after = *self.inner.crash_after.lock().unwrap();
        let stop_time = *self.inner.stop_time.lock().unwrap();
        let me = self.clone();

        Ok(ProcessHandle::from_exit_future(
            format!("fake-app-{instance}"),
            move |token| async move {
                let crashed = match crash_after {
                    Some((after, code)) => tokio::select! {
                        () = tokio::time::sleep(after) => Some(code),
                        () = token.cancelled() => None,
                    },
                    None => {
                        token.cancelled().await;
                        None
                    }
                };

                if crashed.is_none() {
                    tokio::time::sleep(stop_time).await;
                }
                me.inner.live.fetch_sub(1, Ordering::SeqCst);

                let at = Instant::now();
                match crashed {
                    Some(code) => me.record(ToolchainEvent::Crashed { at, instance, code }),
                    None => me.record(ToolchainEvent::Stopped { at, instance }),
                }
                Ok(crashed)
            },
        ))
    }
}

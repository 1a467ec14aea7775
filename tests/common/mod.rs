#![allow(dead_code)]

use std::time::Duration;

pub use thunder_test_utils::{init_tracing, with_timeout};
use thunder_test_utils::{FakeToolchain, WatchConfigBuilder};

use thunder::engine::{Debouncer, Supervisor};
use thunder::types::{ChangeEvent, ChangeKind};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub const QUIET: Duration = Duration::from_millis(100);

pub fn write_event(name: &str) -> ChangeEvent {
    ChangeEvent::new(format!("./{name}"), ChangeKind::Write)
}

/// Supervisor over `toolchain` with the default config and a 100ms quiet
/// period, plus a debouncer feeding it.
pub fn supervised(toolchain: FakeToolchain) -> (Supervisor<FakeToolchain>, Debouncer<FakeToolchain>) {
    let cfg = WatchConfigBuilder::new()
        .debounce_ms(QUIET.as_millis() as u64)
        .build();
    let supervisor = Supervisor::new(cfg, toolchain);
    let debouncer = Debouncer::new(supervisor.clone());
    (supervisor, debouncer)
}

// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`process`] wraps one running child: start with inherited terminal
//!   streams, cooperative stop, exit classification (stopped vs crashed).
//! - [`toolchain`] provides the [`Toolchain`] trait the supervisor uses for
//!   the build and run steps, and the production [`SystemToolchain`].

pub mod process;
pub mod toolchain;

pub use process::{
    classify_exit, ensure_parent_dir, CommandSpec, InstanceExit, ProcessHandle, STOP_GRACE,
    VACATE_TIMEOUT,
};
pub use toolchain::{build_command, run_command, BuildOutcome, SystemToolchain, Toolchain};

// src/project/mod.rs

//! Project scaffolding for `thunder init`.

pub mod detect;
pub mod init;

pub use detect::{detect_entry_point, is_entry_point, EntryPointMatcher};
pub use init::{init_project, InitOutcome};

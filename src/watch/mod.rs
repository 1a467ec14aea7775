// src/watch/mod.rs

//! File watching: the change source feeding the debouncer.
//!
//! This module is responsible for:
//! - Walking the watch roots and skipping excluded subtrees (`walk`, `exclude`).
//! - Wiring up a cross-platform filesystem watcher (`notify`) in `source`.
//! - Dropping events that should never cause a rebuild (`filter`).
//!
//! It knows nothing about builds or processes; it only produces
//! [`ChangeEvent`](crate::types::ChangeEvent)s.

pub mod exclude;
pub mod filter;
pub mod source;
pub mod walk;

pub use exclude::ExcludeSet;
pub use filter::ChangeFilter;
pub use source::ChangeSource;
pub use walk::{collect_all_watch_dirs, collect_watch_dirs, WalkOutcome};

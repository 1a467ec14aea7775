// src/watch/walk.rs

//! Recursive discovery of the directories to register with the watcher.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::fs::FileSystem;
use crate::watch::exclude::ExcludeSet;

/// Result of walking the configured watch roots.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    /// Directories to register, in walk order (parents before children).
    pub dirs: Vec<PathBuf>,
    /// Directories that could not be read. Their subtrees are missing from
    /// `dirs`; everything else is still watched.
    pub failures: Vec<(PathBuf, anyhow::Error)>,
}

/// Collect every directory under `root` (including `root` itself) whose base
/// name is not excluded. An excluded directory drops its whole subtree.
///
/// Unreadable directories are recorded in `failures` and logged, never
/// fatal. Symlinked subdirectories are not followed; `root` itself may be a
/// link.
pub fn collect_watch_dirs(fs: &dyn FileSystem, root: &Path, exclude: &ExcludeSet) -> WalkOutcome {
    let mut outcome = WalkOutcome::default();

    if exclude.is_excluded_dir(root) {
        return outcome;
    }
    if !fs.is_dir(root) {
        warn!(dir = ?root, "watch root is not a directory; skipping");
        outcome
            .failures
            .push((root.to_path_buf(), anyhow::anyhow!("not a directory: {:?}", root)));
        return outcome;
    }

    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let children = match fs.read_dir(&dir) {
            Ok(children) => children,
            Err(err) => {
                warn!(dir = ?dir, error = %err, "could not read directory; not watching it");
                outcome.failures.push((dir, err));
                continue;
            }
        };
        outcome.dirs.push(dir);

        // Reverse so the stack pops children in sorted order.
        for child in children.into_iter().rev() {
            if !fs.is_dir(&child) || exclude.is_excluded_dir(&child) {
                continue;
            }
            if fs.is_symlink(&child) {
                debug!(dir = ?child, "not following symlinked directory");
                continue;
            }
            stack.push(child);
        }
    }

    outcome
}

/// Walk several roots, concatenating their outcomes.
pub fn collect_all_watch_dirs(
    fs: &dyn FileSystem,
    roots: &[PathBuf],
    exclude: &ExcludeSet,
) -> WalkOutcome {
    let mut all = WalkOutcome::default();
    for root in roots {
        let WalkOutcome { dirs, failures } = collect_watch_dirs(fs, root, exclude);
        for dir in dirs {
            if !all.dirs.contains(&dir) {
                all.dirs.push(dir);
            }
        }
        all.failures.extend(failures);
    }
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn excludes(names: &[&str]) -> ExcludeSet {
        let owned: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        ExcludeSet::new(&owned).unwrap()
    }

    fn project() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("./main.go", "package main");
        fs.add_file("./internal/api/handler.go", "package api");
        fs.add_file("./internal/db/db.go", "package db");
        fs.add_file("./vendor/github.com/lib/pq/conn.go", "package pq");
        fs.add_file("./tmp/main", "binary");
        fs.add_file("./web/node_modules/react/index.js", "x");
        fs
    }

    #[test]
    fn excluded_subtrees_are_skipped_at_any_depth() {
        let fs = project();
        let out = collect_watch_dirs(&fs, Path::new("."), &excludes(&["vendor", "tmp", "node_modules"]));

        let dirs: Vec<String> = out
            .dirs
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            dirs,
            vec![".", "./internal", "./internal/api", "./internal/db", "./web"]
        );
        assert!(out.failures.is_empty());
    }

    #[test]
    fn unreadable_directory_is_reported_but_not_fatal() {
        let fs = project();
        fs.deny_read("./internal/db");

        let out = collect_watch_dirs(&fs, Path::new("."), &excludes(&["vendor"]));

        assert!(out.dirs.contains(&PathBuf::from("./internal/api")));
        assert!(!out.dirs.contains(&PathBuf::from("./internal/db")));
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].0, PathBuf::from("./internal/db"));
    }

    #[test]
    fn missing_root_yields_no_dirs() {
        let fs = project();
        let out = collect_watch_dirs(&fs, Path::new("./does-not-exist"), &excludes(&[]));
        assert!(out.dirs.is_empty());
        assert_eq!(out.failures.len(), 1);
    }

    #[test]
    fn symlinked_directories_are_not_followed() {
        let fs = project();
        fs.add_symlink("./internal/loop", ".");
        fs.add_symlink("./api", "./internal/api");

        let out = collect_watch_dirs(&fs, Path::new("."), &excludes(&["vendor", "tmp", "web"]));

        let dirs: Vec<String> = out
            .dirs
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        assert_eq!(dirs, vec![".", "./internal", "./internal/api", "./internal/db"]);
        assert!(out.failures.is_empty());
    }

    #[test]
    fn symlinked_root_is_still_walked() {
        let fs = project();
        fs.add_symlink("./src", "./internal");

        let out = collect_watch_dirs(&fs, Path::new("./src"), &excludes(&[]));

        assert_eq!(
            out.dirs,
            vec![
                PathBuf::from("./src"),
                PathBuf::from("./src/api"),
                PathBuf::from("./src/db")
            ]
        );
    }

    #[test]
    fn overlapping_roots_are_deduplicated() {
        let fs = project();
        let roots = vec![PathBuf::from("."), PathBuf::from("./internal")];
        let out = collect_all_watch_dirs(&fs, &roots, &excludes(&["vendor", "tmp", "web"]));
        let api_count = out
            .dirs
            .iter()
            .filter(|d| d.as_path() == Path::new("./internal/api"))
            .count();
        assert_eq!(api_count, 1);
    }
}

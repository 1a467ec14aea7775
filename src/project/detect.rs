// src/project/detect.rs

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, warn};

use crate::fs::FileSystem;

/// Directories never searched for an entry point.
const SKIP_DIRS: &[&str] = &["vendor", "tmp", ".git", "node_modules"];

/// Recognises a source file that declares the main package and a `main()`
/// function.
#[derive(Debug, Clone)]
pub struct EntryPointMatcher {
    package: Regex,
    func: Regex,
}

impl EntryPointMatcher {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            package: Regex::new(r"(?m)^\s*package\s+main\b")?,
            func: Regex::new(r"(?m)^\s*func\s+main\s*\(\s*\)")?,
        })
    }

    pub fn is_match(&self, source: &str) -> bool {
        self.package.is_match(source) && self.func.is_match(source)
    }
}

/// One-off check with a freshly compiled matcher.
pub fn is_entry_point(source: &str) -> bool {
    EntryPointMatcher::new().is_ok_and(|m| m.is_match(source))
}

/// Find the program's entry point under `root`.
///
/// Walks depth-first in sorted order and returns the first file ending in
/// `suffix` that is an entry point, relative to `root`. Unreadable files and
/// directories are skipped, and symlinked directories are not followed.
pub fn detect_entry_point(fs: &dyn FileSystem, root: &Path, suffix: &str) -> Option<PathBuf> {
    let matcher = match EntryPointMatcher::new() {
        Ok(m) => m,
        Err(err) => {
            warn!(error = %err, "entry point patterns failed to compile; skipping detection");
            return None;
        }
    };
    let found = search(fs, &matcher, root, suffix)?;
    Some(
        found
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or(found),
    )
}

fn search(
    fs: &dyn FileSystem,
    matcher: &EntryPointMatcher,
    dir: &Path,
    suffix: &str,
) -> Option<PathBuf> {
    let entries = match fs.read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(dir = ?dir, error = %err, "skipping unreadable directory");
            return None;
        }
    };

    for path in entries {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if fs.is_dir(&path) {
            if SKIP_DIRS.contains(&name.as_str()) || fs.is_symlink(&path) {
                continue;
            }
            if let Some(found) = search(fs, matcher, &path, suffix) {
                return Some(found);
            }
            continue;
        }

        if !name.ends_with(suffix) {
            continue;
        }
        match fs.read_to_string(&path) {
            Ok(source) if matcher.is_match(&source) => return Some(path),
            Ok(_) => {}
            Err(err) => debug!(path = ?path, error = %err, "skipping unreadable file"),
        }
    }
    None
}

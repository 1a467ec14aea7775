// src/watch/exclude.rs

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Compiled `exclude_dirs` entries.
///
/// Each entry is matched against a directory's *base name* only, so
/// `node_modules` skips every `node_modules` directory at any depth, and a
/// glob such as `*.cache` skips `build.cache/` as well.
#[derive(Clone)]
pub struct ExcludeSet {
    patterns: Vec<String>,
    set: GlobSet,
}

impl fmt::Debug for ExcludeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExcludeSet")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl ExcludeSet {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pat in patterns {
            let glob = Glob::new(pat).with_context(|| format!("invalid pattern: {pat}"))?;
            builder.add(glob);
        }
        Ok(Self {
            patterns: patterns.to_vec(),
            set: builder.build()?,
        })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_excluded_name(&self, name: &str) -> bool {
        self.set.is_match(name)
    }

    /// True if the base name of `dir` is excluded. Paths without a normal
    /// base name (`.`, `..`, `/`) are never excluded.
    pub fn is_excluded_dir(&self, dir: &Path) -> bool {
        match dir.file_name() {
            Some(name) => self.is_excluded_name(&name.to_string_lossy()),
            None => false,
        }
    }
}

// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
enum MockEntry {
    File(Vec<u8>),
    Dir,
    Symlink(PathBuf),
}

const MAX_LINK_HOPS: usize = 40;

/// In-memory filesystem for tests.
///
/// Directories are implied by the files added under them. Paths are used
/// verbatim (no normalisation), so tests should stick to one spelling,
/// e.g. `./src/main.go`.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<BTreeMap<PathBuf, MockEntry>>>,
    unreadable: Arc<Mutex<HashSet<PathBuf>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let fs = Self::default();
        fs.add_dir(".");
        fs
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut entries = self.entries();
        ensure_parents(&mut entries, &path);
        entries.insert(path, MockEntry::File(content.into()));
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut entries = self.entries();
        ensure_parents(&mut entries, &path);
        entries.insert(path, MockEntry::Dir);
    }

    /// Add a symbolic link at `path` pointing at `target`, spelled as a full
    /// mock path (e.g. `.` or `./src`).
    pub fn add_symlink(&self, path: impl AsRef<Path>, target: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut entries = self.entries();
        ensure_parents(&mut entries, &path);
        entries.insert(path, MockEntry::Symlink(target.as_ref().to_path_buf()));
    }

    /// Make `read_dir` on this directory fail, as if permission were denied.
    pub fn deny_read(&self, path: impl AsRef<Path>) {
        self.unreadable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.as_ref().to_path_buf());
    }

    /// Contents of a file previously added or written, if any.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        match self.entries().get(path.as_ref()) {
            Some(MockEntry::File(bytes)) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<PathBuf, MockEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Follow links component by component, like the OS does. `None` when a
/// chain of links does not terminate.
fn resolve(entries: &BTreeMap<PathBuf, MockEntry>, path: &Path) -> Option<PathBuf> {
    let mut hops = 0;
    let mut resolved = PathBuf::new();
    for component in path.components() {
        resolved.push(component);
        while let Some(MockEntry::Symlink(target)) = entries.get(&resolved) {
            hops += 1;
            if hops > MAX_LINK_HOPS {
                return None;
            }
            resolved = target.clone();
        }
    }
    Some(resolved)
}

fn ensure_parents(entries: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
    let mut current = path.parent();
    while let Some(parent) = current {
        if parent.as_os_str().is_empty() {
            break;
        }
        entries
            .entry(parent.to_path_buf())
            .or_insert(MockEntry::Dir);
        current = parent.parent();
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let entries = self.entries();
        let target =
            resolve(&entries, path).ok_or_else(|| anyhow!("Too many links: {:?}", path))?;
        match entries.get(&target) {
            Some(MockEntry::File(content)) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            Some(MockEntry::Symlink(_)) | None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.add_dir(path);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let entries = self.entries();
        resolve(&entries, path).is_some_and(|target| entries.contains_key(&target))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let entries = self.entries();
        resolve(&entries, path)
            .is_some_and(|target| matches!(entries.get(&target), Some(MockEntry::Dir)))
    }

    fn is_symlink(&self, path: &Path) -> bool {
        matches!(self.entries().get(path), Some(MockEntry::Symlink(_)))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        if self
            .unreadable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(path)
        {
            return Err(anyhow!("Permission denied: {:?}", path));
        }

        let entries = self.entries();
        let target =
            resolve(&entries, path).ok_or_else(|| anyhow!("Too many links: {:?}", path))?;
        match entries.get(&target) {
            Some(MockEntry::Dir) => Ok(entries
                .keys()
                .filter(|p| p.parent() == Some(target.as_path()))
                .filter_map(|p| p.file_name().map(|name| path.join(name)))
                .collect()),
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}

// src/watch/source.rs

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::WatchConfig;
use crate::errors::{Result, ThunderError};
use crate::fs::FileSystem;
use crate::types::ChangeEvent;
use crate::watch::exclude::ExcludeSet;
use crate::watch::filter::{may_create_dir, ChangeFilter};
use crate::watch::walk::{collect_all_watch_dirs, collect_watch_dirs};

/// Live subscription to filesystem changes under the configured roots.
///
/// Every non-excluded directory is registered individually (non-recursive),
/// so excluded subtrees never produce events. Filtered [`ChangeEvent`]s are
/// pushed into the sender given to [`ChangeSource::open`].
///
/// Closing (or dropping) the source stops watching for good; the receiving
/// end then sees its channel close.
pub struct ChangeSource {
    watcher: Arc<Mutex<RecommendedWatcher>>,
    forwarder: Option<JoinHandle<()>>,
    registered: usize,
}

impl std::fmt::Debug for ChangeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeSource")
            .field("registered", &self.registered)
            .finish_non_exhaustive()
    }
}

impl ChangeSource {
    /// Register all watch directories and start forwarding events.
    ///
    /// Fails only when the OS watcher cannot be created or not a single
    /// directory could be registered. Individual directories that fail are
    /// logged and skipped.
    pub fn open(
        config: &WatchConfig,
        fs: Arc<dyn FileSystem>,
        tx: mpsc::Sender<ChangeEvent>,
    ) -> Result<Self> {
        // Channel from the blocking notify callback into the async world.
        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                // The receiver only goes away after close(); nothing left to notify.
                let _ = raw_tx.send(res);
            },
            Config::default(),
        )?;
        let watcher = Arc::new(Mutex::new(watcher));

        let outcome = collect_all_watch_dirs(fs.as_ref(), config.watch_dirs(), config.exclude());
        let registered = register_dirs(&watcher, &outcome.dirs);

        if registered == 0 {
            return Err(ThunderError::NoWatchableDirectories(
                config.watch_dirs().to_vec(),
            ));
        }

        info!(
            roots = ?config.watch_dirs(),
            dirs = registered,
            skipped = outcome.failures.len(),
            "watching for changes"
        );

        let filter = ChangeFilter::new(config.source_suffix());
        let exclude = config.exclude().clone();
        let task_watcher = Arc::clone(&watcher);

        let forwarder = tokio::spawn(async move {
            while let Some(res) = raw_rx.recv().await {
                let event = match res {
                    Ok(event) => event,
                    Err(err) => {
                        warn!(error = %err, "file watch error");
                        continue;
                    }
                };
                debug!(?event, "received notify event");

                if may_create_dir(&event.kind) {
                    for path in event.paths.iter() {
                        watch_new_dir(fs.as_ref(), &task_watcher, path, &exclude);
                    }
                }

                for change in filter.translate(&event) {
                    if tx.send(change).await.is_err() {
                        debug!("change receiver dropped; stopping forwarder");
                        return;
                    }
                }
            }
            debug!("change source event loop finished");
        });

        Ok(Self {
            watcher,
            forwarder: Some(forwarder),
            registered,
        })
    }

    /// Number of directories registered at startup.
    pub fn registered_dirs(&self) -> usize {
        self.registered
    }

    /// Stop watching permanently.
    pub fn close(self) {
        info!("closing change source");
        drop(self);
    }
}

impl Drop for ChangeSource {
    fn drop(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            // The forwarder holds the other watcher handle and the event
            // sender; both are released once it is aborted.
            forwarder.abort();
        }
    }
}

fn register_dirs(watcher: &Mutex<RecommendedWatcher>, dirs: &[PathBuf]) -> usize {
    let mut guard = watcher.lock().unwrap_or_else(PoisonError::into_inner);
    let mut registered = 0;
    for dir in dirs {
        match guard.watch(dir, RecursiveMode::NonRecursive) {
            Ok(()) => registered += 1,
            Err(err) => warn!(dir = ?dir, error = %err, "could not watch directory"),
        }
    }
    registered
}

/// Register a directory created after startup, together with anything
/// already inside it. New symlinks to directories are not followed.
fn watch_new_dir(
    fs: &dyn FileSystem,
    watcher: &Mutex<RecommendedWatcher>,
    path: &Path,
    exclude: &ExcludeSet,
) {
    if !fs.is_dir(path) || fs.is_symlink(path) {
        return;
    }
    let outcome = collect_watch_dirs(fs, path, exclude);
    let added = register_dirs(watcher, &outcome.dirs);
    if added > 0 {
        debug!(dir = ?path, added, "registered new directory");
    }
}

// tests/change_source_fs.rs

mod common;
use crate::common::{init_tracing, TestResult};

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use thunder::fs::{FileSystem, RealFileSystem};
use thunder::types::ChangeEvent;
use thunder::watch::ChangeSource;
use thunder_test_utils::WatchConfigBuilder;

/// Wait for the first event whose path ends with `suffix`, skipping others.
async fn expect_event(rx: &mut mpsc::Receiver<ChangeEvent>, suffix: &str) -> Option<ChangeEvent> {
    timeout(Duration::from_secs(5), async {
        while let Some(ev) = rx.recv().await {
            if ev.path.ends_with(suffix) {
                return Some(ev);
            }
        }
        None
    })
    .await
    .ok()
    .flatten()
}

fn open(root: &Path) -> Result<(ChangeSource, mpsc::Receiver<ChangeEvent>), Box<dyn std::error::Error>> {
    let cfg = WatchConfigBuilder::new()
        .watch_dirs(&[root.to_str().ok_or("non-utf8 temp path")?])
        .build();
    let (tx, rx) = mpsc::channel(64);
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let source = ChangeSource::open(&cfg, fs, tx)?;
    Ok((source, rx))
}

#[tokio::test]
async fn source_file_writes_are_reported_and_other_files_are_not() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    fs::create_dir(dir.path().join("tmp"))?;
    let (source, mut rx) = open(dir.path())?;
    assert_eq!(source.registered_dirs(), 1);

    fs::write(dir.path().join("notes.txt"), "ignored")?;
    fs::write(dir.path().join("tmp").join("gen.go"), "package main")?;
    fs::write(dir.path().join("main.go"), "package main")?;

    let ev = expect_event(&mut rx, "main.go").await.ok_or("no event for main.go")?;
    assert_eq!(ev.file_name(), "main.go");

    // Drain whatever else arrived; nothing may come from the excluded
    // directory or from non-source files.
    tokio::time::sleep(Duration::from_millis(200)).await;
    while let Ok(ev) = rx.try_recv() {
        assert!(ev.path.extension().is_some_and(|e| e == "go"));
        assert!(!ev.path.ends_with("tmp/gen.go"));
    }

    source.close();
    Ok(())
}

#[tokio::test]
async fn directories_created_later_are_watched() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let (source, mut rx) = open(dir.path())?;

    let pkg = dir.path().join("handlers");
    fs::create_dir(&pkg)?;
    // Give the forwarder a moment to register the new directory.
    tokio::time::sleep(Duration::from_millis(300)).await;
    fs::write(pkg.join("users.go"), "package handlers")?;

    let ev = expect_event(&mut rx, "handlers/users.go")
        .await
        .ok_or("no event for users.go")?;
    assert_eq!(ev.file_name(), "users.go");

    source.close();
    Ok(())
}

#[tokio::test]
async fn directories_moved_in_later_are_watched() -> TestResult {
    init_tracing();
    let outer = tempfile::tempdir()?;
    let root = outer.path().join("project");
    let staging = outer.path().join("staging");
    fs::create_dir(&root)?;
    fs::create_dir(&staging)?;
    let (source, mut rx) = open(&root)?;

    fs::rename(&staging, root.join("models"))?;
    tokio::time::sleep(Duration::from_millis(300)).await;
    fs::write(root.join("models").join("user.go"), "package models")?;

    let ev = expect_event(&mut rx, "models/user.go")
        .await
        .ok_or("no event for user.go")?;
    assert_eq!(ev.file_name(), "user.go");

    source.close();
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn symlink_cycles_are_not_followed() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    fs::create_dir(dir.path().join("pkg"))?;
    std::os::unix::fs::symlink(dir.path(), dir.path().join("a"))?;
    std::os::unix::fs::symlink(dir.path(), dir.path().join("pkg").join("b"))?;

    let opened = tokio::task::spawn_blocking({
        let root = dir.path().to_path_buf();
        move || open(&root).map_err(|e| e.to_string())
    });
    let (source, _rx) = timeout(Duration::from_secs(5), opened)
        .await
        .map_err(|_| "walk did not terminate")???;

    assert_eq!(source.registered_dirs(), 2);
    source.close();
    Ok(())
}

#[tokio::test]
async fn closing_the_source_ends_the_stream() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let (source, mut rx) = open(dir.path())?;

    source.close();
    let end = timeout(Duration::from_secs(5), async {
        while rx.recv().await.is_some() {}
    })
    .await;
    assert!(end.is_ok(), "event stream stayed open after close");
    Ok(())
}

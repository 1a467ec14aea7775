// tests/config_loading.rs

mod common;
use crate::common::{init_tracing, TestResult};

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use thunder::config::{load_and_validate, load_or_default, ConfigOrigin};
use thunder::errors::ThunderError;
use thunder::run_supervisor;
use thunder_test_utils::WatchConfigBuilder;

#[test]
fn partial_file_keeps_defaults_for_missing_keys() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("thunder.toml");
    fs::write(
        &path,
        r#"
main_file = "cmd/server/main.go"
run_args = ["--port", "8080"]
debounce = 250
exclude_dirs = ["tmp", "*.cache"]
"#,
    )?;

    let (cfg, origin) = load_or_default(&path)?;
    assert_eq!(origin, ConfigOrigin::File(path.clone()));
    assert_eq!(cfg.main_file(), "cmd/server/main.go");
    assert_eq!(cfg.run_args(), ["--port", "8080"]);
    assert_eq!(cfg.debounce(), Duration::from_millis(250));
    assert_eq!(cfg.build_path(), &PathBuf::from("./tmp/main"));
    assert_eq!(cfg.watch_dirs(), [PathBuf::from(".")]);
    assert!(cfg.exclude().is_excluded_name("build.cache"));
    assert!(!cfg.exclude().is_excluded_name("vendor"));
    Ok(())
}

#[test]
fn empty_watch_dirs_means_project_root() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("thunder.toml");
    fs::write(&path, "watch_dirs = []\n")?;

    let cfg = load_and_validate(&path)?;
    assert_eq!(cfg.watch_dirs(), [PathBuf::from(".")]);
    Ok(())
}

#[test]
fn malformed_toml_is_a_setup_error() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("thunder.toml");
    fs::write(&path, "debounce = \"soon\"\n")?;

    match load_or_default(&path) {
        Err(ThunderError::TomlError(_)) => Ok(()),
        other => Err(format!("expected TOML error, got {other:?}").into()),
    }
}

#[test]
fn invalid_values_are_rejected() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("thunder.toml");
    fs::write(&path, "main_file = \"\"\n")?;

    match load_or_default(&path) {
        Err(ThunderError::ConfigError(msg)) => {
            assert!(msg.contains("main_file"), "unexpected message: {msg}");
            Ok(())
        }
        other => Err(format!("expected config error, got {other:?}").into()),
    }
}

#[tokio::test]
async fn nothing_to_watch_fails_before_building() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("does-not-exist");
    let artifact = dir.path().join("tmp").join("main");

    let cfg = WatchConfigBuilder::new()
        .watch_dirs(&[missing.to_str().ok_or("non-utf8 temp path")?])
        .build_path(artifact.to_str().ok_or("non-utf8 temp path")?)
        .build();

    let res = run_supervisor(cfg, std::future::pending::<()>()).await;
    assert!(matches!(res, Err(ThunderError::NoWatchableDirectories(_))));
    // The artifact directory is prepared before watching starts.
    assert!(dir.path().join("tmp").is_dir());
    Ok(())
}

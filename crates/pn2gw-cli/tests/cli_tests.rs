//! End-to-end runs of the CLI against WAT guests.

use clap::Parser;
use pn2gw_cli::{app, Args};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tempfile::TempDir;

// 全局 session 只能有一个
static SESSION_LOCK: Mutex<()> = Mutex::new(());

fn lock() -> MutexGuard<'static, ()> {
    SESSION_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Returns the CSV text as the hand history.
const ECHO_GUEST: &str = r#"
(module
    (memory (export "mem") 1)
    (global $heap (mut i32) (i32.const 4096))
    (func (export "malloc") (param $n i32) (result i32)
        (local $p i32)
        (local.set $p (global.get $heap))
        (global.set $heap (i32.add (local.get $p) (local.get $n)))
        (local.get $p))
    (func (export "parseCSV")
        (param $csv i32) (param $csvLen i32) (param i32 i32 i32 i32 f64 f64)
        (result i32)
        (i32.store (i32.const 16) (local.get $csv))
        (i32.store (i32.const 20) (local.get $csvLen))
        (i32.store (i32.const 24) (i32.const 0))
        (i32.store (i32.const 28) (i32.const 0))
        (i32.store (i32.const 32) (i32.const 0))
        (i32.const 16))
)
"#;

/// Converts to "HH" and reports one incomplete hand.
const SKIPPING_GUEST: &str = r#"
(module
    (memory (export "mem") 1)
    (global $heap (mut i32) (i32.const 4096))
    (data (i32.const 512) "HH")
    (data (i32.const 1024) "[{\22hand_number\22:7,\22hand_id\22:\22x7\22,\22reason\22:\22incomplete_hand\22,\22detail\22:\22no ending\22}]")
    (func (export "malloc") (param $n i32) (result i32)
        (local $p i32)
        (local.set $p (global.get $heap))
        (global.set $heap (i32.add (local.get $p) (local.get $n)))
        (local.get $p))
    (func (export "parseCSV")
        (param i32 i32 i32 i32 i32 i32 f64 f64) (result i32)
        (i32.store (i32.const 16) (i32.const 512))
        (i32.store (i32.const 20) (i32.const 2))
        (i32.store (i32.const 24) (i32.const 1))
        (i32.store (i32.const 28) (i32.const 1024))
        (i32.store (i32.const 32) (i32.const 82))
        (i32.const 16))
)
"#;

const CSV: &str = "entry,at,order\nPokerStars Hand #1: 2024/01/15 21:03:44 UTC\n";

fn write_guest(dir: &Path, wat_src: &str) -> String {
    let path = dir.join("guest.wasm");
    fs::write(&path, wat::parse_str(wat_src).unwrap()).unwrap();
    path.to_str().unwrap().to_string()
}

fn base_args(dir: &TempDir, module: &str) -> Vec<String> {
    let input = dir.path().join("input.csv");
    fs::write(&input, CSV).unwrap();

    vec![
        "pn2gw".to_string(),
        "--config".to_string(),
        dir.path().join("missing.toml").to_str().unwrap().to_string(),
        "--module".to_string(),
        module.to_string(),
        "-i".to_string(),
        input.to_str().unwrap().to_string(),
        "--hero-name".to_string(),
        "Alice".to_string(),
    ]
}

#[tokio::test]
async fn test_convert_to_output_file() {
    let _lock = lock();
    let dir = tempfile::tempdir().unwrap();
    let module = write_guest(dir.path(), ECHO_GUEST);
    let output = dir.path().join("out.txt");

    let mut argv = base_args(&dir, &module);
    argv.extend(["-o".to_string(), output.to_str().unwrap().to_string()]);

    app::run(Args::try_parse_from(argv).unwrap()).await.unwrap();

    assert_eq!(fs::read_to_string(&output).unwrap(), CSV);
    assert!(pn2gw_wasm::session::current().is_err());
}

#[tokio::test]
async fn test_auto_name_uses_first_timestamp() {
    let _lock = lock();
    let dir = tempfile::tempdir().unwrap();
    let module = write_guest(dir.path(), ECHO_GUEST);

    let mut argv = base_args(&dir, &module);
    argv.extend([
        "--auto-name".to_string(),
        "--output-dir".to_string(),
        dir.path().to_str().unwrap().to_string(),
    ]);

    app::run(Args::try_parse_from(argv).unwrap()).await.unwrap();

    let written = dir.path().join("2024-01-15_21-03-44.txt");
    assert_eq!(fs::read_to_string(written).unwrap(), CSV);
}

#[tokio::test]
async fn test_skipped_report_written() {
    let _lock = lock();
    let dir = tempfile::tempdir().unwrap();
    let module = write_guest(dir.path(), SKIPPING_GUEST);
    let output = dir.path().join("out.txt");
    let report = dir.path().join("skipped.txt");

    let mut argv = base_args(&dir, &module);
    argv.extend([
        "-o".to_string(),
        output.to_str().unwrap().to_string(),
        "--skipped-report".to_string(),
        report.to_str().unwrap().to_string(),
    ]);

    app::run(Args::try_parse_from(argv).unwrap()).await.unwrap();

    assert_eq!(fs::read_to_string(&output).unwrap(), "HH");
    let report = fs::read_to_string(&report).unwrap();
    assert!(report.starts_with("=== Skipped Hands Report ===\nTotal skipped: 1 hands"));
    assert!(report.contains("Incomplete hand (not properly closed): 1 hands"));
    assert!(report.contains("Hand Number: #7"));
    assert!(report.contains("Detail: no ending"));
}

#[tokio::test]
async fn test_no_skipped_report_when_nothing_skipped() {
    let _lock = lock();
    let dir = tempfile::tempdir().unwrap();
    let module = write_guest(dir.path(), ECHO_GUEST);
    let output = dir.path().join("out.txt");
    let report = dir.path().join("skipped.txt");

    let mut argv = base_args(&dir, &module);
    argv.extend([
        "-o".to_string(),
        output.to_str().unwrap().to_string(),
        "--skipped-report".to_string(),
        report.to_str().unwrap().to_string(),
    ]);

    app::run(Args::try_parse_from(argv).unwrap()).await.unwrap();

    assert_eq!(fs::read_to_string(&output).unwrap(), CSV);
    assert!(!report.exists());
}

#[tokio::test]
async fn test_out_of_range_rake_flags_rejected() {
    let _lock = lock();
    let dir = tempfile::tempdir().unwrap();
    let module = write_guest(dir.path(), ECHO_GUEST);
    let output = dir.path().join("out.txt");

    for rake in [
        ["--rake-percent", "150"],
        ["--rake-cap-bb=-3", "--rake-percent=5"],
        ["--rake-percent", "NaN"],
    ] {
        let mut argv = base_args(&dir, &module);
        argv.extend(["-o".to_string(), output.to_str().unwrap().to_string()]);
        argv.extend(rake.iter().map(|arg| arg.to_string()));

        let err = app::run(Args::try_parse_from(argv).unwrap())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("rake_"), "{:#}", err);
        assert!(!output.exists());
        assert!(pn2gw_wasm::session::current().is_err());
    }
}

#[tokio::test]
async fn test_missing_module_fails_and_tears_down() {
    let _lock = lock();
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.wasm");

    let argv = base_args(&dir, missing.to_str().unwrap());
    let err = app::run(Args::try_parse_from(argv).unwrap())
        .await
        .unwrap_err();

    assert!(format!("{:#}", err).contains("Failed to read guest module"));
    assert!(pn2gw_wasm::session::current().is_err());
}

#[tokio::test]
async fn test_missing_hero_fails_before_loading() {
    let _lock = lock();
    let dir = tempfile::tempdir().unwrap();
    let module = write_guest(dir.path(), ECHO_GUEST);

    let argv: Vec<String> = base_args(&dir, &module)
        .into_iter()
        .take(7)
        .collect();
    let err = app::run(Args::try_parse_from(argv).unwrap())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("--hero-name is required"));
    assert!(pn2gw_wasm::session::current().is_err());
}

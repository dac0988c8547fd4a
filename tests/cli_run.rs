#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn crab_monitor(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_crab-monitor"))
        .args(args)
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .env("USER", "tester")
        .output()
        .expect("run crab-monitor")
}

fn combined(out: &Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    )
}

fn simpack_with_samples(root: &Path, names: &[&str]) {
    let prod = root.join("simpack").join("prod");
    for name in names {
        fs::create_dir_all(prod.join("crab_logs").join(name)).unwrap();
    }
    fs::write(
        prod.join("crab_status.sh"),
        "#!/bin/bash\necho 'Jobs status: finished 100%'\necho 'Dashboard monitoring URL: http://x'\n",
    )
    .unwrap();
}

#[test]
fn missing_simpack_is_fatal() {
    let root = TempDir::new().unwrap();
    let out = crab_monitor(root.path(), &["-i", "nope"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(combined(&out).contains("does not exist"));
    assert!(!root.path().join("monitor_crab_jobs").exists());
}

#[test]
fn missing_proxy_is_fatal() {
    let root = TempDir::new().unwrap();
    simpack_with_samples(root.path(), &["s1"]);
    let out = crab_monitor(root.path(), &["-i", "simpack", "-p", "no_proxy"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(combined(&out).contains("provided proxy"));
}

#[test]
fn empty_simpack_is_fatal() {
    let root = TempDir::new().unwrap();
    fs::create_dir_all(root.path().join("simpack/prod")).unwrap();
    let out = crab_monitor(root.path(), &["-i", "simpack"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(combined(&out).contains("no samples found"));
}

#[test]
fn test_mode_limits_samples_and_prints_download_hint() {
    let root = TempDir::new().unwrap();
    simpack_with_samples(root.path(), &["s1", "s2", "s3", "s4"]);
    let out = crab_monitor(root.path(), &["-i", "simpack", "--test"]);
    let text = combined(&out);
    assert!(out.status.success(), "{text}");
    assert!(text.contains("max_attempts"));
    assert!(text.contains("Use scp -r tester@lxplus.cern.ch:"));

    let html = fs::read_to_string(root.path().join("monitor_crab_jobs/index.html")).unwrap();
    for name in ["s1", "s2", "s3"] {
        assert!(html.contains(&format!(">{name}<")));
    }
    assert!(!html.contains(">s4<"));
}

#[test]
fn logging_setup_failure_is_reported_on_stderr() {
    let root = TempDir::new().unwrap();
    simpack_with_samples(root.path(), &["s1"]);
    fs::write(root.path().join("blocker"), "").unwrap();
    fs::write(
        root.path().join("bad.toml"),
        "[logging]\nwrite_to_file = true\nfile_path = \"blocker/sub/x.log\"\n",
    )
    .unwrap();

    let out = crab_monitor(root.path(), &["-i", "simpack", "--config", "bad.toml"]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("error:"), "stderr was: {stderr}");
}

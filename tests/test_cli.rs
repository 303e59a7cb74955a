//! Integration tests for the `advlock` binary
//!
//! These tests execute the compiled binary directly using `assert_cmd`. Each
//! test runs inside a temp dir marked as a repository root so config
//! discovery never picks up files from outside it.

use std::fs;
use std::process::{Command, Stdio};

use advlock::Flock;
use assert_cmd::assert::OutputAssertExt;
use predicates::prelude::*;
use tempfile::TempDir;

/// Path of the binary, for use as the wrapped command.
const ADVLOCK: &str = env!("CARGO_BIN_EXE_advlock");

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join(".git")).unwrap();
    dir
}

fn advlock_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("advlock"));
    cmd.current_dir(dir.path());
    cmd.env_remove("RUST_LOG");
    cmd.stdin(Stdio::null());
    cmd
}

#[test]
fn help_lists_subcommands() {
    let dir = workspace();
    advlock_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("probe"));
}

#[test]
fn version_output() {
    let dir = workspace();
    let version_predicate = predicate::str::is_match(r"\b\d+\.\d+\.\d+\b").unwrap();
    advlock_cmd(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("advlock"))
        .stdout(version_predicate);
}

#[test]
fn missing_subcommand_is_usage_error() {
    let dir = workspace();
    advlock_cmd(&dir).assert().code(2);
}

#[test]
fn probe_free_lock_as_json() {
    let dir = workspace();
    advlock_cmd(&dir)
        .args(["probe", "free.lock", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""exclusive_available": true"#))
        .stdout(predicate::str::contains(r#""shared_available": true"#));

    assert!(dir.path().join("free.lock").exists());
}

#[test]
fn probe_reports_exclusive_holder() {
    let dir = workspace();
    let holder = Flock::new(dir.path().join("busy.lock"));
    assert!(holder.try_lock().unwrap());

    advlock_cmd(&dir)
        .args(["probe", "busy.lock"])
        .assert()
        .success()
        .stdout(predicate::str::contains("exclusive: held"))
        .stdout(predicate::str::contains("shared: held"));

    holder.unlock().unwrap();
}

#[test]
fn probe_reports_shared_holder() {
    let dir = workspace();
    let reader = Flock::new(dir.path().join("read.lock"));
    assert!(reader.try_lock_shared().unwrap());

    advlock_cmd(&dir)
        .args(["probe", "read.lock"])
        .assert()
        .success()
        .stdout(predicate::str::contains("exclusive: held"))
        .stdout(predicate::str::contains("shared: available"));

    reader.unlock().unwrap();
}

#[test]
fn run_nonblock_exits_9_when_held() {
    let dir = workspace();
    let holder = Flock::new(dir.path().join("job.lock"));
    assert!(holder.try_lock().unwrap());

    advlock_cmd(&dir)
        .args(["run", "job.lock", "--nonblock", "--", ADVLOCK, "--version"])
        .assert()
        .code(9)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("is locked"));

    holder.unlock().unwrap();
}

#[test]
fn run_timeout_exits_10_when_held() {
    let dir = workspace();
    let holder = Flock::new(dir.path().join("job.lock"));
    assert!(holder.try_lock().unwrap());

    advlock_cmd(&dir)
        .args([
            "run",
            "job.lock",
            "--timeout-ms",
            "100",
            "--retry-delay-ms",
            "10",
            "--",
            ADVLOCK,
            "--version",
        ])
        .assert()
        .code(10)
        .stderr(predicate::str::contains("context deadline exceeded"));

    holder.unlock().unwrap();
}

#[test]
fn run_shared_alongside_reader() {
    let dir = workspace();
    let reader = Flock::new(dir.path().join("data.lock"));
    assert!(reader.try_lock_shared().unwrap());

    advlock_cmd(&dir)
        .args(["run", "data.lock", "--shared", "--nonblock", "--", ADVLOCK, "--version"])
        .assert()
        .success()
        .stdout(predicate::str::contains("advlock"));

    reader.unlock().unwrap();
}

#[test]
fn run_holds_lock_while_command_runs() {
    let dir = workspace();
    advlock_cmd(&dir)
        .args(["run", "held.lock", "--", ADVLOCK, "probe", "held.lock", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""exclusive_available": false"#));

    // Released once the command finished.
    let after = Flock::new(dir.path().join("held.lock"));
    assert!(after.try_lock().unwrap());
    after.unlock().unwrap();
}

#[test]
fn run_passes_through_command_status() {
    let dir = workspace();
    // `probe` without a path is a usage error in the child.
    advlock_cmd(&dir)
        .args(["run", "status.lock", "--", ADVLOCK, "probe"])
        .assert()
        .code(2);
}

#[cfg(unix)]
#[test]
fn run_shell_command_exit_code() {
    let dir = workspace();
    advlock_cmd(&dir)
        .args(["run", "sh.lock", "--", "sh", "-c", "exit 3"])
        .assert()
        .code(3);

    advlock_cmd(&dir)
        .args(["run", "sh.lock", "--", "true"])
        .assert()
        .success();
}

#[test]
fn run_missing_program_is_internal_error() {
    let dir = workspace();
    advlock_cmd(&dir)
        .args(["run", "x.lock", "--", "advlock-test-no-such-program"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to run"));

    // The lock is released even though the command never started.
    let after = Flock::new(dir.path().join("x.lock"));
    assert!(after.try_lock().unwrap());
    after.unlock().unwrap();
}

#[test]
fn invalid_permissions_exit_2() {
    let dir = workspace();
    advlock_cmd(&dir)
        .args(["--permissions", "999", "probe", "p.lock"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("permissions"));
}

#[test]
fn malformed_config_file_exit_2() {
    let dir = workspace();
    let config_dir = dir.path().join(".advlock");
    fs::create_dir(&config_dir).unwrap();
    fs::write(config_dir.join("config.toml"), "[lock\n").unwrap();

    advlock_cmd(&dir)
        .args(["probe", "p.lock"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("configuration error"));
}

#[test]
fn explicit_config_is_used() {
    let dir = workspace();
    let config = dir.path().join("custom.toml");
    fs::write(&config, "[lock]\nretry_delay_ms = 0\n").unwrap();

    advlock_cmd(&dir)
        .arg("--config")
        .arg(&config)
        .args(["probe", "p.lock"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("retry_delay_ms"));
}

#[test]
fn verbose_logs_to_stderr_only() {
    let dir = workspace();
    advlock_cmd(&dir)
        .args(["--verbose", "probe", "v.lock", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("{"))
        .stderr(predicate::str::contains("lock acquired"));
}

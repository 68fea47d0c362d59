//! Command-line behaviour of the harness binary, on the headless backend

use std::process::Command;

fn harness() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pane-harness"));
    cmd.env("PANE_BACKEND", "headless").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_all_tests_pass_in_child_processes() {
    let output = harness().output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stdout: {stdout}");
    for name in ["terminate", "c_api", "bidir_comms"] {
        assert!(stdout.contains(&format!("TEST: {name}")), "missing {name} in {stdout}");
    }
    assert_eq!(stdout.matches("  PASS").count(), 3);
}

#[test]
fn test_single_test_by_name() {
    let status = harness().arg("bidir_comms").status().unwrap();
    assert!(status.success());
}

#[test]
fn test_unknown_test_prints_usage() {
    let output = harness().arg("nope").output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout.starts_with("USAGE: "));
    assert!(stdout.contains("  terminate\n"));
}

#[test]
fn test_too_many_arguments_prints_usage() {
    let output = harness().args(["terminate", "c_api"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
}

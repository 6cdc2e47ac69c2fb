//! End-to-end smoke tests against the compiled binary: argument handling and
//! startup validation, no network or ffmpeg involved.

use std::process::Command;

fn storyreel() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_storyreel"));
    for key in ["DEEPSEEK_API_KEY", "ARK_API_KEY", "DASHSCOPE_API_KEY"] {
        cmd.env_remove(key);
    }
    cmd
}

#[test]
fn templates_reports_an_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    let out = storyreel()
        .args(["templates", "--templates-dir"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("no templates found"), "stdout: {stdout}");
}

#[test]
fn run_with_a_missing_input_file_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let out = storyreel()
        .current_dir(dir.path())
        .args(["run", "--in", "does_not_exist.json"])
        .output()
        .unwrap();
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("failed to read input"), "stderr: {stderr}");
}

#[test]
fn resume_without_credentials_names_the_missing_keys() {
    let dir = tempfile::tempdir().unwrap();
    let items = dir.path().join("demo.json");
    std::fs::write(&items, "[]").unwrap();
    let out = storyreel()
        .current_dir(dir.path())
        .args(["resume", "--items"])
        .arg(&items)
        .output()
        .unwrap();
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("DEEPSEEK_API_KEY"), "stderr: {stderr}");
}

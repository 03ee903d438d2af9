#![cfg(unix)]

use std::process::{Command, Output};

fn run_line(extra: &[&str], line: &str) -> Output {
    Command::new(env!("CARGO_BIN_EXE_shell_exec"))
        .args(extra)
        .arg("-c")
        .arg(line)
        .env_remove("SHELL_EXEC_MODE")
        .env_remove("SHELL_EXEC_SHELL")
        .env_remove("SHELL_EXEC_LOG")
        .output()
        .unwrap()
}

#[test]
fn missing_command_is_reported_by_name_in_shell_mode() {
    let out = run_line(&[], "surely-not-a-command-4242 :x");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert_eq!(out.status.code(), Some(127));
    assert!(
        stderr.contains("surely-not-a-command-4242: command not found"),
        "{stderr}"
    );
    assert!(!stderr.contains("/bin/sh"), "{stderr}");
}

#[test]
fn missing_command_is_reported_by_name_in_direct_mode() {
    let out = run_line(&["--direct"], "surely-not-a-command-4242 :x");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert_eq!(out.status.code(), Some(127));
    assert!(
        stderr.contains("surely-not-a-command-4242: command not found"),
        "{stderr}"
    );
}

#[test]
fn shell_syntax_still_reaches_the_shell() {
    let out = run_line(&[], "\"exit 3\"");
    assert_eq!(out.status.code(), Some(3));
    assert!(!String::from_utf8_lossy(&out.stderr).contains("command not found"));
}

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn bin(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_taskline"));
    cmd.current_dir(home)
        .env("TASKLINE_HOME", home)
        .env_remove("TASKLINE_FILE")
        .env_remove("TASKLINE_LOG");
    cmd
}

fn run_session(cmd: &mut Command, input: &str) -> Output {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(input.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("wait")
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).expect("utf8")
}

#[test]
fn add_then_list_renders_ordinal() {
    let temp = TempDir::new().expect("tempdir");
    let out = run_session(bin(temp.path()).arg("--memory"), "add /todo buy milk\nlist\nexit\n");
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("    added: 1. [T][ ] buy milk\n"));
    assert!(text.contains("    1. [T][ ] buy milk\n"));
    assert!(text.contains("    Goodbye.\n"));
}

#[test]
fn deadline_renders_weekday_date() {
    let temp = TempDir::new().expect("tempdir");
    let out = run_session(
        bin(temp.path()).arg("--memory"),
        "add /deadline submit report /by 2020-01-01\nlist\n",
    );
    assert!(out.status.success());
    assert!(stdout(&out).contains("    1. [D][ ] submit report (by: Wed, 1 Jan 2020)\n"));
}

#[test]
fn errors_do_not_end_the_session() {
    let temp = TempDir::new().expect("tempdir");
    let out = run_session(
        bin(temp.path()).arg("--memory"),
        "launch\nadd /todo a\nadd /todo b\nmark 5\nadd /chore x\nfind zzz\nlist\n",
    );
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("[ERROR] Command not found: launch"));
    assert!(text.contains("[ERROR] Invalid index."));
    assert!(text.contains("[ERROR] Invalid task type: /chore"));
    assert!(text.contains("    No tasks found.\n"));
    assert!(text.contains("    1. [T][ ] a\n    2. [T][ ] b\n"));
}

#[test]
fn multi_delete_reports_original_positions() {
    let temp = TempDir::new().expect("tempdir");
    let out = run_session(
        bin(temp.path()).arg("--memory"),
        "add /todo a\nadd /todo b\nadd /todo c\ndelete 1 3\nlist\n",
    );
    let text = stdout(&out);
    assert!(text.contains("    deleted:\n      1. [T][ ] a\n      3. [T][ ] c\n"));
    assert!(text.contains("    1. [T][ ] b\n"));
}

#[test]
fn help_lists_commands() {
    let temp = TempDir::new().expect("tempdir");
    let out = run_session(bin(temp.path()).arg("--memory"), "help\n");
    let text = stdout(&out);
    assert!(text.contains("Usage: <command> [<args>]"));
    for name in ["exit", "help", "list", "add", "find", "mark", "delete"] {
        assert!(text.contains(&format!("{name} : ")), "missing {name} in help");
    }
}

#[test]
fn version_subcommand_prints_version() {
    let temp = TempDir::new().expect("tempdir");
    let out = bin(temp.path()).arg("version").output().expect("version");
    assert!(out.status.success());
    assert!(stdout(&out).starts_with("taskline "));
}

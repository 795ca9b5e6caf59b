use std::io::Write;
use std::process::{Command, Stdio};

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_reizc"))
}

#[test]
fn help_lists_subcommands() {
    let output = bin().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("parse"));
    assert!(stdout.contains("compile"));
    assert!(stdout.contains("list-kinds"));
}

#[test]
fn list_kinds_includes_every_schema_kind() {
    let output = bin().arg("list-kinds").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.lines().any(|l| l == "Module"));
    assert!(stdout.lines().any(|l| l == "Name"));
    assert!(stdout.lines().any(|l| l == "Sentinel"));
}

#[test]
fn compile_renders_a_select() {
    let mut child = bin()
        .arg("compile")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"Name(id=\"foo\")")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("SELECT AST::Name"));
    assert!(stdout.contains(".id = \"foo\""));
}

#[test]
fn compile_stats_wraps_in_count() {
    let mut child = bin()
        .args(["compile", "--stats"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"Name()")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.trim(), "SELECT count(SELECT AST::Name)");
}

#[test]
fn parse_rejects_unknown_node_kind() {
    let mut child = bin()
        .arg("parse")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"Bogus()")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("unknown node kind"));
}

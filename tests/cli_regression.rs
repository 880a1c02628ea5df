// Regression tests for the `pretext` binary.
// Requires: assert_cmd, predicates, tempfile in [dev-dependencies]

use std::fs;

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};
use tempfile::tempdir;

#[test]
fn run_writes_the_expanded_file() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("page.pre");
    let output = dir.path().join("page.txt");
    fs::write(
        &input,
        "MACRO add(a, b) {\n    a + b\n}\nResult: $(add(1, 2))$\n",
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("pretext").unwrap();
    cmd.arg("run").arg(&input).arg(&output);
    cmd.assert()
        .success()
        .stdout(contains("Interpretation was successful, wrote to"));

    assert_eq!(fs::read_to_string(&output).unwrap(), "\nResult: 3");
}

#[test]
fn run_to_dash_writes_to_stdout() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("page.pre");
    fs::write(&input, "Result: $(1 + 2)\n").unwrap();

    let mut cmd = Command::cargo_bin("pretext").unwrap();
    cmd.arg("run").arg(&input).arg("-");
    cmd.assert()
        .success()
        .stdout(contains("Result: 3\n").and(contains("Interpretation").not()));
}

#[test]
fn run_reports_miette_diagnostics_on_error() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("bad.pre");
    let output = dir.path().join("bad.txt");
    fs::write(&input, "total: $(1 + (2)\n").unwrap();

    let mut cmd = Command::cargo_bin("pretext").unwrap();
    cmd.arg("run").arg(&input).arg(&output);
    cmd.assert().failure().code(1).stderr(
        contains("Unbalanced parentheses").and(contains("pretext::eval")),
    );
}

#[test]
fn missing_input_is_an_io_error() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("pretext").unwrap();
    cmd.arg("run")
        .arg(dir.path().join("absent.pre"))
        .arg(dir.path().join("out.txt"));
    cmd.assert().failure().stderr(contains("Failed to read"));
}

#[test]
fn escape_flag_overrides_the_default() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("page.pre");
    let output = dir.path().join("page.txt");
    fs::write(&input, "cost: $5 + %(2 + 3)\n").unwrap();

    let mut cmd = Command::cargo_bin("pretext").unwrap();
    cmd.args(["--escape", "%", "run"]).arg(&input).arg(&output);
    cmd.assert().success();

    assert_eq!(fs::read_to_string(&output).unwrap(), "cost: $5 + 5\n");
}

#[test]
fn config_file_is_applied() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("pretext.yaml");
    let input = dir.path().join("page.pre");
    let output = dir.path().join("page.txt");
    fs::write(&config, "escape: \"@\"\nmax_depth: 4\n").unwrap();
    fs::write(&input, "MACRO f(n) { f(n) }\n@(f(1))\n").unwrap();

    let mut cmd = Command::cargo_bin("pretext").unwrap();
    cmd.arg("--config").arg(&config).arg("run").arg(&input).arg(&output);
    cmd.assert().failure().stderr(contains("deeper than 4"));
}

#[test]
fn ast_prints_statements() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("page.pre");
    fs::write(&input, "MACRO add(a, b) { a + b }\n").unwrap();

    let mut cmd = Command::cargo_bin("pretext").unwrap();
    cmd.arg("ast").arg(&input);
    cmd.assert()
        .success()
        .stdout(contains("(MACRO add (a b) {(+ a b)})"));
}

#[test]
fn tokens_prints_the_stream() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("page.pre");
    fs::write(&input, "MACRO f() { 1 }\n").unwrap();

    let mut cmd = Command::cargo_bin("pretext").unwrap();
    cmd.arg("tokens").arg(&input);
    cmd.assert()
        .success()
        .stdout(contains("keyword `MACRO`").and(contains("end of input")));
}

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn diagrammar() -> Command {
    Command::cargo_bin("diagrammar").expect("binary exists")
}

#[test]
fn diagrammar_run_demo() {
    let mut cmd = diagrammar();
    cmd.arg("run").arg("demos/shapes.dg");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("2 nodes, area 10, first: box 2x3"));
}

#[test]
fn diagrammar_eval_snippet() {
    let mut cmd = diagrammar();
    cmd.arg("eval").arg("1 + 2 + 3");
    cmd.assert().success().stdout("6\n");
}

#[test]
fn diagrammar_eval_respects_step_limit() {
    let mut cmd = diagrammar();
    cmd.args(["eval", "--max-steps", "100", "while { true } { 1 }"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("StepLimitExceeded"));
}

#[test]
fn diagrammar_parse_prints_normalized_program() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("sum.dg");
    fs::write(&script, "a = 1 + 2\n\"n: ${a}\"").expect("write script");

    let mut cmd = diagrammar();
    cmd.arg("parse").arg(&script);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("a = +(1, 2)"))
        .stdout(predicate::str::contains("+(\"n: \", a)"));
}

#[test]
fn diagrammar_complete_lists_fields() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("partial.dg");
    let source = "obj = object(alpha = 1)\nobj.";
    fs::write(&script, source).expect("write script");

    let mut cmd = diagrammar();
    cmd.arg("complete").arg(&script).arg(source.len().to_string());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("alpha"))
        .stdout(predicate::str::contains(
            "forEach\tCalls the callback with (value, key) for every own field",
        ));
}

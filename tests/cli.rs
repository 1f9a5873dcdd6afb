use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};

fn cmd() -> Command {
    Command::cargo_bin("tlainterp").unwrap()
}

fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).unwrap()
}

/// This test asserts what is part of the CLI and the documentation for it.
///
/// As changes are made, this help text will need updating, which helps
/// highlight any changes to the public interface.
#[test]
fn test_help_text() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Interpreter for a subset of the TLA+ specification language"))
        .stdout(predicate::str::contains("--const"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("next"))
        .stdout(predicate::str::contains("reachable"));
}

#[test]
fn test_init_produces_single_state() {
    let json = stdout_json(cmd().arg("tests/fixtures/counter.tla").arg("init"));
    assert_eq!(
        json,
        json!({ "states": [{ "x": { "#type": "int", "#value": 0 } }] })
    );
}

#[test]
fn test_next_from_stdin_state() {
    let state = json!({ "x": { "#type": "int", "#value": 0 } });
    let json = stdout_json(
        cmd()
            .arg("tests/fixtures/counter.tla")
            .arg("next")
            .write_stdin(state.to_string()),
    );
    assert_eq!(
        json,
        json!({ "states": [{ "x": { "#type": "int", "#value": 1 } }] })
    );
}

#[test]
fn test_next_forks_into_two_successors() {
    let state = json!({ "a": { "#type": "int", "#value": 0 }, "b": { "#type": "int", "#value": 0 } });
    let json = stdout_json(
        cmd()
            .arg("tests/fixtures/twocounters.tla")
            .arg("next")
            .write_stdin(state.to_string()),
    );
    let states = json["states"].as_array().unwrap();
    assert_eq!(states.len(), 2);
}

#[test]
fn test_reachable_is_bounded_by_max_states() {
    let json = stdout_json(
        cmd()
            .arg("tests/fixtures/counter.tla")
            .arg("reachable")
            .arg("--max-states")
            .arg("3"),
    );
    assert_eq!(json["states"].as_array().unwrap().len(), 3);
}

#[test]
fn test_constant_binding_is_applied() {
    let module = "\
---- MODULE WithConst ----
CONSTANT N
VARIABLE x

Init == x = N
Next == x' = x + 1
====";
    let json = stdout_json(
        cmd()
            .arg("--stdin")
            .arg("--const")
            .arg("N=5")
            .arg("init")
            .write_stdin(module),
    );
    assert_eq!(
        json,
        json!({ "states": [{ "x": { "#type": "int", "#value": 5 } }] })
    );
}

#[test]
fn test_malformed_const_argument_is_rejected() {
    cmd()
        .arg("tests/fixtures/counter.tla")
        .arg("--const")
        .arg("no-equals-sign")
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("MalformedConst"));
}

use std::fs;

use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::tempdir;

const SPEC: &str = r#"{
    "name": "Users API",
    "validations": [
        {
            "name": "show user",
            "expect_response": [{
                "response": "show",
                "status": 200,
                "headers": {"Content-Type": "application/json"},
                "properties": {"user": {"id": 1, "roles": {"$unordered": ["admin"]}}}
            }]
        },
        {"name": "archive user", "pending": true}
    ]
}"#;

fn parse_stdout(stdout: &[u8]) -> Value {
    serde_json::from_slice(stdout).expect("stdout json")
}

#[test]
fn passing_suite_exits_zero_with_report_on_stdout() {
    let dir = tempdir().expect("tempdir");
    let spec = dir.path().join("spec.json");
    let responses = dir.path().join("responses.yml");
    fs::write(&spec, SPEC).expect("write spec");
    fs::write(
        &responses,
        "show:\n  status: 200\n  headers:\n    Content-Type: application/json\n  body:\n    user:\n      id: 1\n      roles: [viewer, admin]\n",
    )
    .expect("write responses");

    let output = assert_cmd::cargo::cargo_bin_cmd!("apivalid")
        .arg("run")
        .arg("--spec")
        .arg(&spec)
        .arg("--responses")
        .arg(&responses)
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(0));
    let report = parse_stdout(&output.stdout);
    assert_eq!(report["valid"], json!(true));
    assert_eq!(report["pending"], json!(["Users API archive user"]));
    assert_eq!(report["results"][0]["validations"], json!(["Users API show user"]));
    assert_eq!(
        report["results"][0]["expected"]["response_body"]["assertions"][1],
        json!({"path": "/user/roles/~", "value": "admin", "type": "unordered_member"})
    );
}

#[test]
fn failing_suite_exits_two_and_reads_responses_from_stdin() {
    let dir = tempdir().expect("tempdir");
    let spec = dir.path().join("spec.json");
    fs::write(&spec, SPEC).expect("write spec");

    let output = assert_cmd::cargo::cargo_bin_cmd!("apivalid")
        .arg("run")
        .arg("--spec")
        .arg(&spec)
        .write_stdin(r#"{"show": {"status": 500, "headers": {}, "body": {"user": {"id": 1, "roles": []}}}}"#)
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(2));
    let report = parse_stdout(&output.stdout);
    let expected = &report["results"][0]["expected"];
    assert_eq!(expected["status"]["valid"], json!(false));
    assert_eq!(
        expected["response_headers"]["diff"],
        json!([{"path": "/Content-Type", "op": "add", "expected_value": "application/json"}])
    );
    assert_eq!(
        expected["response_body"]["diff"],
        json!([{
            "path": "/user/roles/~",
            "op": "replace",
            "expected_value": "admin",
            "current_value": [],
            "type": "unordered_member"
        }])
    );
}

#[test]
fn missing_fixture_is_input_usage_error() {
    let dir = tempdir().expect("tempdir");
    let spec = dir.path().join("spec.json");
    fs::write(&spec, SPEC).expect("write spec");

    assert_cmd::cargo::cargo_bin_cmd!("apivalid")
        .arg("run")
        .arg("--spec")
        .arg(&spec)
        .write_stdin("{}")
        .assert()
        .code(3)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("\"error\":\"input_usage_error\""))
        .stderr(predicate::str::contains("response `show` was not captured"));
}

#[test]
fn debug_logging_goes_to_stderr() {
    let dir = tempdir().expect("tempdir");
    let spec = dir.path().join("spec.json");
    fs::write(&spec, SPEC).expect("write spec");

    let output = assert_cmd::cargo::cargo_bin_cmd!("apivalid")
        .args(["--log-level", "debug", "run", "--spec"])
        .arg(&spec)
        .write_stdin(r#"{"show": {"status": 200}}"#)
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(2));
    parse_stdout(&output.stdout);
    let stderr = String::from_utf8(output.stderr).expect("stderr utf8");
    assert!(stderr.contains("running validation"), "{stderr}");
}

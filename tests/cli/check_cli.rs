use std::fs;

use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::tempdir;

#[test]
fn matching_response_exits_zero() {
    let dir = tempdir().expect("tempdir");
    let expect = dir.path().join("expect.yaml");
    fs::write(
        &expect,
        "status: [200, 204]\nschema:\n  type: object\n  required: [id]\nproperties:\n  id: 4\n",
    )
    .expect("write expectation");

    let output = assert_cmd::cargo::cargo_bin_cmd!("apivalid")
        .arg("check")
        .arg("--expect")
        .arg(&expect)
        .write_stdin(r#"{"status": 200, "body": {"id": 4}, "request": {"method": "get", "url": "/items/4?fields=id"}}"#)
        .output()
        .expect("check");

    assert_eq!(output.status.code(), Some(0));
    let report: Value = serde_json::from_slice(&output.stdout).expect("stdout json");
    assert_eq!(report["valid"], json!(true));
    assert_eq!(report["actual"]["request_method"], json!("GET"));
    assert_eq!(report["actual"]["request_params"], json!({"fields": "id"}));
    assert_eq!(report["expected"]["schema"]["valid"], json!(true));
}

#[test]
fn schema_violations_are_reported_with_errors() {
    let dir = tempdir().expect("tempdir");
    let expect = dir.path().join("expect.json");
    let response = dir.path().join("response.json");
    fs::write(
        &expect,
        r#"{"schema": {"type": "object", "properties": {"id": {"type": "integer"}}}, "schema_path": "/data"}"#,
    )
    .expect("write expectation");
    fs::write(&response, r#"{"status": 200, "body": {"data": {"id": "4"}}}"#).expect("write response");

    let output = assert_cmd::cargo::cargo_bin_cmd!("apivalid")
        .arg("check")
        .arg("--expect")
        .arg(&expect)
        .arg("--response")
        .arg(&response)
        .output()
        .expect("check");

    assert_eq!(output.status.code(), Some(2));
    let report: Value = serde_json::from_slice(&output.stdout).expect("stdout json");
    let schema = &report["expected"]["schema"];
    assert_eq!(schema["valid"], json!(false));
    assert_eq!(schema["diff"], json!([]));
    assert_eq!(schema["errors"][0]["instance_path"], json!("/id"));
}

#[test]
fn invalid_expectation_document_is_input_usage_error() {
    let dir = tempdir().expect("tempdir");
    let expect = dir.path().join("expect.json");
    fs::write(&expect, r#"{"statuss": 200}"#).expect("write expectation");

    assert_cmd::cargo::cargo_bin_cmd!("apivalid")
        .arg("check")
        .arg("--expect")
        .arg(&expect)
        .write_stdin(r#"{"status": 200}"#)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("invalid expectation document"));
}

#[test]
fn explicit_format_overrides_the_extension() {
    let dir = tempdir().expect("tempdir");
    let expect = dir.path().join("expect.txt");
    fs::write(&expect, "status: 404\n").expect("write expectation");

    assert_cmd::cargo::cargo_bin_cmd!("apivalid")
        .args(["check", "--from", "yaml", "--expect"])
        .arg(&expect)
        .write_stdin("status: 404\n")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("\"valid\":true"));
}

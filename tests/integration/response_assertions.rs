use apivalid::domain::assertion::{Expected, absent, unordered};
use apivalid::domain::report::{DiffOpKind, ValidatorResult};
use apivalid::domain::response::Response;
use apivalid::engine::assert::{HeaderValidator, JsonValidator, SchemaValidator, Validator};
use regex::Regex;
use serde_json::{Value, json};

fn body_response(body: Value) -> Response {
    Response::new(200).with_body(body)
}

fn validate_body(expected: impl Into<Expected>, body: Value) -> ValidatorResult {
    JsonValidator::new(expected)
        .validate(&body_response(body))
        .expect("validate")
}

#[test]
fn matching_structures_produce_no_failures() {
    let expected = Expected::map([
        ("id", Expected::from(7i64)),
        ("profile", Expected::map([("name", "alice"), ("city", "Oslo")])),
        ("roles", Expected::List(vec!["admin".into(), "dev".into()])),
        ("password", absent()),
    ]);
    let result = validate_body(
        expected,
        json!({"id": 7, "profile": {"name": "alice", "city": "Oslo"}, "roles": ["admin", "dev"]}),
    );
    assert!(result.valid);
    assert!(result.failed_assertions.is_empty());
    assert!(result.diff.is_empty());
    assert_eq!(result.assertions.len(), 6);
}

#[test]
fn a_single_differing_leaf_is_one_replace() {
    let result = validate_body(
        json!({"profile": {"name": "alice", "age": 30}}),
        json!({"profile": {"name": "alice", "age": 31}}),
    );
    assert!(!result.valid);
    assert_eq!(result.failed_assertions.len(), 1);
    assert_eq!(result.failed_assertions[0].path.to_string(), "/profile/age");
    assert_eq!(result.diff.len(), 1);
    assert_eq!(result.diff[0].op, DiffOpKind::Replace);
    assert_eq!(result.diff[0].current_value, Some(json!(31)));
}

#[test]
fn present_absent_paths_are_removals() {
    let result = validate_body(
        Expected::map([("token", absent())]),
        json!({"token": "leaked"}),
    );
    assert!(!result.valid);
    let diff = serde_json::to_value(&result.diff).expect("serialize");
    assert_eq!(
        diff,
        json!([{"path": "/token", "op": "remove", "expected_value": null, "current_value": "leaked"}])
    );
}

#[test]
fn unordered_members_match_anywhere_in_the_sequence() {
    let expected = || Expected::map([("items", unordered([json!({"sku": "b"})]))]);

    for body in [
        json!({"items": [{"sku": "a"}, {"sku": "b"}]}),
        json!({"items": [{"sku": "b"}, {"sku": "a"}]}),
    ] {
        assert!(validate_body(expected(), body).valid);
    }

    let missing = validate_body(expected(), json!({"items": [{"sku": "a"}, {"sku": "b", "extra": 1}]}));
    assert!(!missing.valid);
    assert_eq!(missing.diff[0].path.to_string(), "/items/~");
    assert_eq!(
        missing.diff[0].current_value,
        Some(json!([{"sku": "a"}, {"sku": "b", "extra": 1}]))
    );
}

#[test]
fn nested_unordered_tags_and_a_mismatched_id() {
    let expected = Expected::map([(
        "user",
        Expected::map([("id", Expected::from(1i64)), ("tags", unordered(["a", "b"]))]),
    )]);
    let result = validate_body(expected, json!({"user": {"id": 2, "tags": ["b", "a", "c"]}}));

    assert_eq!(result.failed_assertions.len(), 1);
    assert_eq!(result.failed_assertions[0].path.to_string(), "/user/id");
    assert_eq!(result.diff.len(), 1);
    assert_eq!(result.diff[0].op, DiffOpKind::Replace);
    assert_eq!(result.diff[0].current_value, Some(json!(2)));
}

#[test]
fn missing_header_is_an_addition() {
    let result = HeaderValidator::new(vec![(
        "Content-Type".to_string(),
        Expected::from("application/json"),
    )])
    .validate(&Response::new(200).with_header("X-Request-Id", "abc"))
    .expect("validate");
    assert_eq!(
        serde_json::to_value(&result.diff).expect("serialize"),
        json!([{"path": "/Content-Type", "op": "add", "expected_value": "application/json"}])
    );
}

#[test]
fn patterns_match_string_forms() {
    let expected = Expected::map([
        ("email", Expected::from(Regex::new("^[^@]+@example\\.com$").expect("regex"))),
        ("id", Expected::from(Regex::new("^\\d+$").expect("regex"))),
    ]);
    assert!(validate_body(expected.clone(), json!({"email": "a@example.com", "id": 42})).valid);
    assert!(!validate_body(expected, json!({"email": "a@other.test", "id": 42})).valid);
}

#[test]
fn json_string_bodies_are_parsed_before_matching() {
    let response = Response::new(200).with_body(json!("{\"id\": 5}"));
    let result = JsonValidator::new(json!({"id": 5}))
        .validate(&response)
        .expect("validate");
    assert!(result.valid);
}

#[test]
fn schema_failures_are_listed_as_errors() {
    let response = body_response(json!({"user": {"id": "seven"}}));
    let schema = json!({
        "type": "object",
        "required": ["id", "name"],
        "properties": {"id": {"type": "integer"}}
    });
    let result = SchemaValidator::new(schema)
        .at("/user".into())
        .validate(&response)
        .expect("validate");
    assert!(!result.valid);
    assert!(result.diff.is_empty());
    assert_eq!(result.errors.len(), 2);
    assert!(result.errors.iter().any(|error| error.instance_path == "/id"));
}

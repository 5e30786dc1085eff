use std::rc::Rc;

use apivalid::domain::document::{ResponsesDocument, SpecDocument};
use apivalid::domain::error::SpecError;
use apivalid::domain::report::ResponseAspect;
use apivalid::engine::spec::loader;
use apivalid::io::{Format, reader};
use serde_json::json;
use tempfile::tempdir;

const SPEC_YAML: &str = r#"
name: Posts API
set:
  author: alice
header_expectations:
  json:
    Content-Type: application/json
shared_examples:
  json endpoint:
    expect_response:
      - response: create_post
        headers: json
validations:
  - name: update post
    id: update
    depends_on: [create]
    expect_response:
      - response: update_post
        status: 200
        properties:
          title: Updated
          author:
            $get: /author
  - name: create post
    id: create
    behaves_as: [json endpoint]
    expect_response:
      - response: create_post
        status: {min: 200, max: 201}
        headers:
          Location:
            $match: ^/posts/\d+$
          X-Debug:
            $absent: true
        schema:
          type: object
          required: [id]
        properties:
          tags:
            $unordered: [news, rust]
        post_type: https://types.test/post
  - name: delete post
    pending: true
"#;

const RESPONSES_YAML: &str = r#"
create_post:
  status: 201
  headers:
    Content-Type: application/json
    Location: /posts/12
  body:
    id: 12
    tags: [rust, news, release]
  request:
    method: post
    url: /posts?draft=false
    body:
      title: Hello
update_post:
  status: 200
  body:
    title: Draft
    author: alice
"#;

fn load_pair() -> (SpecDocument, ResponsesDocument) {
    let dir = tempdir().expect("tempdir");
    let spec_path = dir.path().join("spec.yaml");
    let responses_path = dir.path().join("responses.yaml");
    std::fs::write(&spec_path, SPEC_YAML).expect("write spec");
    std::fs::write(&responses_path, RESPONSES_YAML).expect("write responses");

    let spec = reader::read_document(&spec_path, Format::Yaml).expect("spec");
    let responses = reader::read_document(&responses_path, Format::Yaml).expect("responses");
    (spec, responses)
}

#[test]
fn yaml_suite_runs_in_dependency_order_with_pending_entries() {
    let (spec, responses) = load_pair();
    let root = loader::load(&spec, Rc::new(responses), None).expect("load");
    let report = root.run().expect("run").into_report();

    let names: Vec<&str> = report.results.iter().map(|entry| entry.validations[0].as_str()).collect();
    assert_eq!(
        names,
        vec!["Posts API create post", "Posts API create post", "Posts API update post"]
    );
    assert_eq!(report.pending, vec!["Posts API delete post".to_string()]);

    let create = &report.results[1].report;
    assert!(create.valid, "{create:?}");
    assert_eq!(create.actual.request_method, "POST");
    assert_eq!(create.actual.request_path, "/posts");
    assert_eq!(create.actual.request_body, Some(json!({"title": "Hello"})));
    assert!(create.expected.contains_key(&ResponseAspect::Schema));

    let update = &report.results[2].report;
    assert!(!update.valid);
    let body = &update.expected[&ResponseAspect::ResponseBody];
    assert_eq!(
        serde_json::to_value(&body.diff).expect("serialize"),
        json!([{"path": "/title", "op": "replace", "expected_value": "Updated", "current_value": "Draft"}])
    );
    assert!(!report.valid);
}

#[test]
fn behaviors_declared_below_the_root_are_not_visible_to_siblings() {
    let spec: SpecDocument = serde_json::from_value(json!({
        "validations": [
            {"name": "a", "shared_examples": {"local": {}}},
            {"name": "b", "behaves_as": ["local"]}
        ]
    }))
    .expect("spec");
    let error = loader::load(&spec, Rc::new(ResponsesDocument::new()), None).expect_err("scoped");
    assert!(matches!(error, SpecError::BehaviorNotFound { name } if name == "local"));
}

#[test]
fn validations_checking_one_fixture_share_a_consolidated_entry() {
    let spec: SpecDocument = serde_json::from_value(json!({
        "name": "Users",
        "validations": [
            {"name": "a", "expect_response": [{"response": "r", "properties": {"id": 1}}]},
            {"name": "b", "expect_response": [{"response": "r", "properties": {"id": 12345}}]},
            {"name": "c", "expect_response": [{"response": "other", "status": 200}]}
        ]
    }))
    .expect("spec");
    let responses: ResponsesDocument = serde_json::from_value(json!({
        "r": {"status": 200, "body": {"id": 2}},
        "other": {"status": 200, "body": {"id": 3}}
    }))
    .expect("responses");

    let report = loader::load(&spec, Rc::new(responses), None)
        .expect("load")
        .run()
        .expect("run")
        .into_report();

    assert_eq!(report.results.len(), 2);
    assert_eq!(report.results[0].validations, vec!["Users a", "Users b"]);
    assert_eq!(report.results[1].validations, vec!["Users c"]);
    let body = &report.results[0].report.expected[&ResponseAspect::ResponseBody];
    assert_eq!(body.failed_assertions.len(), 2);
    assert_eq!(
        serde_json::to_value(&body.diff).expect("serialize"),
        json!([{"path": "/id", "op": "replace", "expected_value": 12345, "current_value": 2}])
    );
    assert!(report.results[1].report.valid);
    assert!(!report.valid);
}

use std::io::Cursor;
use std::path::Path;

use apivalid::domain::response::Response;
use apivalid::io::{Format, IoError, reader, resolve_input_format};

#[test]
fn explicit_format_takes_priority() {
    let input =
        resolve_input_format(Some(Format::Yaml), Some(Path::new("in.json"))).expect("input");
    assert_eq!(input, Format::Yaml);
}

#[test]
fn extension_fallback_works() {
    let input = resolve_input_format(None, Some(Path::new("responses.yml"))).expect("input");
    assert_eq!(input, Format::Yaml);
}

#[test]
fn unknown_extension_is_error() {
    let err = resolve_input_format(None, Some(Path::new("in.csv"))).expect_err("must fail");
    match err {
        IoError::UnsupportedPathExtension { kind, .. } => assert_eq!(kind, "input"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn yaml_responses_deserialize_into_the_response_model() {
    let value = reader::read_value(
        Cursor::new(
            "status: 201\nheaders:\n  Location: /users/3\nbody:\n  id: 3\nrequest:\n  method: post\n  url: /users\n",
        ),
        Format::Yaml,
    )
    .expect("yaml");
    let response: Response = serde_json::from_value(value).expect("response");
    assert_eq!(response.status, 201);
    assert_eq!(response.header("location"), Some("/users/3"));
    assert_eq!(response.request.method, "post");
}

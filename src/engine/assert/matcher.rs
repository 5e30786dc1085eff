use serde_json::Value;

use crate::domain::assertion::{Assertion, AssertionKind, AssertionValue};
use crate::domain::pointer::PointerPath;

/// Deep structural comparison; patterns match the string form of `actual`.
pub fn assertion_valid(expected: &AssertionValue, actual: &Value) -> bool {
    match expected {
        AssertionValue::Literal(value) => value == actual,
        AssertionValue::Pattern(pattern) => match actual {
            Value::String(text) => pattern.is_match(text),
            Value::Null => false,
            other => pattern.is_match(&other.to_string()),
        },
    }
}

/// Header values are strings; non-string literals compare by their JSON text.
pub fn header_value_valid(expected: &AssertionValue, actual: &str) -> bool {
    match expected {
        AssertionValue::Literal(Value::String(text)) => text == actual,
        AssertionValue::Literal(Value::Null) => false,
        AssertionValue::Literal(other) => other.to_string() == actual,
        AssertionValue::Pattern(pattern) => pattern.is_match(actual),
    }
}

pub fn member_sequence<'a>(path: &PointerPath, root: &'a Value) -> Option<&'a Value> {
    if !path.ends_with_wildcard() {
        return None;
    }
    path.parent()?.resolve(root)
}

pub fn holds(assertion: &Assertion, root: &Value) -> bool {
    match assertion.kind {
        AssertionKind::Absent => !assertion.path.exists(root),
        AssertionKind::UnorderedMember => match member_sequence(&assertion.path, root) {
            Some(Value::Array(items)) => items
                .iter()
                .any(|item| assertion_valid(&assertion.value, item)),
            _ => false,
        },
        AssertionKind::Equality => assertion
            .path
            .resolve(root)
            .is_some_and(|actual| assertion_valid(&assertion.value, actual)),
    }
}

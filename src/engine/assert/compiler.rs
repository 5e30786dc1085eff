use serde_json::{Map, Value};

use crate::domain::assertion::{Assertion, AssertionValue, Expected};
use crate::domain::error::SpecError;
use crate::domain::pointer::PointerPath;
use crate::domain::response::Response;

/// Flattens a nested expectation structure into path-addressed assertions.
pub fn compile(
    expected: &Expected,
    base: &PointerPath,
    response: &Response,
) -> Result<Vec<Assertion>, SpecError> {
    let mut out = Vec::new();
    compile_into(expected, base, response, &mut out)?;
    Ok(out)
}

pub fn compile_headers(
    entries: &[(String, Expected)],
    response: &Response,
) -> Result<Vec<Assertion>, SpecError> {
    entries
        .iter()
        .map(|(header, expected)| {
            let path = PointerPath::root().key(header.as_str());
            match expected {
                Expected::Absent => Ok(Assertion::absent(path)),
                Expected::Unordered(_) => Err(SpecError::InvalidExpectation {
                    path: path.to_string(),
                    reason: "header expectations cannot use unordered lists".to_string(),
                }),
                Expected::Value(Value::Null) => Err(SpecError::InvalidExpectation {
                    path: path.to_string(),
                    reason: "header values cannot be null; use `$absent`".to_string(),
                }),
                other => {
                    let value = materialize(other, &path, response)?;
                    Ok(Assertion::equality(path, value))
                }
            }
        })
        .collect()
}

fn compile_into(
    expected: &Expected,
    path: &PointerPath,
    response: &Response,
    out: &mut Vec<Assertion>,
) -> Result<(), SpecError> {
    match expected {
        Expected::Value(Value::Object(map)) => compile_value_map(map, path, out),
        Expected::Value(Value::Array(items)) => compile_value_list(items, path, out),
        Expected::Value(scalar) => out.push(Assertion::equality(path.clone(), scalar.clone())),
        Expected::Map(entries) if entries.is_empty() => out.push(Assertion::empty_map(path.clone())),
        Expected::Map(entries) => {
            for (key, child) in entries {
                compile_into(child, &path.key(key.as_str()), response, out)?;
            }
        }
        Expected::List(items) if items.is_empty() => out.push(Assertion::empty_list(path.clone())),
        Expected::List(items) => {
            for (index, child) in items.iter().enumerate() {
                compile_into(child, &path.index(index), response, out)?;
            }
        }
        Expected::Unordered(items) if items.is_empty() => {
            out.push(Assertion::empty_list(path.clone()))
        }
        Expected::Unordered(items) => {
            let member_path = path.wildcard();
            for item in items {
                let value = materialize(item, &member_path, response)?;
                out.push(Assertion::unordered_member(member_path.clone(), value));
            }
        }
        Expected::Absent => out.push(Assertion::absent(path.clone())),
        Expected::Pattern(pattern) => out.push(Assertion::equality(
            path.clone(),
            AssertionValue::Pattern(pattern.clone()),
        )),
        Expected::Producer(producer) => {
            out.push(Assertion::equality(path.clone(), producer.call(response)))
        }
    }
    Ok(())
}

fn compile_value_map(map: &Map<String, Value>, path: &PointerPath, out: &mut Vec<Assertion>) {
    if map.is_empty() {
        out.push(Assertion::empty_map(path.clone()));
        return;
    }
    for (key, child) in map {
        compile_value(child, &path.key(key.as_str()), out);
    }
}

fn compile_value_list(items: &[Value], path: &PointerPath, out: &mut Vec<Assertion>) {
    if items.is_empty() {
        out.push(Assertion::empty_list(path.clone()));
        return;
    }
    for (index, child) in items.iter().enumerate() {
        compile_value(child, &path.index(index), out);
    }
}

fn compile_value(value: &Value, path: &PointerPath, out: &mut Vec<Assertion>) {
    match value {
        Value::Object(map) => compile_value_map(map, path, out),
        Value::Array(items) => compile_value_list(items, path, out),
        scalar => out.push(Assertion::equality(path.clone(), scalar.clone())),
    }
}

/// Turns a whole expectation into one comparable value. Used for unordered
/// members and header values, which are compared as a unit.
fn materialize(
    expected: &Expected,
    path: &PointerPath,
    response: &Response,
) -> Result<AssertionValue, SpecError> {
    match expected {
        Expected::Pattern(pattern) => Ok(AssertionValue::Pattern(pattern.clone())),
        other => literal(other, path, response).map(AssertionValue::Literal),
    }
}

fn literal(expected: &Expected, path: &PointerPath, response: &Response) -> Result<Value, SpecError> {
    match expected {
        Expected::Value(value) => Ok(value.clone()),
        Expected::Producer(producer) => Ok(producer.call(response)),
        Expected::Map(entries) => {
            let mut map = Map::new();
            for (key, child) in entries {
                map.insert(key.clone(), literal(child, &path.key(key.as_str()), response)?);
            }
            Ok(Value::Object(map))
        }
        Expected::List(items) => items
            .iter()
            .enumerate()
            .map(|(index, child)| literal(child, &path.index(index), response))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Expected::Unordered(_) => Err(invalid(path, "unordered lists cannot be nested here")),
        Expected::Absent => Err(invalid(path, "absence markers cannot be nested here")),
        Expected::Pattern(_) => Err(invalid(path, "patterns cannot be nested here")),
    }
}

fn invalid(path: &PointerPath, reason: &str) -> SpecError {
    SpecError::InvalidExpectation {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

use std::collections::HashMap;

use serde_json::Value;

use crate::domain::assertion::{Assertion, AssertionKind};
use crate::domain::pointer::{PathSegment, PointerPath};
use crate::domain::report::{DiffOp, DiffOpKind};
use crate::domain::response::Response;
use crate::engine::assert::matcher::member_sequence;

pub fn json_diff(actual: &Value, failed: &[Assertion]) -> Vec<DiffOp> {
    failed
        .iter()
        .map(|assertion| {
            let current = match assertion.kind {
                AssertionKind::UnorderedMember => member_sequence(&assertion.path, actual),
                _ => assertion.path.resolve(actual),
            };
            diff_entry(assertion, current.cloned())
        })
        .collect()
}

pub fn header_diff(response: &Response, failed: &[Assertion]) -> Vec<DiffOp> {
    failed
        .iter()
        .map(|assertion| {
            let current = header_name(&assertion.path)
                .and_then(|name| response.header(name))
                .map(|value| Value::String(value.to_string()));
            diff_entry(assertion, current)
        })
        .collect()
}

pub(crate) fn header_name(path: &PointerPath) -> Option<&str> {
    match path.segments().first() {
        Some(PathSegment::Key(name)) => Some(name.as_str()),
        _ => None,
    }
}

fn diff_entry(assertion: &Assertion, current: Option<Value>) -> DiffOp {
    let op = match (assertion.kind, current.is_some()) {
        (AssertionKind::Absent, _) => DiffOpKind::Remove,
        (_, true) => DiffOpKind::Replace,
        (_, false) => DiffOpKind::Add,
    };
    DiffOp::for_assertion(assertion, op, current)
}

/// Keeps one entry per path and orders survivors by ascending depth.
///
/// Within a path the entry whose expected value has the longest string form
/// wins; ties keep the first entry seen.
pub fn consolidate(diffs: Vec<DiffOp>) -> Vec<DiffOp> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<(usize, DiffOp)> = Vec::new();

    for diff in diffs {
        let key = diff.path.to_string();
        let weight = diff.expected_value.repr().chars().count();
        match slots.get(&key) {
            Some(&slot) => {
                if weight > kept[slot].0 {
                    kept[slot] = (weight, diff);
                }
            }
            None => {
                slots.insert(key, kept.len());
                kept.push((weight, diff));
            }
        }
    }

    let mut out: Vec<DiffOp> = kept.into_iter().map(|(_, diff)| diff).collect();
    out.sort_by_key(|diff| diff.path.depth());
    out
}

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::assertion::{Expected, Producer};
use crate::domain::error::SpecError;
use crate::domain::pointer::PointerPath;
use crate::domain::response::Response;

const ABSENT_MARKER: &str = "$absent";
const UNORDERED_MARKER: &str = "$unordered";
const MATCH_MARKER: &str = "$match";
const GET_MARKER: &str = "$get";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SpecDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub set: Map<String, Value>,
    #[serde(default)]
    pub header_expectations: BTreeMap<String, Map<String, Value>>,
    #[serde(default)]
    pub shared_examples: BTreeMap<String, BlockDocument>,
    #[serde(default)]
    pub hooks: BTreeMap<String, HookDocument>,
    #[serde(default)]
    pub validations: Vec<ValidationDocument>,
}

/// Named hook that validations reference in `before`. It runs on every
/// execution, so it may only write cache values.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HookDocument {
    pub set: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BlockDocument {
    pub set: Map<String, Value>,
    pub behaves_as: Vec<String>,
    pub shared_examples: BTreeMap<String, BlockDocument>,
    pub expect_response: Vec<ExpectationDocument>,
    pub validations: Vec<ValidationDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ValidationDocument {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub before: Vec<String>,
    #[serde(default)]
    pub pending: bool,
    #[serde(default)]
    pub set: Map<String, Value>,
    #[serde(default)]
    pub behaves_as: Vec<String>,
    #[serde(default)]
    pub shared_examples: BTreeMap<String, BlockDocument>,
    #[serde(default)]
    pub expect_response: Vec<ExpectationDocument>,
    #[serde(default)]
    pub validations: Vec<ValidationDocument>,
}

impl ValidationDocument {
    pub fn block(&self) -> BlockDocument {
        BlockDocument {
            set: self.set.clone(),
            behaves_as: self.behaves_as.clone(),
            shared_examples: self.shared_examples.clone(),
            expect_response: self.expect_response.clone(),
            validations: self.validations.clone(),
        }
    }
}

/// One response expectation. `response` names the captured fixture.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ExpectationDocument {
    pub response: Option<String>,
    pub status: Option<StatusDocument>,
    pub headers: Option<HeadersDocument>,
    pub schema: Option<Value>,
    pub schema_path: Option<String>,
    pub properties: Option<Value>,
    pub post_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum StatusDocument {
    Code(u16),
    OneOf(Vec<u16>),
    Range { min: u16, max: u16 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum HeadersDocument {
    Named(String),
    Inline(Map<String, Value>),
    Many(Vec<HeadersDocument>),
}

impl HeadersDocument {
    pub fn flatten(&self) -> Vec<&HeadersDocument> {
        match self {
            Self::Many(items) => items.iter().flat_map(HeadersDocument::flatten).collect(),
            single => vec![single],
        }
    }
}

/// Resolves a `$get` cache path into a producer, or rejects it where no cache
/// is available.
pub type Deferred = dyn Fn(PointerPath) -> Result<Producer, SpecError>;

pub type ResponsesDocument = BTreeMap<String, Response>;

/// Converts a declarative value into an expectation structure.
///
/// Single-key objects whose key is a marker (`$absent`, `$unordered`,
/// `$match`, `$get`) become the matching `Expected` variant. `$get` pointers
/// are handed to `deferred`, which decides how they are resolved later.
pub fn expected_from_value(
    value: &Value,
    deferred: &Deferred,
) -> Result<Expected, SpecError> {
    convert(value, &PointerPath::root(), deferred)
}

pub fn header_entries(
    headers: &Map<String, Value>,
    deferred: &Deferred,
) -> Result<Vec<(String, Expected)>, SpecError> {
    headers
        .iter()
        .map(|(name, value)| {
            convert(value, &PointerPath::root().key(name.as_str()), deferred)
                .map(|expected| (name.clone(), expected))
        })
        .collect()
}

fn convert(
    value: &Value,
    path: &PointerPath,
    deferred: &Deferred,
) -> Result<Expected, SpecError> {
    match value {
        Value::Object(map) => {
            if let Some(marker) = marker(map, path, deferred)? {
                return Ok(marker);
            }
            map.iter()
                .map(|(key, child)| {
                    convert(child, &path.key(key.as_str()), deferred).map(|child| (key.clone(), child))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Expected::Map)
        }
        Value::Array(items) => convert_items(items, path, deferred).map(Expected::List),
        scalar => Ok(Expected::Value(scalar.clone())),
    }
}

fn convert_items(
    items: &[Value],
    path: &PointerPath,
    deferred: &Deferred,
) -> Result<Vec<Expected>, SpecError> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| convert(item, &path.index(index), deferred))
        .collect()
}

fn marker(
    map: &Map<String, Value>,
    path: &PointerPath,
    deferred: &Deferred,
) -> Result<Option<Expected>, SpecError> {
    if map.len() != 1 {
        return Ok(None);
    }
    let Some((key, argument)) = map.iter().next() else {
        return Ok(None);
    };
    match key.as_str() {
        ABSENT_MARKER => match argument {
            Value::Bool(true) => Ok(Some(Expected::Absent)),
            _ => Err(invalid(path, "`$absent` takes `true`")),
        },
        UNORDERED_MARKER => match argument {
            Value::Array(items) => {
                convert_items(items, path, deferred).map(|items| Some(Expected::Unordered(items)))
            }
            _ => Err(invalid(path, "`$unordered` takes a list")),
        },
        MATCH_MARKER => match argument {
            Value::String(pattern) => Regex::new(pattern)
                .map(|regex| Some(Expected::Pattern(regex)))
                .map_err(|error| invalid(path, &format!("invalid pattern: {error}"))),
            _ => Err(invalid(path, "`$match` takes a regular expression string")),
        },
        GET_MARKER => match argument {
            Value::String(pointer) => deferred(PointerPath::parse(pointer)).map(|producer| Some(Expected::Producer(producer))),
            _ => Err(invalid(path, "`$get` takes a cache path")),
        },
        _ => Ok(None),
    }
}

fn invalid(path: &PointerPath, reason: &str) -> SpecError {
    SpecError::InvalidExpectation {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

use std::fmt;
use std::rc::Rc;

use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::domain::pointer::PointerPath;
use crate::domain::response::Response;

/// Deferred value, resolved against the captured response when assertions
/// are compiled.
#[derive(Clone)]
pub struct Producer(Rc<dyn Fn(&Response) -> Value>);

impl Producer {
    pub fn new(producer: impl Fn(&Response) -> Value + 'static) -> Self {
        Self(Rc::new(producer))
    }

    pub fn call(&self, response: &Response) -> Value {
        (self.0)(response)
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Producer(..)")
    }
}

#[derive(Debug, Clone)]
pub enum Expected {
    Value(Value),
    Map(Vec<(String, Expected)>),
    List(Vec<Expected>),
    /// Order-independent membership: every item must occur somewhere in the
    /// actual sequence.
    Unordered(Vec<Expected>),
    Absent,
    Pattern(Regex),
    Producer(Producer),
}

impl Expected {
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Expected>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl From<Value> for Expected {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for Expected {
    fn from(value: &str) -> Self {
        Self::Value(Value::String(value.to_string()))
    }
}

impl From<String> for Expected {
    fn from(value: String) -> Self {
        Self::Value(Value::String(value))
    }
}

impl From<i64> for Expected {
    fn from(value: i64) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<bool> for Expected {
    fn from(value: bool) -> Self {
        Self::Value(Value::Bool(value))
    }
}

impl From<Regex> for Expected {
    fn from(value: Regex) -> Self {
        Self::Pattern(value)
    }
}

impl From<Producer> for Expected {
    fn from(value: Producer) -> Self {
        Self::Producer(value)
    }
}

pub fn absent() -> Expected {
    Expected::Absent
}

pub fn unordered<T: Into<Expected>>(items: impl IntoIterator<Item = T>) -> Expected {
    Expected::Unordered(items.into_iter().map(Into::into).collect())
}

pub fn produce(producer: impl Fn(&Response) -> Value + 'static) -> Expected {
    Expected::Producer(Producer::new(producer))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertionKind {
    Equality,
    Absent,
    UnorderedMember,
}

impl AssertionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equality => "equality",
            Self::Absent => "absent",
            Self::UnorderedMember => "unordered_member",
        }
    }
}

#[derive(Debug, Clone)]
pub enum AssertionValue {
    Literal(Value),
    Pattern(Regex),
}

impl AssertionValue {
    /// String form used to rank conflicting diff entries.
    pub fn repr(&self) -> String {
        match self {
            Self::Literal(Value::String(text)) => text.clone(),
            Self::Literal(value) => value.to_string(),
            Self::Pattern(pattern) => pattern.as_str().to_string(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Pattern(pattern) => Value::String(pattern.as_str().to_string()),
        }
    }
}

impl PartialEq for AssertionValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(left), Self::Literal(right)) => left == right,
            (Self::Pattern(left), Self::Pattern(right)) => left.as_str() == right.as_str(),
            _ => false,
        }
    }
}

impl Serialize for AssertionValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Literal(value) => value.serialize(serializer),
            Self::Pattern(pattern) => serializer.serialize_str(pattern.as_str()),
        }
    }
}

impl From<Value> for AssertionValue {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assertion {
    pub path: PointerPath,
    pub value: AssertionValue,
    pub kind: AssertionKind,
}

impl Assertion {
    pub fn equality(path: PointerPath, value: impl Into<AssertionValue>) -> Self {
        Self {
            path,
            value: value.into(),
            kind: AssertionKind::Equality,
        }
    }

    pub fn absent(path: PointerPath) -> Self {
        Self {
            path,
            value: AssertionValue::Literal(Value::Null),
            kind: AssertionKind::Absent,
        }
    }

    pub fn unordered_member(path: PointerPath, value: impl Into<AssertionValue>) -> Self {
        Self {
            path,
            value: value.into(),
            kind: AssertionKind::UnorderedMember,
        }
    }

    pub fn empty_map(path: PointerPath) -> Self {
        Self::equality(path, Value::Object(Map::new()))
    }

    pub fn empty_list(path: PointerPath) -> Self {
        Self::equality(path, Value::Array(Vec::new()))
    }
}

impl Serialize for Assertion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let typed = self.kind != AssertionKind::Equality;
        let mut map = serializer.serialize_map(Some(if typed { 3 } else { 2 }))?;
        map.serialize_entry("path", &self.path)?;
        map.serialize_entry("value", &self.value)?;
        if typed {
            map.serialize_entry("type", self.kind.as_str())?;
        }
        map.end()
    }
}

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
    /// `~`: "some item of the addressed sequence", expanded by the matcher.
    Wildcard,
}

/// Absolute pointer into nested mapping/sequence data (`/user/tags/0`).
///
/// The root path renders as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PointerPath {
    segments: Vec<PathSegment>,
}

impl PointerPath {
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parses `/a/b/0` style pointers. A string without a leading `/` names a
    /// single top-level key, so `"user_id"` and `"/user_id"` are equivalent.
    pub fn parse(input: &str) -> Self {
        if input.is_empty() {
            return Self::root();
        }
        let Some(rest) = input.strip_prefix('/') else {
            return Self::root().key(input);
        };

        let segments = rest
            .split('/')
            .map(|token| {
                if token == "~" {
                    PathSegment::Wildcard
                } else {
                    PathSegment::Key(unescape_token(token))
                }
            })
            .collect();
        Self { segments }
    }

    pub fn key(&self, key: impl Into<String>) -> Self {
        self.with(PathSegment::Key(key.into()))
    }

    pub fn index(&self, index: usize) -> Self {
        self.with(PathSegment::Index(index))
    }

    pub fn wildcard(&self) -> Self {
        self.with(PathSegment::Wildcard)
    }

    fn with(&self, segment: PathSegment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, head) = self.segments.split_last()?;
        Some(Self {
            segments: head.to_vec(),
        })
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    pub fn ends_with_wildcard(&self) -> bool {
        matches!(self.last(), Some(PathSegment::Wildcard))
    }

    pub fn exists(&self, root: &Value) -> bool {
        self.resolve(root).is_some()
    }

    /// Reads the value at this path. Missing data is an error; callers that
    /// treat absence as a mismatch check [`PointerPath::exists`] first.
    pub fn value<'a>(&self, root: &'a Value) -> Result<&'a Value, PathError> {
        if self.segments.contains(&PathSegment::Wildcard) {
            return Err(PathError::Wildcard {
                path: self.to_string(),
            });
        }
        self.resolve(root).ok_or_else(|| PathError::Missing {
            path: self.to_string(),
        })
    }

    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        let mut current = root;
        for segment in &self.segments {
            current = match (segment, current) {
                (PathSegment::Key(key), Value::Object(map)) => map.get(key)?,
                (PathSegment::Key(key), Value::Array(items)) => {
                    items.get(parse_index(key)?)?
                }
                (PathSegment::Index(index), Value::Array(items)) => items.get(*index)?,
                (PathSegment::Index(index), Value::Object(map)) => {
                    map.get(&index.to_string())?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    /// Writes `value` at this path, creating intermediate mappings as needed.
    /// Sequence indices may address an existing item or append at `len`.
    pub fn set(&self, root: &mut Value, value: Value) -> Result<(), PathError> {
        let Some((last, head)) = self.segments.split_last() else {
            *root = value;
            return Ok(());
        };

        let mut current = root;
        for (depth, segment) in head.iter().enumerate() {
            let next_is_index = matches!(self.segments[depth + 1], PathSegment::Index(_));
            current = self.step_mut(current, segment, next_is_index)?;
        }

        match (last, current) {
            (PathSegment::Key(key), Value::Object(map)) => {
                map.insert(key.clone(), value);
                Ok(())
            }
            (PathSegment::Key(key), Value::Array(items)) => {
                let index = parse_index(key).ok_or_else(|| self.not_container())?;
                self.write_item(items, index, value)
            }
            (PathSegment::Index(index), Value::Array(items)) => {
                self.write_item(items, *index, value)
            }
            (PathSegment::Index(index), Value::Object(map)) => {
                map.insert(index.to_string(), value);
                Ok(())
            }
            (PathSegment::Wildcard, _) => Err(PathError::Wildcard {
                path: self.to_string(),
            }),
            _ => Err(self.not_container()),
        }
    }

    pub fn remove(&self, root: &mut Value) -> Option<Value> {
        let (last, _) = self.segments.split_last()?;
        let parent = self.parent()?;
        let container = parent.resolve_mut(root)?;
        match (last, container) {
            (PathSegment::Key(key), Value::Object(map)) => map.shift_remove(key),
            (PathSegment::Index(index), Value::Object(map)) => {
                map.shift_remove(&index.to_string())
            }
            (PathSegment::Key(key), Value::Array(items)) => {
                let index = parse_index(key)?;
                (index < items.len()).then(|| items.remove(index))
            }
            (PathSegment::Index(index), Value::Array(items)) => {
                (*index < items.len()).then(|| items.remove(*index))
            }
            _ => None,
        }
    }

    fn resolve_mut<'a>(&self, root: &'a mut Value) -> Option<&'a mut Value> {
        let mut current = root;
        for segment in &self.segments {
            current = match (segment, current) {
                (PathSegment::Key(key), Value::Object(map)) => map.get_mut(key)?,
                (PathSegment::Key(key), Value::Array(items)) => {
                    items.get_mut(parse_index(key)?)?
                }
                (PathSegment::Index(index), Value::Array(items)) => items.get_mut(*index)?,
                (PathSegment::Index(index), Value::Object(map)) => {
                    map.get_mut(&index.to_string())?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    fn step_mut<'a>(
        &self,
        current: &'a mut Value,
        segment: &PathSegment,
        next_is_index: bool,
    ) -> Result<&'a mut Value, PathError> {
        let empty_child = || {
            if next_is_index {
                Value::Array(Vec::new())
            } else {
                Value::Object(Map::new())
            }
        };
        match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => {
                Ok(map.entry(key.clone()).or_insert_with(empty_child))
            }
            (PathSegment::Index(index), Value::Object(map)) => {
                Ok(map.entry(index.to_string()).or_insert_with(empty_child))
            }
            (PathSegment::Key(key), Value::Array(items)) => {
                let index = parse_index(key).ok_or_else(|| self.not_container())?;
                self.item_mut(items, index, empty_child())
            }
            (PathSegment::Index(index), Value::Array(items)) => {
                self.item_mut(items, *index, empty_child())
            }
            (PathSegment::Wildcard, _) => Err(PathError::Wildcard {
                path: self.to_string(),
            }),
            _ => Err(self.not_container()),
        }
    }

    fn item_mut<'a>(
        &self,
        items: &'a mut Vec<Value>,
        index: usize,
        fill: Value,
    ) -> Result<&'a mut Value, PathError> {
        if index == items.len() {
            items.push(fill);
        }
        let len = items.len();
        items.get_mut(index).ok_or(PathError::IndexOutOfBounds {
            path: self.to_string(),
            index,
            len,
        })
    }

    fn write_item(&self, items: &mut Vec<Value>, index: usize, value: Value) -> Result<(), PathError> {
        if index == items.len() {
            items.push(value);
            return Ok(());
        }
        let len = items.len();
        let slot = items.get_mut(index).ok_or(PathError::IndexOutOfBounds {
            path: self.to_string(),
            index,
            len,
        })?;
        *slot = value;
        Ok(())
    }

    fn not_container(&self) -> PathError {
        PathError::NotContainer {
            path: self.to_string(),
        }
    }
}

impl fmt::Display for PointerPath {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            formatter.write_str("/")?;
            match segment {
                PathSegment::Key(key) => formatter.write_str(&escape_token(key))?,
                PathSegment::Index(index) => write!(formatter, "{index}")?,
                PathSegment::Wildcard => formatter.write_str("~")?,
            }
        }
        Ok(())
    }
}

impl Serialize for PointerPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<&str> for PointerPath {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("no value at path `{path}`")]
    Missing { path: String },

    #[error("wildcard segment cannot be resolved directly in `{path}`")]
    Wildcard { path: String },

    #[error("cannot descend into a scalar at `{path}`")]
    NotContainer { path: String },

    #[error("index {index} out of bounds (len {len}) at `{path}`")]
    IndexOutOfBounds {
        path: String,
        index: usize,
        len: usize,
    },
}

fn parse_index(token: &str) -> Option<usize> {
    if token.is_empty() || !token.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

//! Resolved data values and the addressing scheme shared with the schema tree
//!
//! Architecture: Value Objects - Paths, locations and values are immutable once built
//! - ValuePath addresses a position in both the schema tree and the data tree
//! - SourceLocation records which document line supplied a value or declared a rule
//! - DataValueNode is the read-only output of the merge pipeline

use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// One step in a [`ValuePath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Map entry / struct field
    Key(String),
    /// Concrete array element
    Index(usize),
    /// Placeholder for "any element" in an array-shaped schema node
    AnyItem,
}

/// Ordered sequence of segments identifying one position in the value tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ValuePath {
    segments: Vec<PathSegment>,
}

impl ValuePath {
    /// The document root
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from dotted keys, e.g. `"database.host"`
    pub fn from_keys(dotted: &str) -> Self {
        let segments = dotted
            .split('.')
            .filter(|s| !s.is_empty())
            .map(|s| PathSegment::Key(s.to_string()))
            .collect();
        Self { segments }
    }

    /// Path of a map entry below this one
    pub fn child(&self, key: impl Into<String>) -> Self {
        self.with(PathSegment::Key(key.into()))
    }

    /// Path of a concrete array element below this one
    pub fn index(&self, index: usize) -> Self {
        self.with(PathSegment::Index(index))
    }

    /// Path of the element template below an array-shaped node
    pub fn any_item(&self) -> Self {
        self.with(PathSegment::AnyItem)
    }

    fn with(&self, segment: PathSegment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last map key of this path, if the path ends in one
    pub fn last_key(&self) -> Option<&str> {
        match self.segments.last() {
            Some(PathSegment::Key(key)) => Some(key),
            _ => None,
        }
    }
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
                PathSegment::AnyItem => write!(f, "[]")?,
            }
        }
        Ok(())
    }
}

impl Serialize for ValuePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// File and (1-indexed) line of a document position
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: Option<u32>,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self { file: file.into(), line: Some(line) }
    }

    /// A location known only down to the file
    pub fn file_only(file: impl Into<String>) -> Self {
        Self { file: file.into(), line: None }
    }

    /// Placeholder for values and rules built programmatically
    pub fn unknown() -> Self {
        Self::file_only("<unknown>")
    }

    pub fn is_known(&self) -> bool {
        self.file != "<unknown>"
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.file, line),
            None => write!(f, "{}", self.file),
        }
    }
}

/// A resolved value; arrays and maps hold child nodes so every position keeps its own location
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<DataValueNode>),
    /// Entries in document order
    Map(Vec<(String, DataValueNode)>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Name of the value's kind as used in failure details
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
        }
    }

    /// Length of strings (in characters), arrays and maps
    pub fn length(&self) -> Option<usize> {
        match self {
            Self::String(s) => Some(s.chars().count()),
            Self::Array(items) => Some(items.len()),
            Self::Map(entries) => Some(entries.len()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Self::Int(i) => Some(Number::Int(*i)),
            Self::Float(f) => Some(Number::Float(*f)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Map entry by key
    pub fn get(&self, key: &str) -> Option<&DataValueNode> {
        match self {
            Self::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, node)| node),
            _ => None,
        }
    }

    /// Plain JSON view of this value with locations stripped
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Self::Null => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Int(i) => Json::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null),
            Self::String(s) => Json::String(s.clone()),
            Self::Array(items) => Json::Array(items.iter().map(|n| n.value.to_json()).collect()),
            Self::Map(entries) => Json::Object(
                entries.iter().map(|(k, n)| (k.clone(), n.value.to_json())).collect(),
            ),
        }
    }

    /// Structural equality against a rule parameter literal; numbers compare numerically
    pub fn matches_literal(&self, literal: &serde_json::Value) -> bool {
        match (self.as_number(), Number::from_json(literal)) {
            (Some(number), Some(expected)) => number.compare(expected) == Some(Ordering::Equal),
            _ => &self.to_json() == literal,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// Numeric view used by `min`/`max`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        if let Some(i) = value.as_i64() {
            Some(Self::Int(i))
        } else {
            value.as_f64().map(Self::Float)
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    /// Exact ordering; `None` when either side is NaN
    pub fn compare(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(&b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(&b),
            (Self::Int(a), Self::Float(b)) => compare_int_float(a, b),
            (Self::Float(a), Self::Int(b)) => compare_int_float(b, a).map(Ordering::reverse),
        }
    }
}

fn compare_int_float(int: i64, float: f64) -> Option<Ordering> {
    // 2^63, the first float above every i64
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;

    if float.is_nan() {
        return None;
    }
    if float >= LIMIT {
        return Some(Ordering::Less);
    }
    if float < -LIMIT {
        return Some(Ordering::Greater);
    }

    let whole = float.trunc();
    match int.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0_f64.partial_cmp(&(float - whole)),
        unequal => Some(unequal),
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

/// One resolved value in the merged tree together with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct DataValueNode {
    pub path: ValuePath,
    pub value: Value,
    pub location: SourceLocation,
}

impl DataValueNode {
    pub fn new(path: ValuePath, value: Value, location: SourceLocation) -> Self {
        Self { path, value, location }
    }

    /// Build a whole tree from plain JSON, attributing every node to `location`
    pub fn from_json(path: ValuePath, json: &serde_json::Value, location: &SourceLocation) -> Self {
        use serde_json::Value as Json;
        let value = match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| Self::from_json(path.index(i), item, location))
                    .collect(),
            ),
            Json::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(path.child(k.clone()), v, location)))
                    .collect(),
            ),
        };
        Self::new(path, value, location.clone())
    }

    /// Move this subtree to `path`, rewriting every descendant path
    pub fn rebase(mut self, path: &ValuePath) -> Self {
        self.path = path.clone();
        self.value = match self.value {
            Value::Array(items) => Value::Array(
                items.into_iter().enumerate().map(|(i, n)| n.rebase(&path.index(i))).collect(),
            ),
            Value::Map(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, n)| {
                        let child = path.child(k.clone());
                        (k, n.rebase(&child))
                    })
                    .collect(),
            ),
            scalar => scalar,
        };
        self
    }

    /// Replace this node's location, keeping children untouched
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    /// Child entry of a map node
    pub fn get(&self, key: &str) -> Option<&DataValueNode> {
        self.value.get(key)
    }

    /// Mutable child entry of a map node
    pub fn get_mut(&mut self, key: &str) -> Option<&mut DataValueNode> {
        match &mut self.value {
            Value::Map(entries) => entries.iter_mut().find(|(k, _)| k == key).map(|(_, n)| n),
            _ => None,
        }
    }

    /// Locate a descendant by path relative to this node's own path
    pub fn find(&self, path: &ValuePath) -> Option<&DataValueNode> {
        let relative = path.segments().get(self.path.segments().len()..)?;
        let mut current = self;
        for segment in relative {
            current = match (segment, &current.value) {
                (PathSegment::Key(key), Value::Map(_)) => current.get(key)?,
                (PathSegment::Index(i), Value::Array(items)) => items.get(*i)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

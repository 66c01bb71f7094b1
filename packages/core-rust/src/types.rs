use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Generic property value carried by graph inserts.
///
/// Supports all JSON-compatible types plus binary data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// JSON null.
    Null,
    /// JSON boolean.
    Bool(bool),
    /// JSON integer (signed 64-bit).
    Int(i64),
    /// JSON floating-point (64-bit IEEE 754).
    Float(f64),
    /// JSON string (UTF-8).
    String(String),
    /// Binary data (not directly representable in JSON).
    Bytes(Vec<u8>),
    /// JSON array (ordered sequence of values).
    Array(Vec<Value>),
    /// JSON object. Uses `BTreeMap` for deterministic serialization order.
    Map(BTreeMap<String, Value>),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

/// A single insertion instruction for the graph sink.
///
/// The vertex or edge label is not part of the record; it travels with the
/// [`WriteOperation`] that every batch is executed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GraphInsert {
    /// Insert a vertex with the given properties.
    Vertex { properties: BTreeMap<String, Value> },
    /// Insert an edge between two vertex identifiers.
    Edge {
        from: String,
        to: String,
        properties: BTreeMap<String, Value>,
    },
}

impl GraphInsert {
    /// Starts an empty vertex insert.
    #[must_use]
    pub fn vertex() -> Self {
        GraphInsert::Vertex {
            properties: BTreeMap::new(),
        }
    }

    /// Starts an empty edge insert from `from` to `to`.
    #[must_use]
    pub fn edge(from: impl Into<String>, to: impl Into<String>) -> Self {
        GraphInsert::Edge {
            from: from.into(),
            to: to.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Sets a property, replacing any previous value under `key`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties_mut().insert(key.into(), value.into());
        self
    }

    /// Returns the property map of this insert.
    #[must_use]
    pub fn properties(&self) -> &BTreeMap<String, Value> {
        match self {
            GraphInsert::Vertex { properties } | GraphInsert::Edge { properties, .. } => properties,
        }
    }

    fn properties_mut(&mut self) -> &mut BTreeMap<String, Value> {
        match self {
            GraphInsert::Vertex { properties } | GraphInsert::Edge { properties, .. } => properties,
        }
    }
}

/// Identifier for a cached entry: a shard (entity family) plus a key within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    shard: String,
    key: String,
}

impl CacheKey {
    #[must_use]
    pub fn new(shard: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            shard: shard.into(),
            key: key.into(),
        }
    }

    #[must_use]
    pub fn shard(&self) -> &str {
        &self.shard
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.shard, self.key)
    }
}

/// A keyed, already-serialized value queued for the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub value: String,
}

impl CacheEntry {
    #[must_use]
    pub fn new(key: CacheKey, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    /// Builds an entry whose value is the JSON encoding of `value`.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if `value` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(key: CacheKey, value: &T) -> serde_json::Result<Self> {
        Ok(Self {
            key,
            value: serde_json::to_string(value)?,
        })
    }
}

/// What a batch writes: vertices, edges, or cache entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Vertex,
    Edge,
    Cache,
}

impl OperationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Vertex => "vertex",
            OperationKind::Edge => "edge",
            OperationKind::Cache => "cache",
        }
    }
}

/// Descriptor passed to the remote sink alongside every batch.
///
/// Identifies the traversal the sink should run over the batch records,
/// e.g. "insert `Pod` vertices".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WriteOperation {
    pub kind: OperationKind,
    pub label: String,
}

impl WriteOperation {
    #[must_use]
    pub fn vertex(label: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Vertex,
            label: label.into(),
        }
    }

    #[must_use]
    pub fn edge(label: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Edge,
            label: label.into(),
        }
    }

    #[must_use]
    pub fn cache(label: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Cache,
            label: label.into(),
        }
    }
}

impl fmt::Display for WriteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.label)
    }
}

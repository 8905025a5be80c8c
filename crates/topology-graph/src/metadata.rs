//! Metadata maps attached to nodes and edges.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Ordered key/value attributes of a node or an edge.
///
/// Values are JSON values so that probes can store strings, integers and
/// lists (e.g. VLAN sets) without the graph knowing their schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    inner: BTreeMap<String, Value>,
}

impl Metadata {
    /// Creates empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a key, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.inner.insert(key.into(), value.into())
    }

    /// Removes a key.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.inner.remove(key)
    }

    /// Returns the raw value for a key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    /// Returns the value for a key if it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.inner.get(key).and_then(Value::as_str)
    }

    /// Returns the value for a key if it is an integer.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.inner.get(key).and_then(Value::as_i64)
    }

    /// Returns true if the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Returns the number of keys.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if there are no keys.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates over key/value pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.inner.iter()
    }

    /// Returns true if every key of `filter` is present here with an equal value.
    ///
    /// An empty filter matches everything.
    pub fn matches(&self, filter: &Metadata) -> bool {
        filter
            .inner
            .iter()
            .all(|(k, v)| self.inner.get(k) == Some(v))
    }

    /// Copies every key of `other` into this map, overwriting existing keys.
    ///
    /// Returns true if anything changed.
    pub fn merge(&mut self, other: &Metadata) -> bool {
        let mut changed = false;
        for (k, v) in &other.inner {
            if self.inner.get(k) != Some(v) {
                self.inner.insert(k.clone(), v.clone());
                changed = true;
            }
        }
        changed
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

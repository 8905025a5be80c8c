//! Row snapshots as delivered by the monitor.
//!
//! Column values are untyped at the protocol boundary: the same column may
//! arrive as a scalar, an empty set (value not set yet) or a set. Every
//! accessor here matches on the full [`FieldValue`] and returns `None` (or an
//! empty list) for shapes it does not expect.
//!
//! Decoding follows the OVSDB JSON notation of RFC 7047 §5.1.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{ProbeError, Result};
use crate::types::UpdateKind;

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    /// Reference to a row of another table.
    Uuid(String),
    Set(Vec<FieldValue>),
    Map(Vec<(FieldValue, FieldValue)>),
}

impl FieldValue {
    /// Builds a set of references.
    pub fn uuid_set<I, S>(uuids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldValue::Set(uuids.into_iter().map(|u| FieldValue::Uuid(u.into())).collect())
    }

    /// Builds a string-to-string map.
    pub fn string_map<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        FieldValue::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (FieldValue::String(k.into()), FieldValue::String(v.into())))
                .collect(),
        )
    }

    /// Returns the string if this is a string atom.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value if this is a numeric atom. Reals are truncated.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            FieldValue::Real(f) => Some(*f as i64),
            _ => None,
        }
    }

    /// Returns a numeric scalar, or the first element of a set holding one.
    pub fn first_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(_) | FieldValue::Real(_) => self.as_integer(),
            FieldValue::Set(items) => items.first().and_then(FieldValue::as_integer),
            _ => None,
        }
    }

    /// Returns the referenced row UUIDs of a single reference or a set of
    /// references. Anything else yields no references.
    pub fn uuid_refs(&self) -> Vec<&str> {
        match self {
            FieldValue::Uuid(u) => vec![u.as_str()],
            FieldValue::Set(items) => items
                .iter()
                .filter_map(|i| match i {
                    FieldValue::Uuid(u) => Some(u.as_str()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Looks up a string key of a map value.
    pub fn map_get(&self, key: &str) -> Option<&FieldValue> {
        match self {
            FieldValue::Map(entries) => entries
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Looks up a string key of a map value whose value is a string.
    pub fn map_get_str(&self, key: &str) -> Option<&str> {
        self.map_get(key).and_then(FieldValue::as_str)
    }

    /// Returns the string-to-string entries of a map value.
    pub fn string_entries(&self) -> Vec<(&str, &str)> {
        match self {
            FieldValue::Map(entries) => entries
                .iter()
                .filter_map(|(k, v)| Some((k.as_str()?, v.as_str()?)))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Converts to a JSON value suitable for node metadata.
    pub fn to_metadata_value(&self) -> Value {
        match self {
            FieldValue::String(s) | FieldValue::Uuid(s) => Value::from(s.as_str()),
            FieldValue::Integer(i) => Value::from(*i),
            FieldValue::Real(f) => Value::from(*f),
            FieldValue::Boolean(b) => Value::from(*b),
            FieldValue::Set(items) => {
                Value::Array(items.iter().map(FieldValue::to_metadata_value).collect())
            }
            FieldValue::Map(entries) => {
                let mut obj = serde_json::Map::new();
                for (k, v) in entries {
                    let key = match k {
                        FieldValue::String(s) | FieldValue::Uuid(s) => s.clone(),
                        other => other.to_metadata_value().to_string(),
                    };
                    obj.insert(key, v.to_metadata_value());
                }
                Value::Object(obj)
            }
        }
    }

    /// Decodes a value in OVSDB JSON notation.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Array(parts) => match parts.as_slice() {
                [Value::String(tag), Value::Array(items)] if tag == "set" => Ok(FieldValue::Set(
                    items.iter().map(decode_atom).collect::<Result<_>>()?,
                )),
                [Value::String(tag), Value::Array(pairs)] if tag == "map" => {
                    let mut entries = Vec::with_capacity(pairs.len());
                    for pair in pairs {
                        match pair {
                            Value::Array(kv) if kv.len() == 2 => {
                                entries.push((decode_atom(&kv[0])?, decode_atom(&kv[1])?));
                            }
                            other => {
                                return Err(ProbeError::decode(format!(
                                    "map entry is not a [key, value] pair: {}",
                                    other
                                )))
                            }
                        }
                    }
                    Ok(FieldValue::Map(entries))
                }
                _ => decode_atom(value),
            },
            _ => decode_atom(value),
        }
    }
}

fn decode_atom(value: &Value) -> Result<FieldValue> {
    match value {
        Value::String(s) => Ok(FieldValue::String(s.clone())),
        Value::Bool(b) => Ok(FieldValue::Boolean(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(FieldValue::Integer(i)),
            None => n
                .as_f64()
                .map(FieldValue::Real)
                .ok_or_else(|| ProbeError::decode(format!("unsupported number {}", n))),
        },
        Value::Array(parts) => match parts.as_slice() {
            [Value::String(tag), Value::String(u)] if tag == "uuid" || tag == "named-uuid" => {
                Ok(FieldValue::Uuid(u.clone()))
            }
            _ => Err(ProbeError::decode(format!("unsupported atom {}", value))),
        },
        other => Err(ProbeError::decode(format!("unsupported atom {}", other))),
    }
}

/// Column snapshot of one row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: BTreeMap<String, FieldValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(column.into(), value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: FieldValue) {
        self.fields.insert(column.into(), value);
    }

    pub fn remove(&mut self, column: &str) -> Option<FieldValue> {
        self.fields.remove(column)
    }

    /// Returns a column value, `None` when the column is absent.
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields.get(column)
    }

    /// Returns a column if it holds a string atom.
    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(FieldValue::as_str)
    }

    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Decodes a `{column: value}` JSON object.
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| ProbeError::decode("row is not a JSON object"))?;

        let mut row = Row::new();
        for (column, v) in obj {
            row.insert(column.clone(), FieldValue::from_json(v)?);
        }
        Ok(row)
    }
}

/// Old and new state of one row, as carried by a monitor update.
#[derive(Debug, Clone, PartialEq)]
pub struct RowUpdate {
    pub uuid: String,
    pub old: Option<Row>,
    pub new: Option<Row>,
}

impl RowUpdate {
    /// A row that just appeared.
    pub fn insert(uuid: impl Into<String>, new: Row) -> Self {
        Self {
            uuid: uuid.into(),
            old: None,
            new: Some(new),
        }
    }

    /// A row that changed.
    pub fn modify(uuid: impl Into<String>, old: Row, new: Row) -> Self {
        Self {
            uuid: uuid.into(),
            old: Some(old),
            new: Some(new),
        }
    }

    /// A row that disappeared.
    pub fn delete(uuid: impl Into<String>, old: Row) -> Self {
        Self {
            uuid: uuid.into(),
            old: Some(old),
            new: None,
        }
    }

    /// Classifies the update; `None` when it carries neither state.
    pub fn kind(&self) -> Option<UpdateKind> {
        match (&self.old, &self.new) {
            (None, Some(_)) => Some(UpdateKind::Add),
            (Some(_), Some(_)) => Some(UpdateKind::Update),
            (Some(_), None) => Some(UpdateKind::Delete),
            (None, None) => None,
        }
    }
}

/// Row updates of one monitor notification, grouped by table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableUpdates {
    tables: BTreeMap<String, Vec<RowUpdate>>,
}

impl TableUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append of one row update.
    pub fn with(mut self, table: impl Into<String>, update: RowUpdate) -> Self {
        self.push(table, update);
        self
    }

    pub fn push(&mut self, table: impl Into<String>, update: RowUpdate) {
        self.tables.entry(table.into()).or_default().push(update);
    }

    /// Iterates over `(table, updates)` in table-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[RowUpdate])> {
        self.tables.iter().map(|(t, u)| (t.as_str(), u.as_slice()))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut Vec<RowUpdate>)> {
        self.tables.iter_mut()
    }

    /// Total number of row updates.
    pub fn len(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decodes the `<table-updates>` object of a monitor `update`
    /// notification: `{table: {uuid: {"old": row, "new": row}}}`.
    pub fn from_json(value: &Value) -> Result<Self> {
        let tables = value
            .as_object()
            .ok_or_else(|| ProbeError::decode("table-updates is not a JSON object"))?;

        let mut updates = TableUpdates::new();
        for (table, rows) in tables {
            let rows = rows.as_object().ok_or_else(|| {
                ProbeError::decode(format!("table-update for {} is not a JSON object", table))
            })?;

            for (uuid, row_update) in rows {
                let old = row_update.get("old").map(Row::from_json).transpose()?;
                let new = row_update.get("new").map(Row::from_json).transpose()?;
                updates.push(
                    table.clone(),
                    RowUpdate {
                        uuid: uuid.clone(),
                        old,
                        new,
                    },
                );
            }
        }
        Ok(updates)
    }
}

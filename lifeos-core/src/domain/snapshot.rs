//! Snapshot domain model

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The complete application state at backup time.
///
/// The vault never looks inside: a snapshot is any JSON value, and its
/// byte form is the compact `serde_json` encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(Value);

impl Snapshot {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Build a snapshot from any serializable state value
    pub fn from_serializable<T: Serialize>(state: &T) -> serde_json::Result<Self> {
        serde_json::to_value(state).map(Self)
    }

    /// Decode the snapshot into a typed state value
    pub fn to_deserialized<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.0)
    }

    /// Parse a snapshot from its serialized bytes
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes).map(Self)
    }

    /// Serialize to compact JSON bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        // Display on Value writes compact JSON into a String and cannot fail
        self.0.to_string().into_bytes()
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Number of top-level entries (object members or array items)
    pub fn entry_count(&self) -> usize {
        match &self.0 {
            Value::Object(map) => map.len(),
            Value::Array(items) => items.len(),
            Value::Null => 0,
            _ => 1,
        }
    }
}

impl From<Value> for Snapshot {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
